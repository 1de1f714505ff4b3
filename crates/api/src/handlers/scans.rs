//! Scan upload and trainer verification.
//!
//! Uploads are sniffed by content rather than trusted by extension or
//! declared content type, stored under `SCAN_STORAGE_DIR`, and queued for
//! extraction in the same request.

use std::io;
use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fitcoach_core::error::CoreError;
use fitcoach_core::jobs::JobOwner;
use fitcoach_core::measurements::ScanMeasurements;
use fitcoach_core::types::DbId;
use fitcoach_db::models::job::{JobView, NewJob};
use fitcoach_db::models::scan::{CreateScan, Scan};
use fitcoach_db::repositories::ScanRepo;
use image::ImageFormat;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};
use crate::handlers::jobs::{authorize_client, to_view};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Largest accepted scan upload.
pub const MAX_SCAN_BYTES: usize = 10 * 1024 * 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Response for a scan upload: the stored scan and its extraction job.
#[derive(Debug, Serialize)]
pub struct ScanUpload {
    pub scan: Scan,
    pub job: JobView,
}

/// Detect the scan's MIME type and file extension from its leading bytes.
///
/// InBody result sheets arrive as phone photos (JPEG, PNG, WebP) or as PDF
/// exports.
pub fn sniff_scan_format(data: &[u8]) -> Option<(&'static str, &'static str)> {
    if data.starts_with(PDF_MAGIC) {
        return Some(("application/pdf", "pdf"));
    }
    match image::guess_format(data).ok()? {
        ImageFormat::Jpeg => Some(("image/jpeg", "jpg")),
        ImageFormat::Png => Some(("image/png", "png")),
        ImageFormat::WebP => Some(("image/webp", "webp")),
        _ => None,
    }
}

/// Write `data` to a fresh `scan_{stamp}.{ext}` in `dir`.
///
/// Files are created exclusively; when another upload already took the name
/// in the same millisecond, a `_{n}` suffix is appended instead.
async fn store_scan_file(dir: &FsPath, stamp: i64, ext: &str, data: &[u8]) -> io::Result<PathBuf> {
    const MAX_ATTEMPTS: u32 = 100;
    for n in 0..MAX_ATTEMPTS {
        let name = match n {
            0 => format!("scan_{stamp}.{ext}"),
            n => format!("scan_{stamp}_{n}.{ext}"),
        };
        let path = dir.join(name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        };
        file.write_all(data).await?;
        file.flush().await?;
        return Ok(path);
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free scan file name for stamp {stamp}"),
    ))
}

/// POST /api/v1/clients/{id}/scans
///
/// Accepts a multipart form with a required `file` field. Returns 201 with
/// the pending scan and its pending extraction job.
pub async fn upload_scan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    authorize_client(&state, &auth, client_id).await?;

    let mut file_data: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            file_data = Some(data.to_vec());
        }
    }

    let data = file_data.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }
    let (mime, ext) = sniff_scan_format(&data).ok_or_else(|| {
        AppError::BadRequest("Unsupported scan format. Supported: JPEG, PNG, WebP, PDF".into())
    })?;

    let storage_dir = state.config.scan_storage_dir.join(format!("client_{client_id}"));
    tokio::fs::create_dir_all(&storage_dir)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let file_path = store_scan_file(&storage_dir, chrono::Utc::now().timestamp_millis(), ext, &data)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let scan = ScanRepo::create(
        &state.pool,
        &CreateScan {
            client_id,
            image_path: file_path.to_string_lossy().to_string(),
            image_mime: mime.to_string(),
        },
    )
    .await?;

    let job = state
        .jobs
        .create(
            &NewJob::new(JobOwner::ScanExtraction { scan_id: scan.id }).requested_by(auth.user_id),
        )
        .await?;

    tracing::info!(
        scan_id = scan.id,
        job_id = job.id,
        client_id,
        bytes = data.len(),
        mime,
        "Scan uploaded",
    );

    let job = to_view(&job)?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: ScanUpload { scan, job } })))
}

/// PUT /api/v1/scans/{id}/verify
///
/// Store the trainer-confirmed values. Only a scan whose extraction
/// completed can be verified.
pub async fn verify_scan(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(scan_id): Path<DbId>,
    Json(input): Json<ScanMeasurements>,
) -> AppResult<impl IntoResponse> {
    let scan = ScanRepo::find_by_id(&state.pool, scan_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Scan",
            id: scan_id,
        }))?;
    authorize_client(&state, &auth, scan.client_id).await?;

    input.validate()?;
    if !input.is_usable() {
        return Err(AppError::Core(CoreError::Validation(
            "At least one measurement is required".into(),
        )));
    }

    let verified = ScanRepo::verify(&state.pool, scan_id, &input)
        .await?
        .ok_or_else(|| {
            let status = scan
                .extraction_status()
                .map_or_else(|| "in an unknown state".to_string(), |s| s.to_string());
            AppError::Core(CoreError::Conflict(format!(
                "Scan {scan_id} is {status}; only completed scans can be verified"
            )))
        })?;

    tracing::info!(scan_id, user_id = auth.user_id, "Scan verified");
    Ok(Json(DataResponse { data: verified }))
}
