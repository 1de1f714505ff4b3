pub mod cron;
pub mod jobs;
pub mod scans;
pub mod weeks;
