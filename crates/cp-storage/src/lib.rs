pub mod activity;
pub mod credentials;
pub mod cron_jobs;
pub mod error;
pub mod models;
pub mod pool;
pub mod scheduled_posts;
pub mod sessions;

pub use activity::ActivityRepository;
pub use credentials::CredentialRepository;
pub use cron_jobs::{CronJobRepository, CronJobRunRepository};
pub use scheduled_posts::ScheduledPostRepository;
pub use sessions::SessionRepository;
