use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::rate_limit::SubmissionRateLimiter;
use crate::storage::EvidenceStore;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub evidence: EvidenceStore,
    pub submission_limiter: SubmissionRateLimiter,
}
