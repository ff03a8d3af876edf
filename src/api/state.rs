use std::sync::Arc;
use std::time::Duration;

use crate::cache::ResultCache;
use crate::jobs::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub cache: Arc<ResultCache>,
    pub api_key: String,
    /// Pin speed tests to the alternate server (deployment-wide setting).
    pub use_alternate_server: bool,
    /// Overall deadline per job; covers the slowest retry/backoff schedule.
    pub job_timeout: Duration,
}
