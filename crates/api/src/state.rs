use std::sync::Arc;

use chrono::Duration;
use wordloop_core::due_queue::DueQueueResolver;
use wordloop_core::review::ReviewScheduler;
use wordloop_core::timer_sync::TimerSynchronizer;
use wordloop_db::{DbPool, PgCardStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every service is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, for repository calls outside the services.
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
    pub synchronizer: TimerSynchronizer<PgCardStore>,
    pub reviews: Arc<ReviewScheduler<PgCardStore>>,
    pub due_queue: Arc<DueQueueResolver<PgCardStore>>,
}

impl AppState {
    /// Wire the SRS services onto one shared [`PgCardStore`].
    pub fn new(pool: DbPool, config: ServerConfig) -> Self {
        let store = Arc::new(PgCardStore::new(pool.clone()));
        let synchronizer = TimerSynchronizer::new(
            Arc::clone(&store),
            Duration::minutes(config.sync_tolerance_minutes),
        );
        let reviews = ReviewScheduler::new(Arc::clone(&store), synchronizer.clone());
        let due_queue = DueQueueResolver::new(store);

        Self {
            pool,
            config: Arc::new(config),
            synchronizer,
            reviews: Arc::new(reviews),
            due_queue: Arc::new(due_queue),
        }
    }
}
