use moka::future::Cache;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::services::mailer::MailRelayClient;

/// Cache for serialized setpoints responses, keyed by node uid.
/// Devices poll setpoints far more often than thresholds change; entries are
/// invalidated whenever a registry mutation touches the node.
pub type SetpointsCache = Cache<String, Arc<Vec<u8>>>;

#[derive(Clone)]
pub struct AppState {
    /// One shared connection handle; detached tasks clone it out of the
    /// state that spawned them.
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<Config>,
    pub mailer: Option<Arc<MailRelayClient>>,
    pub setpoints_cache: SetpointsCache,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, mailer: Option<MailRelayClient>) -> Self {
        let cache: SetpointsCache = Cache::builder()
            .max_capacity(config.cache_max_entries)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            mailer: mailer.map(Arc::new),
            setpoints_cache: cache,
        }
    }
}
