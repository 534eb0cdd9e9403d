// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use cc_dashboard_stats::{RootResolver, StatsConfig, StatsService};

use crate::data_source::DataSource;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Dashboard read operations over the active data root.
    pub stats: StatsService,
    /// Live vs imported selection. Also the resolver behind `stats`.
    pub data_source: Arc<DataSource>,
}

impl AppState {
    pub fn new(data_source: DataSource, config: StatsConfig) -> Arc<Self> {
        let data_source = Arc::new(data_source);
        let resolver: Arc<dyn RootResolver> = data_source.clone();
        Arc::new(Self {
            start_time: Instant::now(),
            stats: StatsService::new(resolver, config),
            data_source,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
