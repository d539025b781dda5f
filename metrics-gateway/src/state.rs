//! Shared application state.

use std::sync::Arc;

use exporter::SnapshotAggregator;

/// State handed to request handlers.
///
/// Holds only immutable configuration and stateless probe clients; every
/// scrape builds its own snapshot and registry, so concurrent requests
/// share nothing mutable.
pub struct AppState<N, P> {
    pub aggregator: SnapshotAggregator<N, P>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState<N, P> = Arc<AppState<N, P>>;
