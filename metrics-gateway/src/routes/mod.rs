use axum::{Router, routing::get};

use exporter::{NetworkProbe, NodeProbe};

use crate::state::SharedState;

pub mod metrics;

/// Builds the router. `GET /metrics` is the only route.
pub fn router<N, P>(state: SharedState<N, P>) -> Router
where
    N: NodeProbe + 'static,
    P: NetworkProbe + 'static,
{
    Router::new()
        .route("/metrics", get(metrics::scrape::<N, P>))
        .with_state(state)
}
