use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use exporter::{CONTENT_TYPE, NetworkProbe, NodeProbe, render_snapshot};

use crate::state::SharedState;

/// `GET /metrics`
///
/// Runs one full collection and renders it. Probe failures only shrink
/// the body; the response is 200 even when nothing could be reached.
pub async fn scrape<N, P>(State(state): State<SharedState<N, P>>) -> Response
where
    N: NodeProbe + 'static,
    P: NetworkProbe + 'static,
{
    let snapshot = state.aggregator.collect().await;
    if snapshot.is_empty() {
        tracing::warn!(
            targets = snapshot.nodes.len(),
            "no node or network data available for this scrape"
        );
    }

    match render_snapshot(&snapshot) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}
