//! Prometheus rendering of scrape snapshots.
//!
//! Every scrape gets its own registry, built from the snapshot and thrown
//! away after encoding, so nodes or computors that disappear between
//! scrapes never linger in later responses.
//!
//! Typical usage in a handler:
//!
//! ```ignore
//! let snapshot = aggregator.collect().await;
//! let body = exporter::metrics::render_snapshot(&snapshot)?;
//! // respond with `exporter::metrics::CONTENT_TYPE`
//! ```

pub mod prometheus;

pub use self::prometheus::{CONTENT_TYPE, MetricsError, build_registry, render_snapshot};
