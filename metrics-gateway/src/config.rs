//! Gateway configuration.
//!
//! The exporter settings themselves live in [`exporter::ExporterConfig`];
//! this module only adds the process-level concerns: loading a `.env` file
//! and choosing the default log filter.

use std::path::PathBuf;

use exporter::ExporterConfig;

/// Loads `.env` (if present) and reads the exporter configuration.
pub fn load() -> Result<ExporterConfig, String> {
    check_env_file(dotenvy::dotenv())?;
    ExporterConfig::from_env().map_err(|e| e.to_string())
}

/// A missing `.env` file is fine; the environment may be set directly.
/// An unreadable or malformed one is not.
fn check_env_file(result: Result<PathBuf, dotenvy::Error>) -> Result<(), String> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(format!("failed to load .env file: {e}")),
    }
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter(debug: bool) -> &'static str {
    if debug {
        "metrics_gateway=debug,exporter=debug"
    } else {
        "metrics_gateway=info,exporter=info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_raises_both_crates_to_debug() {
        assert_eq!(
            default_log_filter(true),
            "metrics_gateway=debug,exporter=debug"
        );
        assert!(default_log_filter(false).contains("exporter=info"));
    }

    #[test]
    fn missing_env_file_is_ignored() {
        let missing = dotenvy::Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(check_env_file(Err(missing)).is_ok());
        assert!(check_env_file(Ok(PathBuf::from(".env"))).is_ok());
    }

    #[test]
    fn malformed_env_file_is_reported() {
        let malformed = dotenvy::Error::LineParse("QUBIC_NODE_LIST 10.0.0.1".to_string(), 16);
        let err = check_env_file(Err(malformed)).unwrap_err();
        assert!(err.starts_with("failed to load .env file"), "unexpected error: {err}");

        let unreadable =
            dotenvy::Error::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(check_env_file(Err(unreadable)).is_err());
    }
}
