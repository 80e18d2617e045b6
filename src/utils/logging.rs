//! Diagnostic logging.
//!
//! The terminal UI owns stdout and stderr, so tracing output only goes to a
//! file, and only when one was requested with `--log` or the `log-file`
//! config key. `RUST_LOG` overrides the default filter.

use std::error::Error;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_DIRECTIVE: &str = "dsa_tutor=info";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

/// Opens `path` for appending, creating it (but not its directory) if needed.
pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber writing to `path`. Returns `false` when no
/// path was given and logging stays off.
pub fn init_file_logging(path: Option<&str>) -> Result<bool, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(false);
    };

    let file = open_log_file(Path::new(path))
        .map_err(|e| format!("Cannot open log file {path}: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| e.to_string())?;

    tracing::info!("dsa-tutor v{} starting", env!("CARGO_PKG_VERSION"));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn no_path_leaves_logging_off() {
        assert!(!init_file_logging(None).unwrap());
    }

    #[test]
    fn second_install_is_reported_as_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tutor.log");
        let path = path.to_str().unwrap();

        assert!(init_file_logging(Some(path)).unwrap());
        let err = init_file_logging(Some(path)).expect_err("subscriber already installed");
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn open_log_file_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tutor.log");
        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn open_log_file_fails_for_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(open_log_file(&dir.path().join("missing").join("tutor.log")).is_err());
    }
}
