//! Startup requirement validation for zprogress.
//!
//! This module checks that the proc filesystem and per-process I/O
//! accounting are available before any monitor starts.

use nix::unistd::geteuid;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::process::inspector::parse_io_counters;

/// Validate all runtime requirements
pub fn validate_requirements(proc_root: &Path) -> Result<(), ValidationError> {
    debug!("Validating runtime requirements under {}", proc_root.display());

    check_proc_mounted(proc_root)?;
    check_io_accounting(proc_root)?;
    check_user_privileges();

    debug!("All runtime requirements validated");
    Ok(())
}

/// Fatal when `<proc_root>/self` is missing.
pub fn check_proc_mounted(proc_root: &Path) -> Result<(), ValidationError> {
    let self_dir = proc_root.join("self");
    if self_dir.is_dir() {
        Ok(())
    } else {
        error!("❌ {} not found - proc filesystem not mounted", self_dir.display());
        Err(ValidationError::ProcNotMounted(proc_root.display().to_string()))
    }
}

/// Fatal when our own I/O counters cannot be read.
pub fn check_io_accounting(proc_root: &Path) -> Result<(), ValidationError> {
    let io_path = proc_root.join("self").join("io");
    match fs::read_to_string(&io_path) {
        Ok(content) if parse_io_counters(&content).is_some() => {
            debug!("I/O accounting available at {}", io_path.display());
            Ok(())
        }
        Ok(_) => {
            error!("❌ {} has no rchar/wchar counters", io_path.display());
            Err(ValidationError::IoAccountingUnavailable {
                path: io_path.display().to_string(),
                problem: "has no rchar/wchar counters",
            })
        }
        Err(e) => {
            error!("❌ Cannot read {}: {}", io_path.display(), e);
            error!("   The kernel may lack CONFIG_TASK_IO_ACCOUNTING");
            Err(ValidationError::IoAccountingUnavailable {
                path: io_path.display().to_string(),
                problem: "not readable",
            })
        }
    }
}

/// Warns when other users' processes will be invisible. Returns true for root.
pub fn check_user_privileges() -> bool {
    if geteuid().is_root() {
        info!("Running as root (uid=0)");
        true
    } else {
        warn!("⚠️  Not running as root - other users' archive processes cannot be monitored");
        false
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("proc filesystem not mounted at {0}")]
    ProcNotMounted(String),

    /// `problem` is a fixed description; OS error text only goes to the log.
    #[error("per-process I/O accounting unavailable: {path} {problem}")]
    IoAccountingUnavailable { path: String, problem: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_proc_is_fatal() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            validate_requirements(dir.path()),
            Err(ValidationError::ProcNotMounted(_))
        ));
    }

    #[test]
    fn test_missing_io_is_fatal() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("self")).unwrap();
        let err = validate_requirements(dir.path()).unwrap_err();
        assert!(matches!(err, ValidationError::IoAccountingUnavailable { .. }));

        let message = err.to_string();
        assert!(message.ends_with("self/io not readable"), "{}", message);
        assert!(!message.contains("os error"), "{}", message);
        assert!(!message.contains("No such file"), "{}", message);

        fs::write(dir.path().join("self/io"), "syscr: 1\n").unwrap();
        let message = check_io_accounting(dir.path()).unwrap_err().to_string();
        assert!(message.ends_with("has no rchar/wchar counters"), "{}", message);
    }

    #[test]
    fn test_fake_proc_passes() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("self")).unwrap();
        fs::write(dir.path().join("self/io"), "rchar: 10\nwchar: 20\n").unwrap();
        assert!(validate_requirements(dir.path()).is_ok());
    }
}
