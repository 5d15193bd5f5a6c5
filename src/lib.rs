//! Temporary keychain provisioning for code signing in CI

#[macro_use]
pub mod output;

pub mod config;
pub mod error;
pub mod job;
pub mod keychain;
pub mod redact;
pub mod report;
pub mod security;

/// Attempt to remove a file or directory, logging a warning on failure.
///
/// Cleanup is best-effort: a missing path is fine, and failures are
/// reported but never returned.
pub async fn cleanup_path<P: AsRef<std::path::Path>>(path: P, description: &str) {
    let path = path.as_ref();

    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return;
    }

    let is_dir = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let result = if is_dir {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    if let Err(e) = result {
        // NotFound is OK - already removed between the check and the removal
        if e.kind() != std::io::ErrorKind::NotFound {
            let suggestion = match e.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    format!("Check file permissions or try: rm -rf {}", path.display())
                }
                _ => "Manual cleanup may be needed".to_string(),
            };
            warn!(
                "Failed to cleanup {description}\n   Path: {}\n   Error: {e}\n   Suggestion: {suggestion}",
                path.display()
            );
        }
    }
}

// Re-export common types
pub use config::{JobConfig, JobInputs};
pub use error::{KeychainError, Result};
pub use job::{JobOutcome, run_job};
pub use keychain::KeychainManager;
pub use report::{ActionsReporter, Reporter};
pub use security::{SecurityCli, SecurityCommand, SecurityTool};
