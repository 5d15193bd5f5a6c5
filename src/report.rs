//! Run reporting: secret registration and named step outputs

use std::future::Future;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::redact;

/// Output name under which the created keychain is reported
pub const KEYCHAIN_OUTPUT: &str = "keychain-name";

/// Sink for secrets and results produced by a run
pub trait Reporter: Send + Sync {
    /// Mark `secret` as sensitive so it is masked in all later output
    fn set_secret(&self, secret: &str);

    /// Publish a named result for downstream steps
    fn set_output(&self, name: &str, value: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Reports through the process-wide redactor and the Actions output file
#[derive(Debug, Clone, Default)]
pub struct ActionsReporter {
    output_file: Option<PathBuf>,
}

impl ActionsReporter {
    /// Use the file named by `GITHUB_OUTPUT`, or stdout when it is unset
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            output_file: std::env::var_os("GITHUB_OUTPUT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    #[must_use]
    pub fn with_output_file(path: impl Into<PathBuf>) -> Self {
        Self {
            output_file: Some(path.into()),
        }
    }
}

impl Reporter for ActionsReporter {
    fn set_secret(&self, secret: &str) {
        redact::global().register(secret);
    }

    async fn set_output(&self, name: &str, value: &str) -> Result<()> {
        let Some(path) = &self.output_file else {
            println!("{name}={value}");
            return Ok(());
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(format_output(name, value).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Render one entry of the output file.
///
/// Multi-line values use the heredoc form the runner expects.
#[must_use]
pub fn format_output(name: &str, value: &str) -> String {
    if !value.contains('\n') {
        return format!("{name}={value}\n");
    }

    let mut delimiter = String::from("ghadelimiter");
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}
