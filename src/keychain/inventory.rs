//! Signing certificate inventory of a keychain

use regex::Regex;
use std::sync::LazyLock;

use super::manager::{KeychainManager, ensure_name};
use crate::error::Result;
use crate::report::Reporter;
use crate::security::{SecurityCommand, SecurityTool};

/// Words marking a label as a development, distribution or device signing identity
pub const LABEL_MARKERS: [&str; 4] = ["Development", "Distribution", "Mac", "iPhone"];

// `"labl"<blob>="Apple Development: Jane Doe (TEAM123)"`
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let markers = LABEL_MARKERS.join("|");
    Regex::new(&format!(r#""labl"<blob>="([^"]*(?:{markers})[^"]*)""#))
        .expect("label pattern is a valid regex")
});

impl<T: SecurityTool, R: Reporter> KeychainManager<T, R> {
    /// List the signing certificate labels stored in `keychain`.
    ///
    /// Only a failure to run `security find-certificate` is an error;
    /// output without matching labels yields an empty list.
    pub async fn list_certificates(&self, keychain: &str) -> Result<Vec<String>> {
        ensure_name(keychain)?;

        let inventory = self
            .tool()
            .output(&SecurityCommand::find_certificates(keychain))
            .await?;
        Ok(parse_certificate_labels(&inventory))
    }
}

/// Extract signing certificate labels from `security find-certificate -a` output.
///
/// Labels are returned in the order they appear.
#[must_use]
pub fn parse_certificate_labels(inventory: &str) -> Vec<String> {
    LABEL_RE
        .captures_iter(inventory)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
