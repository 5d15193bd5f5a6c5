//! Secret redaction for everything this crate prints.
//!
//! Secrets are registered once, before the operation that could leak them
//! runs. From then on every log line is filtered through [`Redactor::redact`].
//! On a GitHub Actions runner registration is also forwarded to the runner
//! with `::add-mask::` so its own log capture masks the value.

use std::sync::{LazyLock, PoisonError, RwLock};
use zeroize::Zeroizing;

/// Replacement text for a masked secret
pub const MASK: &str = "***";

static GLOBAL: LazyLock<Redactor> = LazyLock::new(|| Redactor::new(running_in_actions()));

/// Process-wide redactor used by the logging macros
pub fn global() -> &'static Redactor {
    &GLOBAL
}

/// True when the process runs as a GitHub Actions step
#[must_use]
pub fn running_in_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

pub struct Redactor {
    secrets: RwLock<Vec<Zeroizing<String>>>,
    announce: bool,
}

impl Redactor {
    /// Create an empty redactor.
    ///
    /// `announce` forwards every new secret to the Actions runner.
    #[must_use]
    pub fn new(announce: bool) -> Self {
        Self {
            secrets: RwLock::new(Vec::new()),
            announce,
        }
    }

    /// Register `secret` so it never appears in later output.
    ///
    /// Empty strings are ignored, as masking them would mangle every line.
    /// Registering the same value twice is a no-op.
    pub fn register(&self, secret: &str) {
        if secret.is_empty() {
            return;
        }

        let mut secrets = self.secrets.write().unwrap_or_else(PoisonError::into_inner);
        if secrets.iter().any(|s| s.as_str() == secret) {
            return;
        }

        // Longest first so a secret containing another is masked whole
        let pos = secrets
            .iter()
            .position(|s| s.len() < secret.len())
            .unwrap_or(secrets.len());
        secrets.insert(pos, Zeroizing::new(secret.to_string()));
        drop(secrets);

        if self.announce {
            // Masking must reach the runner even if other output is broken
            for line in secret.lines().filter(|l| !l.is_empty()) {
                println!("::add-mask::{line}");
            }
        }
    }

    /// Return `text` with every registered secret replaced by [`MASK`]
    #[must_use]
    pub fn redact(&self, text: &str) -> String {
        let secrets = self.secrets.read().unwrap_or_else(PoisonError::into_inner);
        let mut out = text.to_string();
        for secret in secrets.iter() {
            if out.contains(secret.as_str()) {
                out = out.replace(secret.as_str(), MASK);
            }
        }
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
