//! Keychain creation and deletion

use crate::error::{KeychainError, Result};
use crate::report::{KEYCHAIN_OUTPUT, Reporter};
use crate::security::{SecurityCommand, SecurityTool};
use crate::{debug, info};

/// Drives one keychain through its lifecycle.
///
/// Every operation is a fixed sequence of `security` commands, each awaited
/// before the next is issued. Nothing here locks the keychain name; one job
/// per keychain name is assumed.
pub struct KeychainManager<T, R> {
    tool: T,
    reporter: R,
}

impl<T: SecurityTool, R: Reporter> KeychainManager<T, R> {
    pub fn new(tool: T, reporter: R) -> Self {
        Self { tool, reporter }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Create, unlock and configure `keychain`, then add it to the user search list.
    ///
    /// A keychain left behind under the same name is deleted first; failure
    /// of that step is expected when none exists and is only logged. Any
    /// later failure aborts the remaining steps and nothing is reported.
    /// On success the keychain name is published as the `keychain-name` output.
    pub async fn create(&self, keychain: &str, password: &str, timeout_secs: u64) -> Result<()> {
        self.reporter.set_secret(password);
        ensure_name(keychain)?;

        if !self.best_effort(&SecurityCommand::delete_keychain(keychain)).await {
            debug!("Keychain {keychain} does not exist");
        }

        debug!("Creating keychain {keychain}");
        self.strict(&SecurityCommand::create_keychain(keychain, password)).await?;
        info!("Keychain {keychain} created");

        debug!("Unlocking keychain {keychain}");
        self.strict(&SecurityCommand::unlock_keychain(keychain, password)).await?;

        debug!("Setting keychain timeout to {timeout_secs} seconds");
        self.strict(&SecurityCommand::set_keychain_settings(keychain, timeout_secs))
            .await?;

        debug!("Adding keychain {keychain} to the user search list");
        self.strict(&SecurityCommand::list_keychains(keychain)).await?;

        self.reporter.set_output(KEYCHAIN_OUTPUT, keychain).await
    }

    /// Delete `keychain`.
    ///
    /// Deleting a keychain that does not exist fails; callers wanting
    /// best-effort deletion ignore the error themselves.
    pub async fn delete(&self, keychain: &str) -> Result<()> {
        ensure_name(keychain)?;

        debug!("Deleting keychain {keychain}");
        self.strict(&SecurityCommand::delete_keychain(keychain)).await?;
        info!("Keychain {keychain} deleted");
        Ok(())
    }

    /// Run `command`, propagating any failure unchanged
    pub(super) async fn strict(&self, command: &SecurityCommand) -> Result<()> {
        self.tool.run(command).await
    }

    /// Run `command`, logging a failure instead of returning it.
    ///
    /// Returns whether the command succeeded.
    pub(super) async fn best_effort(&self, command: &SecurityCommand) -> bool {
        match self.tool.run(command).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Ignoring failed security {}: {e}", command.subcommand());
                false
            }
        }
    }
}

pub(super) fn ensure_name(keychain: &str) -> Result<()> {
    if keychain.trim().is_empty() {
        return Err(KeychainError::InvalidConfig(
            "Keychain name must not be empty".to_string(),
        ));
    }
    Ok(())
}
