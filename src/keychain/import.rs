//! Certificate import into a job keychain

use std::path::Path;

use super::manager::{KeychainManager, ensure_name};
use crate::debug;
use crate::error::Result;
use crate::report::Reporter;
use crate::security::{SecurityCommand, SecurityTool};

impl<T: SecurityTool, R: Reporter> KeychainManager<T, R> {
    /// Import a PKCS#12 bundle into `keychain` and let the signing toolchain use its key.
    ///
    /// The keychain must already exist and be unlocked with `password`.
    /// The file at `certificate_path` must stay in place until this returns.
    /// Duplicates are not checked here; `security` decides how to treat them.
    /// If the import fails the partition list is left untouched.
    pub async fn import_certificate(
        &self,
        certificate_path: &Path,
        passphrase: &str,
        keychain: &str,
        password: &str,
    ) -> Result<()> {
        self.reporter().set_secret(passphrase);
        self.reporter().set_secret(password);
        ensure_name(keychain)?;

        debug!(
            "Importing {} into keychain {keychain}",
            certificate_path.display()
        );
        self.strict(&SecurityCommand::import_pkcs12(
            certificate_path,
            passphrase,
            keychain,
        )?)
        .await?;

        debug!("Setting key partition list");
        self.strict(&SecurityCommand::set_key_partition_list(keychain, password))
            .await
    }
}
