//! One provisioning job: create the keychain, import every certificate,
//! optionally list what landed, then clean up whatever the outcome.

use base64::Engine;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zeroize::Zeroizing;

use crate::config::JobConfig;
use crate::error::{KeychainError, Result};
use crate::keychain::KeychainManager;
use crate::output;
use crate::report::Reporter;
use crate::security::SecurityTool;
use crate::{cleanup_path, debug, info, success, warn};

/// Host OS the `security` tool exists on
pub const SUPPORTED_OS: &str = "macos";

/// Result of a successful job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub keychain: String,
    pub imported: usize,
    /// Signing certificate labels, when listing was requested
    pub labels: Option<Vec<String>>,
}

/// Fail unless `os` (as in `std::env::consts::OS`) can run `security`
pub fn ensure_supported_platform(os: &str) -> Result<()> {
    if os == SUPPORTED_OS {
        Ok(())
    } else {
        Err(KeychainError::UnsupportedPlatform(os.to_string()))
    }
}

/// Private directory holding decoded certificate files for one job
pub struct CertificateWorkspace {
    dir: TempDir,
}

impl CertificateWorkspace {
    /// Create the directory under `parent`, or the system temp dir
    pub fn new(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("kodegen-keychain-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Decode base64 certificate number `index` (1-based) into a 0600 `.p12` file
    pub async fn materialize(&self, index: usize, encoded: &str) -> Result<PathBuf> {
        let compact: Zeroizing<String> =
            Zeroizing::new(encoded.chars().filter(|c| !c.is_whitespace()).collect());
        let bytes = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(compact.as_bytes())
                .map_err(|source| KeychainError::CertificateDecode { index, source })?,
        );

        let path = self.dir.path().join(format!("certificate-{index}.p12"));
        tokio::fs::write(&path, bytes.as_slice()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        Ok(path)
    }

    /// Remove the directory and anything left in it
    pub async fn cleanup(self) {
        let path = self.dir.keep();
        cleanup_path(&path, "certificate directory").await;
    }
}

/// Run a full provisioning job on `host_os`.
///
/// Cleanup runs on every path once the platform check passes: the keychain
/// is deleted unless `retain_keychain` is set, and decoded certificate files
/// are always removed. Cleanup failures are logged and never replace the
/// job's own error.
pub async fn run_job<T, R>(
    manager: &KeychainManager<T, R>,
    config: &JobConfig,
    host_os: &str,
) -> Result<JobOutcome>
where
    T: SecurityTool,
    R: Reporter,
{
    manager.reporter().set_secret(&config.keychain_password);
    manager.reporter().set_secret(&config.certificate_passphrase);
    ensure_supported_platform(host_os)?;

    let workspace = CertificateWorkspace::new(config.temp_dir.as_deref())?;
    let result = provision(manager, config, &workspace).await;

    if config.retain_keychain {
        warn!(
            "Keeping keychain {} for inspection; delete it with: security delete-keychain {}",
            config.keychain_name, config.keychain_name
        );
    } else {
        info!("Cleaning up");
        if let Err(e) = manager.delete(&config.keychain_name).await {
            warn!("Failed to delete keychain {}: {e}", config.keychain_name);
        }
    }
    workspace.cleanup().await;

    result
}

async fn provision<T, R>(
    manager: &KeychainManager<T, R>,
    config: &JobConfig,
    workspace: &CertificateWorkspace,
) -> Result<JobOutcome>
where
    T: SecurityTool,
    R: Reporter,
{
    manager
        .create(
            &config.keychain_name,
            &config.keychain_password,
            config.keychain_timeout,
        )
        .await?;

    let total = config.certificates.len();
    output::group(&format!("Importing {total} certificates"));
    let imported = import_all(manager, config, workspace).await;
    output::end_group();
    imported?;
    success!("Certificates imported successfully");

    let labels = if config.list_certificates || config.debug {
        let labels = manager.list_certificates(&config.keychain_name).await?;
        info!("Certificates in {}:", config.keychain_name);
        for label in &labels {
            info!("  * {label}");
        }
        Some(labels)
    } else {
        None
    };

    Ok(JobOutcome {
        keychain: config.keychain_name.clone(),
        imported: total,
        labels,
    })
}

async fn import_all<T, R>(
    manager: &KeychainManager<T, R>,
    config: &JobConfig,
    workspace: &CertificateWorkspace,
) -> Result<()>
where
    T: SecurityTool,
    R: Reporter,
{
    let total = config.certificates.len();
    for (i, encoded) in config.certificates.iter().enumerate() {
        let index = i + 1;
        info!("Importing certificate {index} of {total}");

        let path = workspace.materialize(index, encoded).await?;
        let result = manager
            .import_certificate(
                &path,
                &config.certificate_passphrase,
                &config.keychain_name,
                &config.keychain_password,
            )
            .await;
        cleanup_path(&path, "certificate file").await;
        result?;
        debug!("Certificate {index} imported");
    }
    Ok(())
}
