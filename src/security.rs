//! Invocation of the macOS `security` tool
//!
//! All keychain state changes go through [`SecurityTool`]. Each call is one
//! subprocess, awaited to completion before the next starts.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::debug;
use crate::error::{KeychainError, Result};

/// Program name resolved through `PATH` by default
pub const SECURITY_PROGRAM: &str = "security";

/// Keychain that stays in the user search list alongside the new one
pub const LOGIN_KEYCHAIN: &str = "login.keychain";

/// Tool trusted to use an imported identity
pub const CODESIGN_PATH: &str = "/usr/bin/codesign";

/// Partition list granting the signing toolchain prompt-free key access
pub const SIGNING_PARTITIONS: [&str; 3] = ["apple-tool:", "apple:", "codesign:"];

/// One `security` invocation: a subcommand plus its ordered arguments.
///
/// Arguments may contain secrets. Only [`subcommand`](Self::subcommand) is
/// ever used in error messages.
#[derive(Clone, PartialEq, Eq)]
pub struct SecurityCommand {
    args: Vec<String>,
}

impl SecurityCommand {
    fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn create_keychain(keychain: &str, password: &str) -> Self {
        Self::new(["create-keychain", "-p", password, keychain])
    }

    pub fn unlock_keychain(keychain: &str, password: &str) -> Self {
        Self::new(["unlock-keychain", "-p", password, keychain])
    }

    pub fn set_keychain_settings(keychain: &str, timeout_secs: u64) -> Self {
        Self::new([
            "set-keychain-settings".to_string(),
            "-t".to_string(),
            timeout_secs.to_string(),
            "-u".to_string(),
            keychain.to_string(),
        ])
    }

    /// Append `keychain` to the user search list next to the login keychain
    pub fn list_keychains(keychain: &str) -> Self {
        Self::new(["list-keychains", "-d", "user", "-s", LOGIN_KEYCHAIN, keychain])
    }

    pub fn delete_keychain(keychain: &str) -> Self {
        Self::new(["delete-keychain", keychain])
    }

    /// Import a PKCS#12 bundle, trusting codesign with non-extractable access
    pub fn import_pkcs12(certificate_path: &Path, passphrase: &str, keychain: &str) -> Result<Self> {
        let path = certificate_path.to_str().ok_or_else(|| {
            KeychainError::InvalidConfig(format!(
                "Certificate path is not valid UTF-8: {}",
                certificate_path.display()
            ))
        })?;

        Ok(Self::new([
            "import", path, "-P", passphrase, "-k", keychain, "-t", "cert", "-f", "pkcs12", "-T",
            CODESIGN_PATH, "-x",
        ]))
    }

    pub fn set_key_partition_list(keychain: &str, password: &str) -> Self {
        let partitions = SIGNING_PARTITIONS.join(",");
        Self::new([
            "set-key-partition-list",
            "-S",
            partitions.as_str(),
            "-s",
            "-k",
            password,
            keychain,
        ])
    }

    pub fn find_certificates(keychain: &str) -> Self {
        Self::new(["find-certificate", "-a", keychain])
    }

    #[must_use]
    pub fn subcommand(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl std::fmt::Debug for SecurityCommand {
    // Arguments are left out: they carry passwords
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityCommand")
            .field("subcommand", &self.subcommand())
            .field("args", &self.args.len())
            .finish()
    }
}

/// Executes `security` commands.
///
/// `run` waits for the command and surfaces a non-zero exit as an error.
/// `output` additionally captures stdout as text.
pub trait SecurityTool: Send + Sync {
    fn run(&self, command: &SecurityCommand) -> impl Future<Output = Result<()>> + Send;

    fn output(&self, command: &SecurityCommand) -> impl Future<Output = Result<String>> + Send;
}

/// Runs commands against the real `security` binary
#[derive(Debug, Clone)]
pub struct SecurityCli {
    program: PathBuf,
}

impl Default for SecurityCli {
    fn default() -> Self {
        Self::new(SECURITY_PROGRAM)
    }
}

impl SecurityCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn execute(&self, command: &SecurityCommand) -> Result<std::process::Output> {
        debug!("[command]{} {}", self.program.display(), command.args().join(" "));

        let output = tokio::process::Command::new(&self.program)
            .args(command.args())
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|source| KeychainError::CommandSpawn {
                subcommand: command.subcommand().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(KeychainError::CommandFailed {
                subcommand: command.subcommand().to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

impl SecurityTool for SecurityCli {
    async fn run(&self, command: &SecurityCommand) -> Result<()> {
        let output = self.execute(command).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!("{line}");
        }

        Ok(())
    }

    async fn output(&self, command: &SecurityCommand) -> Result<String> {
        let output = self.execute(command).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
