//! Configuration for a keychain provisioning job.
//!
//! Inputs come from three layers, highest precedence first: command-line
//! flags, the GitHub Actions `INPUT_*` environment, and an optional TOML
//! file. [`JobInputs::resolve`] merges and validates them into a [`JobConfig`].

use clap::Args;
use rand::distr::{Alphanumeric, SampleString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{KeychainError, Result};
use crate::security::SECURITY_PROGRAM;

/// Suffix appended to keychain names that lack it
pub const KEYCHAIN_SUFFIX: &str = ".keychain";

/// Default idle time before the keychain locks itself
pub const DEFAULT_KEYCHAIN_TIMEOUT: u64 = 3600;

/// Length of generated keychain passwords
const GENERATED_PASSWORD_LEN: usize = 32;

/// Raw job inputs from flags and the Actions environment
#[derive(Default, Clone, Args)]
pub struct JobInputs {
    /// Path to a TOML job file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Keychain name (".keychain" is appended when missing)
    #[arg(long, env = "INPUT_KEYCHAIN-NAME")]
    pub keychain_name: Option<String>,

    /// Keychain password (random when omitted)
    #[arg(long, env = "INPUT_KEYCHAIN-PASSWORD", hide_env_values = true)]
    pub keychain_password: Option<String>,

    /// Seconds of inactivity before the keychain locks
    #[arg(long, env = "INPUT_KEYCHAIN-TIMEOUT")]
    pub keychain_timeout: Option<String>,

    /// Base64 PKCS#12 certificates, one per line
    #[arg(
        long = "certificate",
        env = "INPUT_SIGNING-CERTIFICATES",
        value_delimiter = '\n',
        hide_env_values = true
    )]
    pub certificates: Vec<String>,

    /// Passphrase shared by all certificates
    #[arg(long, env = "INPUT_SIGNING-CERTIFICATE-PASSPHRASE", hide_env_values = true)]
    pub certificate_passphrase: Option<String>,

    /// Keep the keychain after the job for inspection
    #[arg(long)]
    pub retain_keychain: bool,

    /// Print the signing certificates found in the keychain
    #[arg(long)]
    pub list_certificates: bool,

    /// Verbose output (also enabled by RUNNER_DEBUG=1)
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Path to the security binary
    #[arg(long)]
    pub security_program: Option<PathBuf>,

    /// Directory for decoded certificate files (defaults to RUNNER_TEMP)
    #[arg(long, env = "RUNNER_TEMP")]
    pub temp_dir: Option<PathBuf>,
}

/// Job file contents. Every field is optional and overridden by flags.
#[derive(Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub keychain_name: Option<String>,
    pub keychain_password: Option<String>,
    pub keychain_timeout: Option<u64>,
    #[serde(default)]
    pub signing_certificates: Vec<String>,
    pub signing_certificate_passphrase: Option<String>,
    #[serde(default)]
    pub retain_keychain: bool,
    #[serde(default)]
    pub list_certificates: bool,
    #[serde(default)]
    pub debug: bool,
    pub security_program: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
}

impl FileConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| parse_error(content, &e))
    }
}

// toml's Display quotes the source line, which may hold a password
fn parse_error(content: &str, err: &toml::de::Error) -> KeychainError {
    let message = mask_quoted(err.message());
    let Some(span) = err.span() else {
        return KeychainError::ConfigParse(message);
    };

    let before = &content[..span.start.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    KeychainError::ConfigParse(format!("line {line}, column {column}: {message}"))
}

/// Mask double-quoted values serde echoes back, e.g. `invalid type: string "..."`
fn mask_quoted(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut in_quotes = false;
    for c in message.chars() {
        if c == '"' {
            if in_quotes {
                out.push_str(crate::redact::MASK);
            }
            in_quotes = !in_quotes;
            out.push(c);
        } else if !in_quotes {
            out.push(c);
        }
    }
    out
}

impl Drop for FileConfig {
    fn drop(&mut self) {
        self.keychain_password.zeroize();
        self.signing_certificate_passphrase.zeroize();
        self.signing_certificates.zeroize();
    }
}

/// Validated configuration for one job run
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct JobConfig {
    pub keychain_name: String,
    pub keychain_password: String,
    pub keychain_timeout: u64,
    pub certificates: Vec<String>,
    pub certificate_passphrase: String,
    pub retain_keychain: bool,
    pub list_certificates: bool,
    pub debug: bool,
    #[zeroize(skip)]
    pub security_program: PathBuf,
    #[zeroize(skip)]
    pub temp_dir: Option<PathBuf>,
}

impl std::fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobConfig")
            .field("keychain_name", &self.keychain_name)
            .field("keychain_password", &"<redacted>")
            .field("keychain_timeout", &self.keychain_timeout)
            .field("certificates", &self.certificates.len())
            .field("certificate_passphrase", &"<redacted>")
            .field("retain_keychain", &self.retain_keychain)
            .field("list_certificates", &self.list_certificates)
            .field("debug", &self.debug)
            .field("security_program", &self.security_program)
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}

impl JobInputs {
    /// Load the job file named by `--config`, if any, and merge
    pub async fn load(self) -> Result<JobConfig> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path).await?,
            None => FileConfig::default(),
        };
        self.resolve(file, runner_debug())
    }

    /// Merge flags over `file` and validate the result
    pub fn resolve(self, mut file: FileConfig, runner_debug: bool) -> Result<JobConfig> {
        let name = non_empty(self.keychain_name)
            .or_else(|| non_empty(file.keychain_name.take()))
            .ok_or_else(|| KeychainError::MissingConfig("keychain-name".to_string()))?;
        let keychain_name = with_suffix(name.trim());

        let keychain_password = non_empty(self.keychain_password)
            .or_else(|| non_empty(file.keychain_password.take()))
            .unwrap_or_else(|| Alphanumeric.sample_string(&mut rand::rng(), GENERATED_PASSWORD_LEN));

        let keychain_timeout = match non_empty(self.keychain_timeout) {
            Some(raw) => parse_timeout(&raw)?,
            None => file.keychain_timeout.unwrap_or(DEFAULT_KEYCHAIN_TIMEOUT),
        };

        let mut certificates = split_certificates(&self.certificates);
        if certificates.is_empty() {
            certificates = split_certificates(&file.signing_certificates);
        }
        if certificates.is_empty() {
            return Err(KeychainError::MissingConfig(
                "signing-certificates".to_string(),
            ));
        }

        // The runner exports unset inputs as empty strings; an empty
        // passphrase is only taken from the job file
        let certificate_passphrase = non_empty(self.certificate_passphrase)
            .or_else(|| file.signing_certificate_passphrase.take())
            .ok_or_else(|| {
                KeychainError::MissingConfig("signing-certificate-passphrase".to_string())
            })?;

        Ok(JobConfig {
            keychain_name,
            keychain_password,
            keychain_timeout,
            certificates,
            certificate_passphrase,
            retain_keychain: self.retain_keychain || file.retain_keychain,
            list_certificates: self.list_certificates || file.list_certificates,
            debug: self.debug || file.debug || runner_debug,
            security_program: self
                .security_program
                .or_else(|| file.security_program.take())
                .unwrap_or_else(|| PathBuf::from(SECURITY_PROGRAM)),
            temp_dir: self.temp_dir.or_else(|| file.temp_dir.take()),
        })
    }
}

/// True when the Actions runner has step debugging enabled
#[must_use]
pub fn runner_debug() -> bool {
    std::env::var("RUNNER_DEBUG").is_ok_and(|v| v == "1")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn with_suffix(name: &str) -> String {
    if name.ends_with(KEYCHAIN_SUFFIX) || name.ends_with(".keychain-db") {
        name.to_string()
    } else {
        format!("{name}{KEYCHAIN_SUFFIX}")
    }
}

fn parse_timeout(raw: &str) -> Result<u64> {
    raw.trim().parse().map_err(|_| {
        KeychainError::InvalidConfig(format!(
            "keychain-timeout must be a non-negative number of seconds, got '{}'",
            raw.trim()
        ))
    })
}

/// One certificate per non-blank line, surrounding whitespace removed
fn split_certificates(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|entry| entry.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> JobInputs {
        JobInputs {
            keychain_name: Some("ci".to_string()),
            keychain_password: Some("s3cr3t".to_string()),
            keychain_timeout: Some("300".to_string()),
            certificates: vec!["QUJD\n\n  REVG  \n".to_string()],
            certificate_passphrase: Some("pass".to_string()),
            ..JobInputs::default()
        }
    }

    #[test]
    fn test_resolve_from_inputs() {
        let config = inputs().resolve(FileConfig::default(), false).expect("valid");
        assert_eq!(config.keychain_name, "ci.keychain");
        assert_eq!(config.keychain_password, "s3cr3t");
        assert_eq!(config.keychain_timeout, 300);
        assert_eq!(config.certificates, ["QUJD", "REVG"]);
        assert_eq!(config.security_program, PathBuf::from("security"));
        assert!(!config.retain_keychain);
    }

    #[test]
    fn test_suffix_not_doubled() {
        let mut raw = inputs();
        raw.keychain_name = Some("build.keychain".to_string());
        let config = raw.resolve(FileConfig::default(), false).expect("valid");
        assert_eq!(config.keychain_name, "build.keychain");
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut raw = inputs();
        raw.keychain_name = Some("   ".to_string());
        let err = raw.resolve(FileConfig::default(), false).expect_err("no name");
        assert!(matches!(err, KeychainError::MissingConfig(ref f) if f == "keychain-name"));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let mut raw = inputs();
        raw.keychain_timeout = Some("-5".to_string());
        let err = raw.resolve(FileConfig::default(), false).expect_err("negative");
        assert!(matches!(err, KeychainError::InvalidConfig(_)));
    }

    #[test]
    fn test_generated_password_when_absent() {
        let mut raw = inputs();
        raw.keychain_password = None;
        let config = raw.resolve(FileConfig::default(), false).expect("valid");
        assert_eq!(config.keychain_password.len(), GENERATED_PASSWORD_LEN);
        assert!(config.keychain_password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_file_values_used_under_flags() {
        let file = FileConfig::parse(
            r#"
keychain-name = "from-file"
keychain-timeout = 120
signing-certificates = ["QUJD"]
signing-certificate-passphrase = "file-pass"
retain-keychain = true
"#,
        )
        .expect("parse");

        let raw = JobInputs {
            keychain_name: Some("from-flag".to_string()),
            ..JobInputs::default()
        };
        let config = raw.resolve(file, true).expect("valid");
        assert_eq!(config.keychain_name, "from-flag.keychain");
        assert_eq!(config.keychain_timeout, 120);
        assert_eq!(config.certificates, ["QUJD"]);
        assert_eq!(config.certificate_passphrase, "file-pass");
        assert!(config.retain_keychain);
        assert!(config.debug);
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        assert!(matches!(
            FileConfig::parse("keychain-nmae = \"typo\""),
            Err(KeychainError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_parse_error_omits_secret_source_line() {
        let err = FileConfig::parse("keychain_password = \"hunter2\"\n").err().expect("snake_case key");
        let msg = err.to_string();
        assert!(!msg.contains("hunter2"), "{msg}");
        assert!(msg.starts_with("Config file parse error: line 1, column 1: "), "{msg}");
        assert!(msg.contains("keychain_password"), "{msg}");
    }

    #[test]
    fn test_parse_error_masks_echoed_value() {
        let err = FileConfig::parse("keychain-name = \"ci\"\nkeychain-timeout = \"hunter2\"\n")
            .err().expect("timeout is not a string");
        let msg = err.to_string();
        assert!(!msg.contains("hunter2"), "{msg}");
        assert!(msg.contains("line 2"), "{msg}");
    }

    #[test]
    fn test_empty_passphrase_input_falls_back_to_file() {
        let file = FileConfig::parse("signing-certificate-passphrase = \"file-pass\"").expect("parse");
        let mut raw = inputs();
        raw.certificate_passphrase = Some(String::new());
        let config = raw.resolve(file, false).expect("valid");
        assert_eq!(config.certificate_passphrase, "file-pass");
    }

    #[test]
    fn test_empty_passphrase_allowed_from_file() {
        let file = FileConfig::parse("signing-certificate-passphrase = \"\"").expect("parse");
        let mut raw = inputs();
        raw.certificate_passphrase = None;
        let config = raw.resolve(file, false).expect("valid");
        assert_eq!(config.certificate_passphrase, "");
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let config = inputs().resolve(FileConfig::default(), false).expect("valid");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains("pass\""));
    }
}
