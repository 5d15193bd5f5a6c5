//! In-memory stand-in for the `security` tool.
//!
//! Keeps just enough keychain state to behave like the real tool for the
//! commands the crate issues: names must exist before use, passwords must
//! match, and deleting a missing keychain fails.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use kodegen_keychain::{KeychainError, Reporter, Result, SecurityCommand, SecurityTool};

#[derive(Debug, Default)]
struct Keychain {
    password: String,
    unlocked: bool,
    timeout: Option<u64>,
    labels: Vec<String>,
    partitions_granted: bool,
}

#[derive(Default)]
struct State {
    calls: Vec<Vec<String>>,
    keychains: HashMap<String, Keychain>,
    search_list: Vec<String>,
    failures: HashMap<String, String>,
    inventory: Option<String>,
}

#[derive(Default)]
pub struct FakeSecurity {
    state: Mutex<State>,
}

fn failed(subcommand: &str, code: i32, stderr: &str) -> KeychainError {
    KeychainError::CommandFailed {
        subcommand: subcommand.to_string(),
        code: Some(code),
        stderr: stderr.to_string(),
    }
}

const NOT_FOUND: &str = "The specified keychain could not be found.";

impl FakeSecurity {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake state poisoned")
    }

    /// Make every `subcommand` invocation exit 1 with `stderr`
    pub fn fail(&self, subcommand: &str, stderr: &str) {
        self.lock()
            .failures
            .insert(subcommand.to_string(), stderr.to_string());
    }

    /// Return `text` from `find-certificate` instead of generated records
    pub fn set_inventory(&self, text: &str) {
        self.lock().inventory = Some(text.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.iter().map(|c| c.join(" ")).collect()
    }

    pub fn subcommands(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| c.first().cloned())
            .collect()
    }

    pub fn exists(&self, keychain: &str) -> bool {
        self.lock().keychains.contains_key(keychain)
    }

    pub fn is_unlocked(&self, keychain: &str) -> bool {
        self.lock().keychains.get(keychain).is_some_and(|k| k.unlocked)
    }

    pub fn timeout(&self, keychain: &str) -> Option<u64> {
        self.lock().keychains.get(keychain).and_then(|k| k.timeout)
    }

    pub fn labels(&self, keychain: &str) -> Vec<String> {
        self.lock()
            .keychains
            .get(keychain)
            .map(|k| k.labels.clone())
            .unwrap_or_default()
    }

    pub fn partitions_granted(&self, keychain: &str) -> bool {
        self.lock()
            .keychains
            .get(keychain)
            .is_some_and(|k| k.partitions_granted)
    }

    pub fn search_list(&self) -> Vec<String> {
        self.lock().search_list.clone()
    }

    fn apply(&self, args: &[String]) -> Result<String> {
        let mut state = self.lock();
        state.calls.push(args.to_vec());

        let sub = args.first().map(String::as_str).unwrap_or_default();
        if let Some(stderr) = state.failures.get(sub) {
            return Err(failed(sub, 1, stderr));
        }

        let keychain = args.last().map(String::as_str).unwrap_or_default().to_string();
        match sub {
            "create-keychain" => {
                if state.keychains.contains_key(&keychain) {
                    return Err(failed(sub, 48, "A keychain with the same name already exists."));
                }
                let password = args[2].clone();
                state.keychains.insert(
                    keychain,
                    Keychain {
                        password,
                        ..Keychain::default()
                    },
                );
            }
            "unlock-keychain" => {
                let entry = state
                    .keychains
                    .get_mut(&keychain)
                    .ok_or_else(|| failed(sub, 50, NOT_FOUND))?;
                if entry.password != args[2] {
                    return Err(failed(sub, 51, "The user name or passphrase you entered is not correct."));
                }
                entry.unlocked = true;
            }
            "set-keychain-settings" => {
                let timeout = args[2].parse().ok();
                let entry = state
                    .keychains
                    .get_mut(&keychain)
                    .ok_or_else(|| failed(sub, 50, NOT_FOUND))?;
                entry.timeout = timeout;
            }
            "list-keychains" => {
                state.search_list = args[4..].to_vec();
            }
            "delete-keychain" => {
                state
                    .keychains
                    .remove(&keychain)
                    .ok_or_else(|| failed(sub, 50, NOT_FOUND))?;
                state.search_list.retain(|k| *k != keychain);
            }
            "import" => {
                let target = args[5].clone();
                let label = std::fs::read_to_string(&args[1])
                    .map_err(|e| failed(sub, 1, &e.to_string()))?;
                let entry = state
                    .keychains
                    .get_mut(&target)
                    .ok_or_else(|| failed(sub, 50, NOT_FOUND))?;
                if !entry.unlocked {
                    return Err(failed(sub, 1, "User interaction is not allowed."));
                }
                entry.labels.push(label.trim().to_string());
            }
            "set-key-partition-list" => {
                let entry = state
                    .keychains
                    .get_mut(&keychain)
                    .ok_or_else(|| failed(sub, 50, NOT_FOUND))?;
                if entry.password != args[5] {
                    return Err(failed(sub, 1, "The specified item could not be found in the keychain."));
                }
                entry.partitions_granted = true;
            }
            "find-certificate" => {
                if let Some(text) = &state.inventory {
                    return Ok(text.clone());
                }
                let entry = state
                    .keychains
                    .get(&keychain)
                    .ok_or_else(|| failed(sub, 50, NOT_FOUND))?;
                return Ok(entry
                    .labels
                    .iter()
                    .map(|label| {
                        format!(
                            "keychain: \"{keychain}\"\nattributes:\n    \"labl\"<blob>=\"{label}\"\n"
                        )
                    })
                    .collect());
            }
            other => return Err(failed(other, 2, "unknown command")),
        }

        Ok(String::new())
    }
}

impl SecurityTool for FakeSecurity {
    async fn run(&self, command: &SecurityCommand) -> Result<()> {
        self.apply(command.args()).map(|_| ())
    }

    async fn output(&self, command: &SecurityCommand) -> Result<String> {
        self.apply(command.args())
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    secrets: Mutex<Vec<String>>,
    outputs: Mutex<Vec<(String, String)>>,
}

impl RecordingReporter {
    pub fn secrets(&self) -> Vec<String> {
        self.secrets.lock().expect("poisoned").clone()
    }

    pub fn outputs(&self) -> Vec<(String, String)> {
        self.outputs.lock().expect("poisoned").clone()
    }
}

impl Reporter for RecordingReporter {
    fn set_secret(&self, secret: &str) {
        self.secrets.lock().expect("poisoned").push(secret.to_string());
    }

    async fn set_output(&self, name: &str, value: &str) -> Result<()> {
        self.outputs
            .lock()
            .expect("poisoned")
            .push((name.to_string(), value.to_string()));
        Ok(())
    }
}
