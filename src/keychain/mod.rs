//! Temporary keychain lifecycle
//!
//! This module provides:
//! - Creating, unlocking and registering a job keychain
//! - Importing PKCS#12 signing certificates with codesign access
//! - Listing the signing certificates a keychain holds
//! - Deleting the keychain again

mod import;
mod inventory;
mod manager;

pub use inventory::{LABEL_MARKERS, parse_certificate_labels};
pub use manager::KeychainManager;
