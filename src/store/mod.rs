//! Backends the control plane reaches through traits: the shared document
//! store and the secret vault.

pub mod document;
pub mod vault;

pub use document::{DocumentStore, FileDocumentStore, KvPair, LockHandle, StoreLock};
pub use vault::{FileSecretVault, SecretVault};
