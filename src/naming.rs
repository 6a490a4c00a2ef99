//! Composition paths and the identifiers derived from them
//!
//! Every entity is created under a [`Scope`]. Names, logical ids and the
//! platform app id are all pure functions of the scope path, so the same
//! composition always yields the same identifiers.

use sha2::{Digest, Sha256};
use std::fmt;

const PATH_SEPARATOR: &str = "/";
const APP_ID_PREFIX: char = 'd';
const APP_ID_HASH_LEN: usize = 13;
const LOGICAL_ID_HASH_LEN: usize = 8;

/// Position of an entity in the composition tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    segments: Vec<String>,
}

impl Scope {
    pub fn root(id: &str) -> Self {
        Self {
            segments: vec![id.to_string()],
        }
    }

    pub fn child(&self, id: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(id.to_string());
        Self { segments }
    }

    pub fn id(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn path(&self) -> String {
        self.segments.join(PATH_SEPARATOR)
    }

    /// Path with separators stripped, e.g. `Web/App` -> `WebApp`.
    pub fn unique_name(&self) -> String {
        self.segments.concat()
    }

    /// Template logical id: the stripped path followed by a short path hash.
    pub fn logical_id(&self) -> String {
        let name: String = self
            .unique_name()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let hash = path_hash(&self.path());
        format!("{}{}", name, &hash[..LOGICAL_ID_HASH_LEN].to_uppercase())
    }

    /// Platform-style application id derived from this scope, e.g. `d1a2b3c4d5e6f`.
    pub fn generated_app_id(&self) -> String {
        let hash = path_hash(&self.path());
        format!("{}{}", APP_ID_PREFIX, &hash[..APP_ID_HASH_LEN])
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

fn path_hash(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hex::encode(hasher.finalize())
}
