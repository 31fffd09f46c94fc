//! Token set model and its on-disk representation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AuthError, Result};

/// Lifetime assumed when the token file does not state one
pub const DEFAULT_EXPIRES_IN: u64 = 3599;

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN
}

/// OAuth credentials as stored in the token file
///
/// Unknown fields returned by the token endpoint (`scope`, `token_type`, ...)
/// are kept and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    /// Unix timestamp (seconds) at which the access token was issued
    #[serde(default, alias = "generatedAt")]
    pub generated_at: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for TokenSet {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            refresh_token: String::new(),
            expires_in: DEFAULT_EXPIRES_IN,
            generated_at: 0.0,
            extra: BTreeMap::new(),
        }
    }
}

impl TokenSet {
    /// Whether the access token is expired, or will be within `skew`, at `now`
    /// (unix seconds)
    pub fn is_expired(&self, now: f64, skew: Duration) -> bool {
        if self.access_token.is_empty() {
            return true;
        }
        let lifetime = self.expires_in as f64 - skew.as_secs_f64();
        now - self.generated_at >= lifetime
    }

    /// Seconds left before the access token expires at `now`, zero if past
    pub fn remaining_secs(&self, now: f64) -> u64 {
        let left = self.generated_at + self.expires_in as f64 - now;
        if left > 0.0 {
            left as u64
        } else {
            0
        }
    }
}

/// Token file on disk
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the token file
    pub fn load(&self) -> Result<TokenSet> {
        let contents = fs::read_to_string(&self.path).map_err(|source| AuthError::TokenFileRead {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| AuthError::TokenFileParse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the token set with sorted keys, replacing the file atomically
    ///
    /// The contents go to a sibling temp file first, which is then renamed
    /// over the target so readers never observe a half-written file.
    pub fn save(&self, tokens: &TokenSet) -> Result<()> {
        let write_err = |source| AuthError::TokenFileWrite {
            path: self.path.clone(),
            source,
        };

        // Going through Value sorts the keys, flattened extras included
        let value = serde_json::to_value(tokens).map_err(|source| AuthError::TokenFileParse {
            path: self.path.clone(),
            source,
        })?;
        let json = serde_json::to_string_pretty(&value).map_err(|source| AuthError::TokenFileParse {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json).map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tokens".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
