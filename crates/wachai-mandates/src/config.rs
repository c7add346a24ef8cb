//! Local storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MandateError, MandateResult};

/// Default deadline offset for new mandates (10 minutes).
pub const DEFAULT_DEADLINE_SECS: i64 = 10 * 60;

/// Default EVM chain id.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Where mandates, the wallet file and the exchange spool live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage root (`~/.wachai` unless overridden).
    pub root: PathBuf,

    /// Explicit wallet file path.
    #[serde(default)]
    pub wallet_path: Option<PathBuf>,

    /// Explicit spool directory, shared by everyone exchanging through it.
    #[serde(default)]
    pub spool_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Create config rooted at a directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            wallet_path: None,
            spool_path: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `WACHAI_STORAGE_DIR` | Storage root (default `~/.wachai`) |
    /// | `WACHAI_WALLET_PATH` | Wallet file (default `<root>/wallet.json`) |
    /// | `WACHAI_SPOOL_DIR` | Exchange spool (default `<root>/spool`) |
    pub fn from_env() -> MandateResult<Self> {
        let root = match std::env::var_os("WACHAI_STORAGE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_root()?,
        };
        Ok(Self {
            root,
            wallet_path: std::env::var_os("WACHAI_WALLET_PATH").map(PathBuf::from),
            spool_path: std::env::var_os("WACHAI_SPOOL_DIR").map(PathBuf::from),
        })
    }

    /// Set the wallet file path.
    pub fn with_wallet_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.wallet_path = Some(path.into());
        self
    }

    /// Set the spool directory.
    pub fn with_spool_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.spool_path = Some(path.into());
        self
    }

    pub fn mandates_dir(&self) -> PathBuf {
        self.root.join("mandates")
    }

    pub fn spool_dir(&self) -> PathBuf {
        self.spool_path
            .clone()
            .unwrap_or_else(|| self.root.join("spool"))
    }

    pub fn wallet_path(&self) -> PathBuf {
        self.wallet_path
            .clone()
            .unwrap_or_else(|| self.root.join("wallet.json"))
    }
}

fn default_root() -> MandateResult<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| MandateError::Storage {
        message: "could not determine home directory".to_string(),
    })?;
    Ok(home.join(".wachai"))
}
