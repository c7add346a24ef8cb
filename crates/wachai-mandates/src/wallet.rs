//! Wallet file and signer resolution.
//!
//! The wallet is a small JSON document holding one secp256k1 key:
//!
//! ```json
//! {"address": "0x...", "privateKey": "0x...", "createdAt": "..."}
//! ```
//!
//! On Unix it is written with mode 0600. Signer resolution order:
//! `WACHAI_PRIVATE_KEY`, then the wallet file.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::account::same_address;
use crate::config::StorageConfig;
use crate::error::{MandateError, MandateResult};
use crate::mandate::format_timestamp;
use crate::signer::{LocalWallet, Signer};

pub const PRIVATE_KEY_ENV: &str = "WACHAI_PRIVATE_KEY";

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletFile {
    pub address: String,
    pub private_key: String,
    pub created_at: String,
}

impl std::fmt::Debug for WalletFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletFile")
            .field("address", &self.address)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl WalletFile {
    pub fn from_wallet(wallet: &LocalWallet) -> Self {
        Self {
            address: wallet.address(),
            private_key: wallet.private_key_hex(),
            created_at: format_timestamp(Utc::now()),
        }
    }

    /// Read and check that the stored address matches the key.
    pub fn load(path: &Path) -> MandateResult<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(signer_error(format!(
                    "no wallet at {} (run `wachai wallet create` or set {})",
                    path.display(),
                    PRIVATE_KEY_ENV
                )))
            }
            Err(e) => return Err(signer_error(format!("failed to read wallet: {}", e))),
        };
        let file: Self = serde_json::from_str(&raw)
            .map_err(|e| signer_error(format!("corrupt wallet {}: {}", path.display(), e)))?;

        let wallet = LocalWallet::from_private_key_hex(&file.private_key)?;
        if !same_address(&wallet.address(), &file.address) {
            return Err(signer_error(format!(
                "wallet {} address {} does not match its key ({})",
                path.display(),
                file.address,
                wallet.address()
            )));
        }
        Ok(file)
    }

    pub fn wallet(&self) -> MandateResult<LocalWallet> {
        LocalWallet::from_private_key_hex(&self.private_key)
    }

    /// Write with owner-only permissions. Refuses to replace an existing
    /// wallet unless `overwrite` is set.
    pub fn save(&self, path: &Path, overwrite: bool) -> MandateResult<()> {
        if path.exists() && !overwrite {
            return Err(MandateError::invalid_input(format!(
                "wallet already exists at {} (use --force to replace it)",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&temp_path, path)?;

        debug!(address = %self.address, path = %path.display(), "wallet saved");
        Ok(())
    }
}

/// Generate a key and store it at `path`.
pub fn create_wallet(path: &Path, overwrite: bool) -> MandateResult<WalletFile> {
    let file = WalletFile::from_wallet(&LocalWallet::random());
    file.save(path, overwrite)?;
    Ok(file)
}

/// Store an existing hex key at `path`.
pub fn import_wallet(path: &Path, private_key: &str, overwrite: bool) -> MandateResult<WalletFile> {
    let file = WalletFile::from_wallet(&LocalWallet::from_private_key_hex(private_key)?);
    file.save(path, overwrite)?;
    Ok(file)
}

/// Signer from `WACHAI_PRIVATE_KEY`, falling back to the wallet file.
pub fn resolve_signer(config: &StorageConfig) -> MandateResult<LocalWallet> {
    let from_env = std::env::var(PRIVATE_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty());
    resolve_signer_with(from_env.as_deref(), config)
}

pub fn resolve_signer_with(
    private_key: Option<&str>,
    config: &StorageConfig,
) -> MandateResult<LocalWallet> {
    if let Some(key) = private_key {
        debug!("using signer from {}", PRIVATE_KEY_ENV);
        return LocalWallet::from_private_key_hex(key);
    }
    WalletFile::load(&config.wallet_path())?.wallet()
}

fn signer_error(message: String) -> MandateError {
    MandateError::Signer { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_create_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/wallet.json");

        let created = create_wallet(&path, false).unwrap();
        let loaded = WalletFile::load(&path).unwrap();
        assert_eq!(loaded.address, created.address);
        assert_eq!(loaded.wallet().unwrap().address(), created.address);
        assert!(!temp.path().join("nested/wallet.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_wallet_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wallet.json");
        create_wallet(&path, false).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_refuses_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wallet.json");
        import_wallet(&path, DEV_KEY, false).unwrap();

        assert!(matches!(
            create_wallet(&path, false),
            Err(MandateError::InvalidInput { .. })
        ));
        assert_eq!(WalletFile::load(&path).unwrap().address, DEV_ADDRESS);

        let replaced = create_wallet(&path, true).unwrap();
        assert_ne!(replaced.address, DEV_ADDRESS);
    }

    #[test]
    fn test_load_detects_tampered_address() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wallet.json");
        let mut file = import_wallet(&path, DEV_KEY, false).unwrap();
        file.address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string();
        file.save(&path, true).unwrap();

        let err = WalletFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_missing_wallet_mentions_env_var() {
        let temp = TempDir::new().unwrap();
        let err = WalletFile::load(&temp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, MandateError::Signer { .. }));
        assert!(err.to_string().contains(PRIVATE_KEY_ENV));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let file = WalletFile::from_wallet(&LocalWallet::from_private_key_hex(DEV_KEY).unwrap());
        assert!(!format!("{:?}", file).contains("ac0974"));
    }

    #[test]
    #[serial]
    fn test_env_key_takes_precedence() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::with_root(temp.path());
        create_wallet(&config.wallet_path(), false).unwrap();

        std::env::set_var(PRIVATE_KEY_ENV, DEV_KEY);
        let signer = resolve_signer(&config);
        std::env::remove_var(PRIVATE_KEY_ENV);

        assert_eq!(signer.unwrap().address(), DEV_ADDRESS);
    }

    #[test]
    #[serial]
    fn test_falls_back_to_wallet_file() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::with_root(temp.path());
        std::env::remove_var(PRIVATE_KEY_ENV);

        assert!(resolve_signer(&config).is_err());
        import_wallet(&config.wallet_path(), DEV_KEY, false).unwrap();
        assert_eq!(resolve_signer(&config).unwrap().address(), DEV_ADDRESS);
    }
}
