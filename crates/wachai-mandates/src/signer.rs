//! EIP-191 signing capability.
//!
//! Crypto boundary only: message hashing, signing and signer recovery.
//! No mandate state decisions are made here.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::account::{keccak256, to_checksum};
use crate::error::{MandateError, MandateResult};
use crate::mandate::ALG_EIP191;

/// Signing party. Adapters for hardware wallets or remote signers implement
/// this; the mandate core only needs these two operations.
pub trait Signer: Send + Sync {
    /// Checksummed address of the key.
    fn address(&self) -> String;

    /// EIP-191 personal-message signature (65 bytes, `r || s || v`).
    fn sign_message(&self, message: &[u8]) -> MandateResult<Vec<u8>>;

    fn algorithm(&self) -> &'static str {
        ALG_EIP191
    }
}

/// `keccak256("\x19Ethereum Signed Message:\n" || len || message)`.
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(message.len() + 32);
    data.extend_from_slice(b"\x19Ethereum Signed Message:\n");
    data.extend_from_slice(message.len().to_string().as_bytes());
    data.extend_from_slice(message);
    keccak256(&data)
}

/// Recover the checksummed signer address from an EIP-191 signature.
pub fn recover_address(message: &[u8], signature: &[u8]) -> MandateResult<String> {
    if signature.len() != 65 {
        return Err(signer_error(format!(
            "signature must be 65 bytes, got {}",
            signature.len()
        )));
    }
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| signer_error(format!("malformed signature: {}", e)))?;
    let v = match signature[64] {
        27 | 28 => signature[64] - 27,
        0 | 1 => signature[64],
        other => return Err(signer_error(format!("invalid recovery byte: {}", other))),
    };
    let recovery_id =
        RecoveryId::from_byte(v).ok_or_else(|| signer_error("invalid recovery id".to_string()))?;

    let hash = eip191_hash(message);
    let key = VerifyingKey::recover_from_prehash(&hash, &sig, recovery_id)
        .map_err(|e| signer_error(format!("recovery failed: {}", e)))?;
    Ok(address_of(&key))
}

/// Checksummed address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.as_affine().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    to_checksum(&hex::encode(&hash[12..]))
}

/// In-process secp256k1 key.
#[derive(Clone)]
pub struct LocalWallet {
    key: SigningKey,
    address: String,
}

impl LocalWallet {
    /// Generate a fresh random key.
    pub fn random() -> Self {
        Self::from_key(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Load from a hex private key (with or without `0x`).
    pub fn from_private_key_hex(private_key: &str) -> MandateResult<Self> {
        let trimmed = private_key.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(hex_part)
            .map_err(|e| signer_error(format!("private key is not hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(signer_error(format!(
                "private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(&bytes)
            .map_err(|e| signer_error(format!("invalid private key: {}", e)))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    /// 0x-prefixed hex private key.
    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.key.to_bytes()))
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Signer for LocalWallet {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn sign_message(&self, message: &[u8]) -> MandateResult<Vec<u8>> {
        let hash = eip191_hash(message);
        let (mut sig, mut recovery_id) = self
            .key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| signer_error(format!("signing failed: {}", e)))?;

        // Low-s form; flipping s flips the parity of R's y coordinate.
        if let Some(normalized) = sig.normalize_s() {
            sig = normalized;
            recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
        }

        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&sig.to_bytes());
        out.push(recovery_id.to_byte() + 27);
        Ok(out)
    }
}

fn signer_error(message: String) -> MandateError {
    MandateError::Signer { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (first Hardhat/Anvil account).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn test_address_from_known_key() {
        let wallet = LocalWallet::from_private_key_hex(DEV_KEY).unwrap();
        assert_eq!(wallet.address(), DEV_ADDRESS);
        assert_eq!(wallet.private_key_hex(), DEV_KEY);
    }

    #[test]
    fn test_sign_then_recover() {
        let wallet = LocalWallet::random();
        let sig = wallet.sign_message(b"hello mandate").unwrap();
        assert_eq!(sig.len(), 65);
        assert!(sig[64] == 27 || sig[64] == 28);
        assert_eq!(
            recover_address(b"hello mandate", &sig).unwrap(),
            wallet.address()
        );
    }

    #[test]
    fn test_recover_other_message_gives_other_address() {
        let wallet = LocalWallet::random();
        let sig = wallet.sign_message(b"original").unwrap();
        let recovered = recover_address(b"tampered", &sig);
        assert!(recovered.map(|a| a != wallet.address()).unwrap_or(true));
    }

    #[test]
    fn test_recover_rejects_bad_length() {
        assert!(recover_address(b"x", &[0u8; 64]).is_err());
    }

    #[test]
    fn test_rejects_short_private_key() {
        assert!(LocalWallet::from_private_key_hex("0x1234").is_err());
        assert!(LocalWallet::from_private_key_hex("not-hex").is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let wallet = LocalWallet::from_private_key_hex(DEV_KEY).unwrap();
        let rendered = format!("{:?}", wallet);
        assert!(rendered.contains(DEV_ADDRESS));
        assert!(!rendered.contains("ac0974"));
    }
}
