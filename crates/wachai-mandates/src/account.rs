//! EVM addresses and CAIP-10 account identifiers.
//!
//! Parties are recorded as `eip155:<chainId>:<address>` with the address in
//! EIP-55 checksum form. Address comparison is case-insensitive.

use std::fmt;
use std::str::FromStr;

use sha3::{Digest, Keccak256};

use crate::error::{MandateError, MandateResult};

const CAIP10_NAMESPACE: &str = "eip155";

/// Keccak-256 of `data`.
pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Validate an EVM address and return it in checksum form.
///
/// Accepts all-lowercase, all-uppercase or correctly checksummed input;
/// mixed case with a bad checksum is rejected.
pub fn checksum_address(address: &str) -> MandateResult<String> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| invalid_address(address))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid_address(address));
    }

    let checksummed = to_checksum(&hex_part.to_ascii_lowercase());
    let is_mixed = hex_part.chars().any(|c| c.is_ascii_lowercase())
        && hex_part.chars().any(|c| c.is_ascii_uppercase());
    if is_mixed && checksummed[2..] != *hex_part {
        return Err(MandateError::invalid_input(format!(
            "bad address checksum: {}",
            address
        )));
    }
    Ok(checksummed)
}

/// Whether `address` is a usable EVM address.
pub fn is_address(address: &str) -> bool {
    checksum_address(address).is_ok()
}

/// EIP-55 checksum of a lowercase 40-char hex address body.
pub(crate) fn to_checksum(lower_hex: &str) -> String {
    let hash = keccak256(lower_hex.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower_hex.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn invalid_address(address: &str) -> MandateError {
    MandateError::invalid_input(format!("invalid address: {}", address))
}

/// Chain-qualified account (`eip155:<chainId>:<address>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountId {
    pub chain_id: u64,
    pub address: String,
}

impl AccountId {
    pub fn new(chain_id: u64, address: &str) -> MandateResult<Self> {
        Ok(Self {
            chain_id,
            address: checksum_address(address)?,
        })
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", CAIP10_NAMESPACE, self.chain_id, self.address)
    }
}

impl FromStr for AccountId {
    type Err = MandateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (namespace, chain, address) = match (parts.next(), parts.next(), parts.next()) {
            (Some(n), Some(c), Some(a)) => (n, c, a),
            _ => {
                return Err(MandateError::invalid_input(format!(
                    "not a CAIP-10 account id: {}",
                    s
                )))
            }
        };
        if namespace != CAIP10_NAMESPACE {
            return Err(MandateError::invalid_input(format!(
                "unsupported chain namespace: {}",
                namespace
            )));
        }
        let chain_id = chain.parse::<u64>().map_err(|_| {
            MandateError::invalid_input(format!("invalid chain id in account id: {}", s))
        })?;
        Self::new(chain_id, address)
    }
}
