//! Signed mandates between two parties.
//!
//! A mandate is a JSON agreement between a server (offerer) and a client
//! (acceptor). This crate provides:
//!
//! - Registry client that resolves primitive kinds to payload schemas and
//!   validates payloads, with per-instance caches
//! - Mandate builder with autofill of well-known payload fields
//! - EIP-191 signing and verification over RFC 8785 canonical JSON
//! - Envelope protocol and exchange sessions over pluggable transports
//! - File-backed mandate store and wallet
//!
//! # Quick Start
//!
//! ```no_run
//! use wachai_mandates::{
//!     sign_as_server, BuildMode, LocalWallet, MandateBuilder, MandateRequest, SchemaRegistry,
//!     Signer,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = SchemaRegistry::from_env()?;
//! let base_url = registry.default_base_url().to_string();
//! let builder = MandateBuilder::new(registry);
//!
//! let server = LocalWallet::random();
//! let request = MandateRequest::new(
//!     "swap@1",
//!     serde_json::json!({"tokenIn": "0x...", "tokenOut": "0x...", "amountIn": "100", "minOut": "99"}),
//!     1,
//!     &server.address(),
//!     "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
//! )?;
//! let mut built = builder.build(request, &BuildMode::Registry { base_url }).await?;
//! sign_as_server(&mut built.record, &server)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `WACHAI_REGISTRY_URL` | Registry base URL (default: the public mandate-specs repository) |
//! | `WACHAI_REGISTRY_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `WACHAI_STORAGE_DIR` | Storage root (default: `~/.wachai`) |
//! | `WACHAI_WALLET_PATH` | Wallet file (default: `<storage>/wallet.json`) |
//! | `WACHAI_SPOOL_DIR` | Exchange spool directory (default: `<storage>/spool`) |
//! | `WACHAI_PRIVATE_KEY` | Hex private key; takes precedence over the wallet file |

pub mod account;
pub mod builder;
pub mod canonicalize;
pub mod config;
pub mod envelope;
pub mod error;
pub mod exchange;
pub mod mandate;
pub mod registry;
pub mod signer;
pub mod signing;
pub mod store;
pub mod transport;
pub mod wallet;

// Re-export main types
pub use account::{checksum_address, is_address, AccountId};
pub use builder::{
    autofill, derive_intent, AutofillContext, AutofilledField, BuildMode, BuiltMandate,
    MandateBuilder, MandateRequest,
};
pub use canonicalize::{canonical_signing_bytes, to_canonical_jcs_bytes};
pub use config::{StorageConfig, DEFAULT_CHAIN_ID, DEFAULT_DEADLINE_SECS};
pub use envelope::{EnvelopeAction, MandateEnvelope, ENVELOPE_TYPE, ENVELOPE_VERSION};
pub use error::{MandateError, MandateResult};
pub use exchange::{ExchangeSession, ReceiveOutcome, ReceivedMandate, SendReceipt};
pub use mandate::{
    MandateCore, MandateRecord, SignatureArtifact, SignatureState, Signatures, SignerRole,
    ALG_EIP191, MANDATE_RECORD_VERSION,
};
pub use registry::{
    PrimitiveDescriptor, PrimitiveSchema, RegistryConfig, RegistryIndex, SchemaRegistry,
    DEFAULT_REGISTRY_BASE_URL,
};
pub use signer::{recover_address, LocalWallet, Signer};
pub use signing::{
    sign_as_client, sign_as_server, state_of, verify, PartyVerification, VerifyReport,
};
pub use store::{FileStore, MandateStore, MemoryStore};
pub use transport::{InboundMessage, MemoryNetwork, MemoryTransport, SpoolTransport, Transport};
pub use wallet::{create_wallet, import_wallet, resolve_signer, WalletFile};
