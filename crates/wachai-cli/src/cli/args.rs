use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use wachai_mandates::StorageConfig;

use super::commands::{create, exchange, sign, verify, wallet};

#[derive(Parser)]
#[command(
    name = "wachai",
    version,
    about = "WachAI mandates: signed, verifiable agreements between a server and a client",
    long_about = "WachAI mandates: signed, verifiable agreements between a server and a client.\n\
\n\
  • The server creates the mandate (offer) and signs first\n\
  • The client signs second (accept)\n\
\n\
Mandates are stored locally so they can be signed, verified and exchanged by id."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate an EVM private key (save it as WACHAI_PRIVATE_KEY)
    GenerateKey,
    /// Manage the local wallet file
    Wallet(WalletArgs),
    /// Create and server-sign a mandate; stores it locally
    CreateMandate(create::CreateMandateArgs),
    /// Sign a stored mandate as the client
    Sign(sign::SignArgs),
    /// Verify both signatures of a stored mandate
    Verify(verify::VerifyArgs),
    /// Send and receive mandates through the spool directory
    Exchange(ExchangeArgs),
}

#[derive(Parser, Debug)]
pub struct WalletArgs {
    #[command(subcommand)]
    pub cmd: wallet::WalletCmd,
}

#[derive(Parser, Debug)]
pub struct ExchangeArgs {
    #[command(subcommand)]
    pub cmd: exchange::ExchangeCmd,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Storage root for mandates and the wallet (default: ~/.wachai)
    #[arg(long, global = true, env = "WACHAI_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Wallet file (default: <storage>/wallet.json)
    #[arg(long, global = true, env = "WACHAI_WALLET_PATH")]
    pub wallet_path: Option<PathBuf>,

    /// Spool directory shared with peers (default: <storage>/spool)
    #[arg(long, global = true, env = "WACHAI_SPOOL_DIR")]
    pub spool_dir: Option<PathBuf>,
}

impl GlobalArgs {
    /// Flags win over the environment, which wins over defaults.
    pub fn storage(&self) -> anyhow::Result<StorageConfig> {
        let mut config = match &self.storage_dir {
            Some(dir) => StorageConfig::with_root(dir),
            None => StorageConfig::from_env()?,
        };
        if let Some(path) = &self.wallet_path {
            config = config.with_wallet_path(path);
        }
        if let Some(path) = &self.spool_dir {
            config = config.with_spool_dir(path);
        }
        Ok(config)
    }
}
