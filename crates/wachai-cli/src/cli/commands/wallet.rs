//! `wachai wallet` - create, import and inspect the local wallet file.

use anyhow::Context;
use clap::{Args, Subcommand};
use serde_json::json;
use wachai_mandates::{create_wallet, import_wallet, WalletFile};

use super::print_json;
use crate::cli::args::GlobalArgs;
use crate::exit_codes::SUCCESS;

#[derive(Subcommand, Debug)]
pub enum WalletCmd {
    /// Generate a key and store it in the wallet file (mode 0600)
    Create(CreateArgs),

    /// Store an existing hex private key in the wallet file
    Import(ImportArgs),

    /// Print the wallet address and location
    Show,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Replace an existing wallet
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Private key as 0x-prefixed hex
    pub private_key: String,

    /// Replace an existing wallet
    #[arg(long, short)]
    pub force: bool,
}

pub fn run(cmd: WalletCmd, global: &GlobalArgs) -> anyhow::Result<i32> {
    let storage = global.storage()?;
    let path = storage.wallet_path();

    let file = match cmd {
        WalletCmd::Create(args) => create_wallet(&path, args.force)?,
        WalletCmd::Import(args) => import_wallet(&path, &args.private_key, args.force)?,
        WalletCmd::Show => WalletFile::load(&path)
            .with_context(|| format!("failed to load wallet {}", path.display()))?,
    };

    print_json(&json!({
        "address": file.address,
        "path": path.display().to_string(),
        "createdAt": file.created_at,
    }))?;
    Ok(SUCCESS)
}
