use anyhow::Context;
use serde_json::Value;
use wachai_mandates::{FileStore, MandateRecord, MandateStore, StorageConfig};

use super::args::{Cli, Command};

pub mod create;
pub mod exchange;
pub mod keygen;
pub mod sign;
pub mod verify;
pub mod wallet;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let global = cli.global;
    match cli.cmd {
        Command::GenerateKey => keygen::run(),
        Command::Wallet(args) => wallet::run(args.cmd, &global),
        Command::CreateMandate(args) => create::run(args, &global).await,
        Command::Sign(args) => sign::run(args, &global).await,
        Command::Verify(args) => verify::run(args, &global).await,
        Command::Exchange(args) => exchange::run(args.cmd, &global).await,
    }
}

pub(crate) fn mandate_store(storage: &StorageConfig) -> FileStore {
    FileStore::new(storage.mandates_dir())
}

pub(crate) async fn load_mandate(
    store: &FileStore,
    mandate_id: &str,
) -> anyhow::Result<MandateRecord> {
    store
        .get(mandate_id)
        .await
        .with_context(|| format!("failed to load mandate {}", mandate_id))
}

/// Results go to stdout as pretty JSON, one document per line group.
pub(crate) fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
