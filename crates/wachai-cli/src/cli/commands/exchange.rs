//! `wachai exchange` - send and receive mandates through the spool.
//!
//! Every participant pointing at the same spool directory can reach every
//! other participant by address. A received mandate replaces the local copy
//! unless it would drop a signature the local copy holds.

use clap::{Args, Subcommand};
use serde_json::json;
use wachai_mandates::{
    resolve_signer, EnvelopeAction, ExchangeSession, FileStore, ReceivedMandate, Signer,
    SpoolTransport, StorageConfig,
};

use super::{load_mandate, mandate_store, print_json};
use crate::cli::args::GlobalArgs;
use crate::exit_codes::SUCCESS;

#[derive(Subcommand, Debug)]
pub enum ExchangeCmd {
    /// Send a stored mandate to a peer address
    Send(SendArgs),

    /// Receive mandates addressed to this wallet and store them
    Receive(ReceiveArgs),
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Peer EVM address
    pub peer: String,

    /// Mandate id (must exist in local storage)
    pub mandate_id: String,

    /// Envelope action: offer|accept|reject|counter (default: inferred from signatures)
    #[arg(long)]
    pub action: Option<EnvelopeAction>,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Process messages already in the inbox, then exit
    #[arg(long)]
    pub once: bool,
}

pub async fn run(cmd: ExchangeCmd, global: &GlobalArgs) -> anyhow::Result<i32> {
    let storage = global.storage()?;
    let session = open_session(&storage)?;

    match cmd {
        ExchangeCmd::Send(args) => {
            let record = load_mandate(session.store(), &args.mandate_id).await?;
            let receipt = session.send(&args.peer, &record, args.action).await?;
            print_json(&json!({
                "ok": true,
                "to": receipt.to,
                "mandateId": receipt.mandate_id,
                "action": receipt.action,
                "nonce": receipt.nonce,
            }))?;
        }
        ExchangeCmd::Receive(args) if args.once => {
            for received in session.receive_backlog().await? {
                print_received(&received);
            }
        }
        ExchangeCmd::Receive(_) => {
            eprintln!(
                "Listening for mandates in {} (Ctrl+C to stop)...",
                storage.spool_dir().display()
            );
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            let count = session.receive_stream(shutdown, print_received).await?;
            eprintln!("Stopped after receiving {} mandate(s).", count);
        }
    }
    Ok(SUCCESS)
}

fn open_session(
    storage: &StorageConfig,
) -> anyhow::Result<ExchangeSession<SpoolTransport, FileStore>> {
    let signer = resolve_signer(storage)?;
    let transport = SpoolTransport::new(storage.spool_dir(), signer.address());
    Ok(ExchangeSession::new(transport, mandate_store(storage)))
}

fn print_received(received: &ReceivedMandate) {
    let value = json!({
        "ok": true,
        "received": true,
        "from": received.from,
        "action": received.action,
        "mandateId": received.mandate_id,
        "saved": true,
    });
    if let Err(e) = print_json(&value) {
        tracing::warn!(error = %e, "failed to print received mandate");
    }
}
