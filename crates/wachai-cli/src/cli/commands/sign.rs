//! `wachai sign` - countersign a stored mandate as the client.

use clap::Args;
use wachai_mandates::{resolve_signer, sign_as_client, MandateStore};

use super::{load_mandate, mandate_store};
use crate::cli::args::GlobalArgs;
use crate::exit_codes::SUCCESS;

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Mandate id
    pub mandate_id: String,
}

pub async fn run(args: SignArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let storage = global.storage()?;
    let signer = resolve_signer(&storage)?;
    let store = mandate_store(&storage);

    let mut record = load_mandate(&store, &args.mandate_id).await?;
    sign_as_client(&mut record, &signer)?;
    store.put(&record).await?;

    print!("{}", record.to_pretty_json()?);
    Ok(SUCCESS)
}
