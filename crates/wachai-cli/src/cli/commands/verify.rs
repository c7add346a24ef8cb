//! `wachai verify` - check both signatures of a stored mandate.
//!
//! Prints the per-party report; exits 1 unless both parties verify.

use clap::Args;

use super::{load_mandate, mandate_store, print_json};
use crate::cli::args::GlobalArgs;
use crate::exit_codes::{FAILURE, SUCCESS};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Mandate id
    pub mandate_id: String,
}

pub async fn run(args: VerifyArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let storage = global.storage()?;
    let record = load_mandate(&mandate_store(&storage), &args.mandate_id).await?;

    let report = wachai_mandates::verify(&record);
    print_json(&serde_json::to_value(&report)?)?;

    Ok(if report.all_ok() { SUCCESS } else { FAILURE })
}
