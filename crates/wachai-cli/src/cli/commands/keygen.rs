//! `wachai generate-key` - print a fresh secp256k1 key and its address.
//!
//! Nothing is written to disk; use `wachai wallet create` for that.

use wachai_mandates::{LocalWallet, Signer};

use crate::exit_codes::SUCCESS;

pub fn run() -> anyhow::Result<i32> {
    let wallet = LocalWallet::random();
    let private_key = wallet.private_key_hex();

    println!("WACHAI_PRIVATE_KEY={}", private_key);
    println!("ADDRESS={}", wallet.address());
    println!();
    println!("Save the private key somewhere safe, then export it in your shell:");
    println!("export WACHAI_PRIVATE_KEY={}", private_key);
    Ok(SUCCESS)
}
