//! Exit codes for the wachai CLI.
//! These codes are part of the public contract; scripts branch on them.

use wachai_mandates::MandateError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1; // Bad input, unknown kind, invalid payload, verification failed
pub const ILLEGAL_TRANSITION: i32 = 3; // Already signed, out of order, expired, wrong signer
pub const NETWORK_ERROR: i32 = 5; // Registry or transport unreachable
pub const LOCAL_ERROR: i32 = 6; // Storage, wallet or serialization failure

/// Map a command error to its exit code. Errors that did not originate in
/// the mandates library are treated as bad input.
pub fn from_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<MandateError>() {
        Some(e) => e.exit_code(),
        None => FAILURE,
    }
}
