use rand_core::{OsRng, RngCore};

/// Number of decimal digits in an account verification code.
pub const CODE_LENGTH: usize = 6;

const CODE_SPACE: u32 = 1_000_000;

/// Issue a zero-padded numeric verification code.
///
/// Codes are only compared against the one stored on the same user,
/// so collisions between users don't matter.
pub fn issue_code() -> String {
    let value = OsRng.next_u32() % CODE_SPACE;
    format!("{value:0width$}", width = CODE_LENGTH)
}
