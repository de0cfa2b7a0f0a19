//! One-time code generation.

use rand::Rng;

/// Generate a fixed-width 6-digit code; leading zeros are kept.
#[must_use]
pub fn generate() -> String {
    generate_with(&mut rand::thread_rng())
}

pub(crate) fn generate_with<R: Rng>(rng: &mut R) -> String {
    format!("{:06}", rng.gen_range(0..1_000_000))
}
