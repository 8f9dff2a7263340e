//! Credential handling: hashing, one-time codes and account policy.

mod password;
mod policy;

use rand::Rng;

pub use password::{hash_secret, normalize_answer, verify_secret};
pub use policy::{is_allowed_email, password_problems};

/// Random 6-digit numeric code for email verification and resets.
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}
