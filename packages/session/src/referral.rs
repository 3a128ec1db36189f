//! Referral codes.
//!
//! A code is `<prefix>-` followed by the first eight hex digits of a random
//! v4 UUID, e.g. `herichain-1a2b3c4d`.

use uuid::Uuid;

const SUFFIX_LEN: usize = 8;

/// Generate a fresh referral code.
pub fn generate_referral_code(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..SUFFIX_LEN])
}

/// Whether `code` has the shape of a generated code for `prefix`.
pub fn is_generated_code(code: &str, prefix: &str) -> bool {
    code.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|suffix| {
            suffix.len() == SUFFIX_LEN
                && suffix
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
}
