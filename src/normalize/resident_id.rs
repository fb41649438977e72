//! Resident registration number handling.
//!
//! A full identifier is 13 digits: a 6-digit birth-date prefix followed by a
//! 7-digit suffix. Values that are not plain digit strings of at most 13
//! characters are assumed to be encrypted or tokenized already and are never
//! split.

pub const PREFIX_LEN: usize = 6;
pub const SUFFIX_LEN: usize = 7;
pub const FULL_LEN: usize = PREFIX_LEN + SUFFIX_LEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResidentIdSplit {
    Full { prefix: String, suffix: String },
    PrefixOnly(String),
    /// Encrypted or tokenized value: must be stored as-is.
    Opaque,
    /// 7 to 12 digits: cannot tell where the prefix ends.
    Ambiguous,
}

pub fn split_resident_id(raw: &str) -> ResidentIdSplit {
    if raw.len() > FULL_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return ResidentIdSplit::Opaque;
    }
    match raw.len() {
        FULL_LEN => ResidentIdSplit::Full {
            prefix: raw[..PREFIX_LEN].to_string(),
            suffix: raw[PREFIX_LEN..].to_string(),
        },
        len if len <= PREFIX_LEN => ResidentIdSplit::PrefixOnly(raw.to_string()),
        _ => ResidentIdSplit::Ambiguous,
    }
}

pub fn join_resident_id(prefix: &str, suffix: &str) -> String {
    format!("{}{}", prefix, suffix)
}
