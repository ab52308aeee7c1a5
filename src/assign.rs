//! # Deterministic A/B assignment
//! Maps a user identifier to one of several template variants so a returning
//! user always sees the same template version. The hash is FNV-1a over the
//! identifier's UTF-8 bytes with the standard 64-bit parameters, fixed here
//! on purpose: assignment stays reproducible across process restarts and
//! crate versions, not just within one run.

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a 64-bit hash over a byte slice.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// The variant a user was mapped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub variant: String,
    /// Position of the variant in the variant list.
    pub index: usize,
    /// Test-group letter: 'A' for index 0, 'B' for 1, and so on.
    pub group: char,
}

/// Maps `user_id` to a variant. Deterministic: the same identifier and the
/// same variant-list length always yield the same variant, across runs.
///
/// Panics if `variants` is empty; use [try_assign] for a fallible version.
pub fn assign(user_id: &str, variants: &[&str]) -> Assignment {
    try_assign(user_id, variants).expect("variant list must not be empty")
}

/// Maps `user_id` to a variant, or `None` when the variant list is empty.
pub fn try_assign(user_id: &str, variants: &[&str]) -> Option<Assignment> {
    if variants.is_empty() {
        return None;
    }
    let index = (fnv1a_64(user_id.as_bytes()) % variants.len() as u64) as usize;
    Some(Assignment {
        variant: variants[index].to_string(),
        index,
        group: (b'A' + index as u8) as char,
    })
}
