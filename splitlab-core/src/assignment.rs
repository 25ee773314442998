//! Deterministic Variant Assignment
//!
//! A user's variant is a pure function of `(salt, user_id)`: the pair is hashed
//! with FNV-1a, passed through a SplitMix64 finalizer for avalanche, and the
//! top 53 bits are mapped onto `[0, 1)`. Users whose bucket falls below the
//! split ratio go to B.

use crate::config::AssignmentConfig;
use crate::model::{Assignment, UserId, Variant};
use fxhash::FxHashSet;
use tracing::debug;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Byte hashed between the salt and the user id
const SALT_SEPARATOR: u8 = 0x1f;

/// Position of a user in `[0, 1)` for the given salt
pub fn assignment_bucket(salt: &str, user_id: UserId) -> f64 {
    let mut hash = FNV_OFFSET_BASIS;
    let bytes = salt
        .bytes()
        .chain(std::iter::once(SALT_SEPARATOR))
        .chain(user_id.to_le_bytes());
    for byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    (splitmix64(hash) >> 11) as f64 / (1u64 << 53) as f64
}

fn splitmix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Variant for one user
pub fn assign_variant(salt: &str, user_id: UserId, split_ratio: f64) -> Variant {
    if assignment_bucket(salt, user_id) < split_ratio {
        Variant::B
    } else {
        Variant::A
    }
}

/// Assign every distinct user, keeping first-seen order.
///
/// An empty input yields an empty assignment set.
pub fn assign_users<I>(user_ids: I, config: &AssignmentConfig) -> Vec<Assignment>
where
    I: IntoIterator<Item = UserId>,
{
    let mut seen = FxHashSet::default();
    let assignments: Vec<Assignment> = user_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .map(|user_id| Assignment {
            user_id,
            variant: assign_variant(&config.salt, user_id, config.split_ratio),
            assigned_at: config.assignment_date,
        })
        .collect();

    debug!(
        users = assignments.len(),
        split_ratio = config.split_ratio,
        "assigned users to variants"
    );
    assignments
}
