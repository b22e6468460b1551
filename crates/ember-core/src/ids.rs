use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A process-unique 64-bit identifier. `0` is reserved as the invalid id.
///
/// Ids are produced by mixing a monotonically increasing counter through a
/// bijective hash, seeded once per process from a random UUID. Distinct
/// counter values always map to distinct ids, so every id handed out within
/// a process is unique.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(pub u64);

/// Identifier of an entity within a world.
pub type EntityId = Uid;

/// Identifier of a world/scene.
pub type WorldId = Uid;

static COUNTER: AtomicU64 = AtomicU64::new(0);
static SEED: OnceLock<u64> = OnceLock::new();

impl Uid {
    /// The reserved invalid id.
    pub const INVALID: Uid = Uid(0);

    /// Generate a new process-unique id. Never returns `INVALID`.
    pub fn generate() -> Self {
        let seed = *SEED.get_or_init(|| {
            let (hi, lo) = Uuid::new_v4().as_u64_pair();
            hi ^ lo
        });
        loop {
            let n = COUNTER.fetch_add(1, Ordering::Relaxed);
            let id = splitmix64(seed.wrapping_add(n));
            if id != 0 {
                return Uid(id);
            }
        }
    }

    /// Whether this id is valid (non-zero).
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl Default for Uid {
    fn default() -> Self {
        Uid::INVALID
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({:016x})", self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// SplitMix64 finalizer. Bijective on u64, so distinct inputs never collide.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// A stable numeric hash for a type, usable across the scripting boundary
/// where native type identity is unavailable.
///
/// FNV-1a over the fully qualified type name; stable across runs of the
/// same build, unlike `TypeId` hashing.
pub fn stable_type_hash<T: 'static>() -> u64 {
    fnv1a(std::any::type_name::<T>().as_bytes())
}

/// Stable numeric hash for a name, used as the type identity of
/// script-backed systems whose native type carries no distinction.
pub fn stable_name_hash(name: &str) -> u64 {
    fnv1a(name.as_bytes())
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_unique_and_valid() {
        let ids: HashSet<Uid> = (0..10_000).map(|_| Uid::generate()).collect();
        assert_eq!(ids.len(), 10_000);
        assert!(!ids.contains(&Uid::INVALID));
    }

    #[test]
    fn invalid_id_is_zero() {
        assert_eq!(Uid::INVALID.0, 0);
        assert!(!Uid::INVALID.is_valid());
        assert!(Uid::generate().is_valid());
    }

    #[test]
    fn type_hash_is_stable_and_distinct() {
        struct A;
        struct B;
        assert_eq!(stable_type_hash::<A>(), stable_type_hash::<A>());
        assert_ne!(stable_type_hash::<A>(), stable_type_hash::<B>());
        assert_ne!(stable_type_hash::<u32>(), stable_type_hash::<u64>());
    }
}
