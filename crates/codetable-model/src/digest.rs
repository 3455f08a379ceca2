//! Codebook snapshot digests (versioned).
//!
//! Changelog entries need a stable way to refer to the exact codebook state
//! an applied batch produced. We use a **simple, deterministic,
//! non-cryptographic** digest:
//!
//! - algorithm: **FNV-1a 64-bit**
//! - input: the serialized snapshot bytes as-written
//! - output: `"fnv1a64:<16 lowercase hex digits>"`
//!
//! This digest is **not** a security primitive; it is a stability/identity
//! tool for snapshots and changelog auditing.

/// Prefix used in serialized digests.
pub const SNAPSHOT_DIGEST_V1_PREFIX: &str = "fnv1a64:";

/// Compute the v1 snapshot digest (FNV-1a 64-bit) over arbitrary bytes.
pub fn snapshot_digest_v1(bytes: &[u8]) -> String {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x00000100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }

    format!("{SNAPSHOT_DIGEST_V1_PREFIX}{hash:016x}")
}
