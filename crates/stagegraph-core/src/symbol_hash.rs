//! Deterministic hash-based identity for declarations and their members.
//!
//! [`SymbolHash`] identifies a type, a field or a method by hashing its owner,
//! its simple name and (for methods) its parameter types. Members keep their
//! hash when they are moved between declarations during merging, so every
//! registry map keyed by `SymbolHash` stays valid across the whole run.
//!
//! # Examples
//!
//! ```
//! use stagegraph_core::SymbolHash;
//!
//! let a = SymbolHash::from_field("Part1", "a");
//! assert_eq!(a, SymbolHash::from_field("Part1", "a"));
//! assert_ne!(a, SymbolHash::from_field("Part2", "a"));
//!
//! let int = SymbolHash::from_type("int");
//! let long = SymbolHash::from_type("long");
//! let m1 = SymbolHash::from_method("Part1", "initFoo", &[int]);
//! let m2 = SymbolHash::from_method("Part1", "initFoo", &[long]);
//! assert_ne!(m1, m2);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant for chained components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for field hashes.
    pub const FIELD: u64 = 0x1a095090689d4647;

    /// Domain marker for method hashes.
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Parameter position mixing constants.
    /// Each parameter position gets a unique constant so parameter order matters.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A deterministic 64-bit identity of a type, field or method.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct SymbolHash(pub u64);

impl SymbolHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: SymbolHash = SymbolHash(0);

    /// Hash of a rendered type name (including type arguments).
    #[inline]
    pub fn from_type(name: &str) -> Self {
        SymbolHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a field, identified by its declaring type and simple name.
    #[inline]
    pub fn from_field(owner: &str, name: &str) -> Self {
        let owner_hash = xxh64(owner.as_bytes(), 0);
        let name_hash = xxh64(name.as_bytes(), 0);
        SymbolHash(
            (hash_constants::FIELD ^ owner_hash)
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(name_hash),
        )
    }

    /// Hash of a method, identified by its declaring type, simple name and
    /// parameter type hashes. Parameter order matters.
    #[inline]
    pub fn from_method(owner: &str, name: &str, param_hashes: &[SymbolHash]) -> Self {
        let owner_hash = xxh64(owner.as_bytes(), 0);
        let name_hash = xxh64(name.as_bytes(), 0);
        let hash = (hash_constants::METHOD ^ owner_hash)
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(name_hash);
        SymbolHash(mix_params(hash, param_hashes))
    }

    /// Hash of a parameter list alone, independent of owner and name.
    #[inline]
    pub fn from_signature(param_hashes: &[SymbolHash]) -> Self {
        SymbolHash(mix_params(hash_constants::METHOD, param_hashes))
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn mix_params(mut hash: u64, param_hashes: &[SymbolHash]) -> u64 {
    for (i, param) in param_hashes.iter().enumerate() {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        // wrapping_mul keeps the mix order-sensitive
        hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ param.0);
    }
    hash
}

impl fmt::Debug for SymbolHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolHash({:#018x})", self.0)
    }
}

impl fmt::Display for SymbolHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_hash_depends_on_owner_and_name() {
        let a = SymbolHash::from_field("A", "x");
        assert_eq!(a, SymbolHash::from_field("A", "x"));
        assert_ne!(a, SymbolHash::from_field("B", "x"));
        assert_ne!(a, SymbolHash::from_field("A", "y"));
    }

    #[test]
    fn owner_and_name_do_not_alias() {
        // "Ab" + "c" must not collide with "A" + "bc"
        assert_ne!(
            SymbolHash::from_field("Ab", "c"),
            SymbolHash::from_field("A", "bc")
        );
    }

    #[test]
    fn method_hash_parameter_order_matters() {
        let int = SymbolHash::from_type("int");
        let long = SymbolHash::from_type("long");
        let m1 = SymbolHash::from_method("A", "m", &[int, long]);
        let m2 = SymbolHash::from_method("A", "m", &[long, int]);
        assert_ne!(m1, m2);
    }

    #[test]
    fn field_and_method_domains_differ() {
        assert_ne!(
            SymbolHash::from_field("A", "x"),
            SymbolHash::from_method("A", "x", &[])
        );
    }

    #[test]
    fn signature_hash_ignores_owner() {
        let int = SymbolHash::from_type("int");
        assert_eq!(
            SymbolHash::from_signature(&[int]),
            SymbolHash::from_signature(&[int])
        );
        assert_ne!(
            SymbolHash::from_signature(&[int]),
            SymbolHash::from_signature(&[])
        );
    }

    #[test]
    fn empty_hash() {
        assert!(SymbolHash::EMPTY.is_empty());
        assert!(!SymbolHash::from_type("int").is_empty());
    }
}
