use std::hash::{BuildHasher, BuildHasherDefault, Hash};

/// Unseeded `ahash` builder, every instance hashes a value to the same key
pub type AHasherDefaultBuilder = BuildHasherDefault<ahash::AHasher>;
/// Randomly seeded `ahash` builder, keys are only comparable within one builder
pub type AHasherBuilder = ahash::RandomState;

/// Unseeded `SipHasher13` builder
#[cfg(feature = "siphash")]
pub type SipHasher13DefaultBuilder = BuildHasherDefault<siphasher::sip::SipHasher13>;

/// Reduces a value to the 64 bit key the layered sketches operate on, using
/// [`AHasherDefaultBuilder`].
#[inline]
#[must_use]
pub fn hash_key<V: Hash + ?Sized>(value: &V) -> u64 {
    hash_key_with(&AHasherDefaultBuilder::default(), value)
}

/// Reduces a value to a 64 bit key with the given hasher builder.
#[inline]
#[must_use]
pub fn hash_key_with<B: BuildHasher, V: Hash + ?Sized>(builder: &B, value: &V) -> u64 {
    builder.hash_one(value)
}
