//! Utility functions useful throughout the codebase.

use std::{
    cmp::Ordering,
    fmt::{Debug, Formatter},
};

use bitvec::{
    prelude::{BitVec, Lsb0},
    view::BitView,
};
use ethnum::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constant::{LIMB_SIZE_BITS, WORD_SIZE_BITS, WORD_SIZE_BYTES};

/// A type alias to make [`U256Wrapper`] easier to type internally.
pub type U256W = U256Wrapper;

/// The `U256Wrapper` is responsible for allowing the serialisation of the
/// [`U256`] type to JSON as a `0x`-prefixed big-endian hex string.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct U256Wrapper(pub U256);

impl Debug for U256Wrapper {
    /// The wrapper has absolutely no semantic meaning, so we print the
    /// underlying value for the debug representation.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for U256Wrapper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256Wrapper {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<U256> for U256Wrapper {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<&U256> for U256Wrapper {
    fn from(value: &U256) -> Self {
        Self(*value)
    }
}

impl From<U256Wrapper> for U256 {
    fn from(U256Wrapper(value): U256Wrapper) -> Self {
        value
    }
}

impl Serialize for U256Wrapper {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = String::from("0x");
        value.push_str(&hex::encode(self.0.to_be_bytes()));

        serializer.serialize_str(&value)
    }
}

impl<'de> Deserialize<'de> for U256Wrapper {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let u256 = U256::from_str_hex(&s).map_err(serde::de::Error::custom)?;
        Ok(U256Wrapper(u256))
    }
}

/// Splits `value` into its low and high 128-bit limbs, in that order.
#[must_use]
pub fn split_limbs(value: U256) -> (U256, U256) {
    let (high, low) = value.into_words();
    (U256::from(low), U256::from(high))
}

/// Joins a low and a high 128-bit limb back into a single word.
///
/// Any bits of `low` and `high` above the limb width are discarded.
#[must_use]
pub fn join_limbs(low: U256, high: U256) -> U256 {
    U256::from_words(*high.low(), *low.low())
}

/// Checks whether `value` fits in a single limb.
#[must_use]
pub fn fits_in_limb(value: U256) -> bool {
    value.leading_zeros() >= LIMB_SIZE_BITS
}

/// Interprets up to 32 `bytes` as a big-endian unsigned integer.
///
/// # Panics
///
/// If `bytes` is longer than a word. This is a programmer error.
#[must_use]
pub fn word_from_be_slice(bytes: &[u8]) -> U256 {
    assert!(
        bytes.len() <= WORD_SIZE_BYTES,
        "A word cannot be built from {} bytes",
        bytes.len()
    );
    let mut buffer = [0u8; WORD_SIZE_BYTES];
    buffer[WORD_SIZE_BYTES - bytes.len()..].copy_from_slice(bytes);
    U256::from_be_bytes(buffer)
}

/// Gets a mask with the low `bytes` bytes set, saturating at a full word.
#[must_use]
pub fn byte_mask(bytes: usize) -> U256 {
    if bytes >= WORD_SIZE_BYTES {
        U256::MAX
    } else {
        // The shift is always less than the word width here.
        #[allow(clippy::cast_possible_truncation)]
        let bits = (bytes * 8) as u32;
        (U256::ONE << bits) - U256::ONE
    }
}

/// Gets the bits of `value` in little endian ordering, so that bit `i` of the
/// result is the coefficient of `2**i`.
#[must_use]
pub fn bits_le(value: U256) -> BitVec {
    let mut bits = BitVec::with_capacity(WORD_SIZE_BITS);
    for byte in value.to_le_bytes() {
        bits.extend(byte.view_bits::<Lsb0>());
    }

    bits
}

/// Converts `value` to a `usize` if it can be represented as one.
#[must_use]
pub fn to_usize(value: U256) -> Option<usize> {
    if value > U256::from(u64::MAX) {
        return None;
    }
    usize::try_from(value.as_u64()).ok()
}

#[cfg(test)]
mod test {
    use ethnum::U256;
    use rand::random;

    use crate::utility::{
        bits_le,
        byte_mask,
        fits_in_limb,
        join_limbs,
        split_limbs,
        word_from_be_slice,
    };

    #[test]
    fn limbs_round_trip_for_random_words() {
        for _ in 0..256 {
            let value = U256::from_words(random(), random());
            let (low, high) = split_limbs(value);

            assert!(fits_in_limb(low));
            assert!(fits_in_limb(high));
            assert_eq!(low | (high << 128u32), value);
            assert_eq!(join_limbs(low, high), value);
        }
    }

    #[test]
    fn limbs_of_small_values_have_zero_high_limb() {
        let (low, high) = split_limbs(U256::from(0xdead_beefu32));
        assert_eq!(low, U256::from(0xdead_beefu32));
        assert_eq!(high, U256::ZERO);
    }

    #[test]
    fn builds_words_from_short_big_endian_slices() {
        assert_eq!(word_from_be_slice(&[0x01, 0x02]), U256::from(0x0102u32));
        assert_eq!(word_from_be_slice(&[]), U256::ZERO);
    }

    #[test]
    fn masks_saturate_at_a_word() {
        assert_eq!(byte_mask(0), U256::ZERO);
        assert_eq!(byte_mask(1), U256::from(0xffu32));
        assert_eq!(byte_mask(32), U256::MAX);
        assert_eq!(byte_mask(40), U256::MAX);
    }

    #[test]
    fn bits_start_from_the_least_significant() {
        let bits = bits_le(U256::from(0b1011u8) | (U256::ONE << 255u32));
        assert_eq!(bits.len(), 256);
        assert!(bits[0] && bits[1] && !bits[2] && bits[3]);
        assert!(bits[255]);
        assert_eq!(bits.count_ones(), 4);
    }
}
