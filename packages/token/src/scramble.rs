//! HTCondor password scrambling
//!
//! HTCondor stores pool passwords XOR-ed with a repeating `DE AD BE EF`
//! pattern. The transform is its own inverse and hides nothing; it exists
//! only so secrets written by HTCondor can be read back.

use zeroize::Zeroizing;

/// Repeating XOR pattern, indexed by byte position modulo 4
pub const SCRAMBLE_PATTERN: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

/// Undo HTCondor's scramble
#[must_use]
pub fn descramble(input: &[u8]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(
        input
            .iter()
            .zip(SCRAMBLE_PATTERN.iter().cycle())
            .map(|(byte, mask)| byte ^ mask)
            .collect(),
    )
}

/// Apply HTCondor's scramble; identical to [`descramble`]
#[must_use]
pub fn scramble(input: &[u8]) -> Zeroizing<Vec<u8>> {
    descramble(input)
}
