//! Binary-reflected Gray code.
//!
//! Successive Gray codes differ in exactly one bit, so a counter crossing
//! into another clock domain can only be sampled as its old or new value.

/// Binary to Gray code.
#[must_use]
pub const fn bin_to_gray(bin: u32) -> u32 {
    bin ^ (bin >> 1)
}

/// Gray code to binary.
#[must_use]
pub const fn gray_to_bin(gray: u32) -> u32 {
    let mut bin = gray;
    let mut shift = 1;
    while shift < u32::BITS {
        bin ^= bin >> shift;
        shift <<= 1;
    }
    bin
}
