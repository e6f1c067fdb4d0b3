//! RGB565 pixel word.

/// One RGB565 pixel: red in bits 15-11, green in 10-5, blue in 4-0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    /// Pack components. Each is masked to its field width.
    #[must_use]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self((((r & 0x1F) as u16) << 11) | (((g & 0x3F) as u16) << 5) | ((b & 0x1F) as u16))
    }

    /// Assemble from the two bytes the sensor sends, high byte first.
    #[must_use]
    pub const fn from_bytes(high: u8, low: u8) -> Self {
        Self(((high as u16) << 8) | low as u16)
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn r(self) -> u8 {
        (self.0 >> 11) as u8
    }

    #[must_use]
    pub const fn g(self) -> u8 {
        ((self.0 >> 5) & 0x3F) as u8
    }

    #[must_use]
    pub const fn b(self) -> u8 {
        (self.0 & 0x1F) as u8
    }

    /// Expand to 8 bits per channel, replicating the top bits into the
    /// bottom so full scale maps to 0xFF.
    #[must_use]
    pub const fn to_rgb888(self) -> [u8; 3] {
        let r = self.r();
        let g = self.g();
        let b = self.b();
        [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
    }
}

impl From<u16> for Rgb565 {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl From<Rgb565> for u16 {
    fn from(p: Rgb565) -> Self {
        p.0
    }
}
