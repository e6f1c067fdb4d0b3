//! AXI4 channel payloads.
//!
//! A channel's `valid` is modelled as `Option`: `Some(payload)` means the
//! sender is presenting that payload this cycle. Ready lines are plain
//! `bool`s. A transfer happens on a cycle where both are asserted.

/// Two-bit response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resp {
    #[default]
    Okay,
    ExOkay,
    SlvErr,
    DecErr,
}

impl Resp {
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Okay => 0b00,
            Self::ExOkay => 0b01,
            Self::SlvErr => 0b10,
            Self::DecErr => 0b11,
        }
    }

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Okay,
            0b01 => Self::ExOkay,
            0b10 => Self::SlvErr,
            _ => Self::DecErr,
        }
    }

    /// The top bit marks slave and decode errors.
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.bits() & 0b10 != 0
    }

    /// The more severe of two responses.
    #[must_use]
    pub fn worst(self, other: Self) -> Self {
        if other.bits() > self.bits() { other } else { self }
    }
}

/// AxBURST encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BurstKind {
    Fixed,
    #[default]
    Incr,
    Wrap,
}

/// Write- or read-address channel payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddrBeat {
    pub id: u8,
    pub addr: u32,
    /// AxLEN: beats minus one.
    pub len: u8,
    /// AxSIZE: log2 of bytes per beat.
    pub size: u8,
    pub burst: BurstKind,
}

impl AddrBeat {
    /// Incrementing burst of `beats` full-width beats.
    ///
    /// # Panics
    ///
    /// Panics if `beats` is outside `1..=256`.
    #[must_use]
    pub fn incr(addr: u32, beats: u32, bus_bytes: u32) -> Self {
        assert!((1..=256).contains(&beats), "AXI burst of {beats} beats");
        Self {
            id: 0,
            addr,
            len: (beats - 1) as u8,
            size: bus_bytes.trailing_zeros() as u8,
            burst: BurstKind::Incr,
        }
    }

    #[must_use]
    pub fn beats(&self) -> u32 {
        u32::from(self.len) + 1
    }

    #[must_use]
    pub fn bytes_per_beat(&self) -> u32 {
        1 << self.size
    }

    #[must_use]
    pub fn bytes(&self) -> u32 {
        self.beats() * self.bytes_per_beat()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteBeat {
    pub data: u64,
    /// One bit per byte lane.
    pub strb: u8,
    pub last: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteResp {
    pub id: u8,
    pub resp: Resp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadBeat {
    pub id: u8,
    pub data: u64,
    pub resp: Resp,
    pub last: bool,
}

/// Master-driven half of a write port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteMaster {
    pub aw: Option<AddrBeat>,
    pub w: Option<WriteBeat>,
    pub bready: bool,
}

/// Slave-driven half of a write port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteSlave {
    pub awready: bool,
    pub wready: bool,
    pub b: Option<WriteResp>,
}

/// Master-driven half of a read port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadMaster {
    pub ar: Option<AddrBeat>,
    pub rready: bool,
}

/// Slave-driven half of a read port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadSlave {
    pub arready: bool,
    pub r: Option<ReadBeat>,
}
