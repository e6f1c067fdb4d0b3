//! Master clock and derived clock domains.

/// A count of master clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

/// Master clock configuration for a design.
///
/// The master clock is the fastest clock in the simulation. Every domain
/// ticks on a whole-number division of it, so domain edges line up with
/// master ticks and the relative phase of two domains is fully
/// deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Master frequency in Hz (e.g. `100_000_000` for a 100 MHz fabric).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Frequency of a domain running on this master clock.
    #[must_use]
    pub const fn domain_hz(&self, domain: ClockDomain) -> u64 {
        self.frequency_hz / domain.divisor
    }

    /// Master ticks covering `millis` milliseconds.
    #[must_use]
    pub const fn ticks_for_millis(&self, millis: u64) -> Ticks {
        Ticks::new(self.frequency_hz / 1000 * millis)
    }
}

/// A clock domain derived from the master clock.
///
/// The domain has a rising edge on every master tick `t` where
/// `t % divisor == phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockDomain {
    divisor: u64,
    phase: u64,
}

impl ClockDomain {
    /// Create a domain ticking once every `divisor` master ticks.
    ///
    /// # Panics
    ///
    /// Panics if `divisor` is zero or `phase >= divisor`.
    #[must_use]
    pub const fn new(divisor: u64, phase: u64) -> Self {
        assert!(divisor > 0, "clock divisor must be non-zero");
        assert!(phase < divisor, "clock phase must be below the divisor");
        Self { divisor, phase }
    }

    #[must_use]
    pub const fn divisor(self) -> u64 {
        self.divisor
    }

    /// True if this domain has a rising edge on master tick `tick`.
    #[must_use]
    pub const fn is_edge(self, tick: u64) -> bool {
        tick % self.divisor == self.phase
    }

    /// Number of domain edges in the master tick range `[0, ticks)`.
    #[must_use]
    pub const fn edges_in(self, ticks: Ticks) -> u64 {
        let t = ticks.get();
        if t <= self.phase {
            0
        } else {
            (t - self.phase - 1) / self.divisor + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divided_domain_edges() {
        let pclk = ClockDomain::new(4, 1);
        let edges: Vec<u64> = (0..12).filter(|&t| pclk.is_edge(t)).collect();
        assert_eq!(edges, vec![1, 5, 9]);
        assert_eq!(pclk.edges_in(Ticks::new(12)), 3);
        assert_eq!(pclk.edges_in(Ticks::ZERO), 0);
        assert_eq!(pclk.edges_in(Ticks::new(1)), 0);
        assert_eq!(pclk.edges_in(Ticks::new(2)), 1);
    }

    #[test]
    fn undivided_domain_ticks_every_master_tick() {
        let mclk = ClockDomain::new(1, 0);
        assert!((0..16).all(|t| mclk.is_edge(t)));
        assert_eq!(mclk.edges_in(Ticks::new(16)), 16);
    }

    #[test]
    fn domain_frequency() {
        let master = MasterClock::new(100_000_000);
        assert_eq!(master.domain_hz(ClockDomain::new(4, 0)), 25_000_000);
        assert_eq!(master.ticks_for_millis(2), Ticks::new(200_000));
    }
}
