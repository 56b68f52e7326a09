use crate::id::FluidId;
use crate::item::FluidStack;
use crate::reservoir::FluidTank;
use crate::station::Station;
use serde::{Deserialize, Serialize};

/// Fluid a tap holds.
pub const TAP_CAPACITY: u32 = 5_000;

/// A fluid source sitting on top of a station, pouring into its tank every
/// tick. An infinite tap never runs dry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tap {
    tank: FluidTank,
    rate: u32,
    infinite: Option<FluidId>,
}

impl Tap {
    /// A finite tap, initially empty.
    pub fn new(rate: u32) -> Self {
        Self {
            tank: FluidTank::new(TAP_CAPACITY),
            rate,
            infinite: None,
        }
    }

    pub fn infinite(fluid: FluidId, rate: u32) -> Self {
        Self {
            tank: FluidTank::new(TAP_CAPACITY),
            rate,
            infinite: Some(fluid),
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn is_infinite(&self) -> bool {
        self.infinite.is_some()
    }

    pub fn tank(&self) -> &FluidTank {
        &self.tank
    }

    /// Top up a finite tap. Returns the amount accepted.
    pub fn fill(&mut self, stack: &FluidStack) -> u32 {
        self.tank.fill(stack, false)
    }

    /// Offer up to `rate` units to `station`. Returns what it took.
    pub fn pour_into(&mut self, station: &mut Station) -> u32 {
        let offer = match self.infinite {
            Some(fluid) => FluidStack::new(fluid, self.rate),
            None => match self.tank.contents() {
                Some(c) => FluidStack::new(c.fluid, c.amount.min(self.rate)),
                None => return 0,
            },
        };
        let accepted = station.fill_fluid(&offer, false);
        if self.infinite.is_none() && accepted > 0 {
            self.tank.drain(accepted);
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::tier::Tier;

    #[test]
    fn finite_tap_drains_itself() {
        let mut tap = Tap::new(100);
        assert_eq!(tap.fill(&water(250)), 250);
        let mut s = station(Tier::Oak, None);
        assert_eq!(tap.pour_into(&mut s), 100);
        assert_eq!(tap.pour_into(&mut s), 100);
        assert_eq!(tap.pour_into(&mut s), 50);
        assert_eq!(tap.pour_into(&mut s), 0);
        assert_eq!(s.tank().amount(), 250);
        assert!(tap.tank().is_empty());
    }

    #[test]
    fn tap_capacity_is_bounded() {
        let mut tap = Tap::new(10);
        assert_eq!(tap.fill(&water(9_000)), TAP_CAPACITY);
    }

    #[test]
    fn infinite_tap_stops_at_station_capacity() {
        let mut tap = Tap::infinite(WATER, 400);
        let mut s = station(Tier::Oak, None);
        for _ in 0..5 {
            tap.pour_into(&mut s);
        }
        assert_eq!(s.tank().amount(), 1_000);
        assert_eq!(tap.pour_into(&mut s), 0);
    }

    #[test]
    fn mismatched_fluid_is_refused() {
        let mut tap = Tap::infinite(LAVA, 50);
        let mut s = station(Tier::Oak, None);
        s.fill_fluid(&water(10), false);
        assert_eq!(tap.pour_into(&mut s), 0);
    }
}
