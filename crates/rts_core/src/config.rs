//! Simulation tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, Fixed};

/// Ticks per second at normal game speed.
pub const TICK_RATE: u32 = 10;

/// Game time covered by one tick, in milliseconds.
pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;

/// Simulation parameters shared by the command state machine and the tick
/// loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Game time covered by one tick. Movement budgets derive from this.
    pub tick_interval_ms: u64,
    /// Wall-clock speed multiplier in percent (200 = double speed).
    pub speed_percent: u32,
    /// Ticks between approach re-routes for out-of-range actions.
    pub reroute_interval: u32,
    /// How far inside its reach an approaching unit aims to stop.
    #[serde(with = "fixed_decimal")]
    pub approach_margin: Fixed,
    /// Footprint gap within which a builder can work on a site.
    #[serde(with = "fixed_decimal")]
    pub build_range: Fixed,
    /// Footprint gap within which a gatherer can extract.
    #[serde(with = "fixed_decimal")]
    pub gather_range: Fixed,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_DURATION_MS,
            speed_percent: 100,
            reroute_interval: 10,
            approach_margin: Fixed::from_num(0.25),
            build_range: Fixed::from_num(1),
            gather_range: Fixed::from_num(1),
        }
    }
}

impl SimConfig {
    /// Game seconds per tick.
    #[must_use]
    pub fn tick_seconds(&self) -> Fixed {
        Fixed::from_num(self.tick_interval_ms) / Fixed::from_num(1000)
    }

    /// Real time between ticks after applying the speed multiplier.
    #[must_use]
    pub fn wall_interval(&self) -> Duration {
        let percent = u64::from(self.speed_percent.max(1));
        Duration::from_millis((self.tick_interval_ms * 100 / percent).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_timing() {
        let config = SimConfig::default();
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.tick_seconds(), Fixed::from_num(1) / Fixed::from_num(10));
        assert_eq!(config.wall_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_speed_multiplier_scales_wall_clock_only() {
        let config = SimConfig {
            speed_percent: 200,
            ..SimConfig::default()
        };
        assert_eq!(config.wall_interval(), Duration::from_millis(50));
        assert_eq!(config.tick_seconds(), SimConfig::default().tick_seconds());
    }
}
