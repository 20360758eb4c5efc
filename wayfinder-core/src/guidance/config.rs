//! Tunable guidance parameters
//!
//! Defaults follow common pedestrian-navigation practice; every value can be
//! overridden from configuration files.

use serde::Deserialize;

use crate::{Meters, Seconds};

/// One announcement distance before a turn: `min(max_distance, fraction * edge length)`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AnnouncementTier {
    pub max_distance: Meters,
    pub fraction: f64,
}

impl AnnouncementTier {
    pub const fn new(max_distance: Meters, fraction: f64) -> Self {
        Self {
            max_distance,
            fraction,
        }
    }

    /// Trigger distance for an edge of the given length, never beyond the edge
    pub fn distance_for(&self, edge_length: Meters) -> Meters {
        self.max_distance
            .min(self.fraction * edge_length)
            .min(edge_length)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InstructionConfig {
    pub far: AnnouncementTier,
    pub near: AnnouncementTier,
    pub imminent: AnnouncementTier,
    /// Tiers closer than this to the previous one are dropped
    pub min_tier_gap: Meters,
    /// Distance from the goal at which arrival is announced
    pub arrival_radius: Meters,
    /// Upper bound (exclusive) of "continue straight", in degrees
    pub straight_max_angle: f64,
    /// Upper bound (exclusive) of slight turns
    pub slight_max_angle: f64,
    /// Upper bound (inclusive) of regular turns
    pub turn_max_angle: f64,
    /// Lower bound of "turn around"
    pub turn_around_min_angle: f64,
}

impl Default for InstructionConfig {
    fn default() -> Self {
        Self {
            far: AnnouncementTier::new(50.0, 0.8),
            near: AnnouncementTier::new(20.0, 0.4),
            imminent: AnnouncementTier::new(5.0, 0.1),
            min_tier_gap: 2.0,
            arrival_radius: 5.0,
            straight_max_angle: 15.0,
            slight_max_angle: 45.0,
            turn_max_angle: 120.0,
            turn_around_min_angle: 170.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// How close to the end of an edge a sample must project to move on
    pub advance_tolerance: Meters,
    /// Cross-track distance beyond which a sample counts as off-route
    pub off_route_threshold: Meters,
    /// Meters of extra tolerance per meter of reported sample accuracy
    pub accuracy_weight: f64,
    /// Samples reporting a worse accuracy are rejected
    pub max_sample_accuracy: Meters,
    /// Consecutive off-route samples needed to leave the route
    pub debounce_samples: u32,
    /// Time spent off-route needed to leave the route
    pub debounce_secs: Seconds,
    pub instructions: InstructionConfig,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            advance_tolerance: 3.0,
            off_route_threshold: 15.0,
            accuracy_weight: 0.5,
            max_sample_accuracy: 50.0,
            debounce_samples: 3,
            debounce_secs: 5.0,
            instructions: InstructionConfig::default(),
        }
    }
}

impl GuidanceConfig {
    pub fn arrival_radius(&self) -> Meters {
        self.instructions.arrival_radius
    }
}
