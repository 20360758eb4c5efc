//! Per-session guidance state and the progress rules applied to each sample

use chrono::{DateTime, TimeDelta, Utc};
use fixedbitset::FixedBitSet;
use log::{debug, trace};
use serde::Serialize;

use super::config::GuidanceConfig;
use super::events::{GuidanceEvent, PositionSample};
use super::instructions::{AnnouncementStage, Instruction, synthesize_with};
use crate::geometry::{self, SegmentProjection};
use crate::{Meters, Route};

/// Lifecycle phase of a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Navigating,
    Paused,
    OffRoute,
    Arrived,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Navigating => "navigating",
            Phase::Paused => "paused",
            Phase::OffRoute => "off_route",
            Phase::Arrived => "arrived",
        }
    }
}

/// Tracker lifecycle; only the active variants carry a session
#[derive(Debug)]
pub(crate) enum Lifecycle {
    Idle,
    Navigating(GuidanceState),
    Paused(GuidanceState),
    OffRoute(GuidanceState),
    Arrived(GuidanceState),
}

impl Lifecycle {
    pub(crate) fn phase(&self) -> Phase {
        match self {
            Lifecycle::Idle => Phase::Idle,
            Lifecycle::Navigating(_) => Phase::Navigating,
            Lifecycle::Paused(_) => Phase::Paused,
            Lifecycle::OffRoute(_) => Phase::OffRoute,
            Lifecycle::Arrived(_) => Phase::Arrived,
        }
    }

    pub(crate) fn state(&self) -> Option<&GuidanceState> {
        match self {
            Lifecycle::Idle => None,
            Lifecycle::Navigating(state)
            | Lifecycle::Paused(state)
            | Lifecycle::OffRoute(state)
            | Lifecycle::Arrived(state) => Some(state),
        }
    }
}

/// Consecutive off-route evidence
#[derive(Debug, Clone, Default)]
struct DeviationWindow {
    samples: u32,
    since: Option<DateTime<Utc>>,
}

impl DeviationWindow {
    /// Records an off-route sample, returns whether the debounce window is exhausted
    fn observe(&mut self, timestamp: DateTime<Utc>, config: &GuidanceConfig) -> bool {
        self.samples += 1;
        let since = *self.since.get_or_insert(timestamp);
        let window = TimeDelta::milliseconds((config.debounce_secs * 1000.0).round() as i64);
        self.samples >= config.debounce_samples || timestamp - since >= window
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// What a processed sample means for the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Stay,
    Arrive,
    LeaveRoute,
}

/// Progress of one navigation session along its route
#[derive(Debug, Clone)]
pub struct GuidanceState {
    route: Route,
    instructions: Vec<Instruction>,
    cumulative: Vec<Meters>,
    edge_index: usize,
    /// Distance travelled along the route at the last on-route sample
    progress: Meters,
    next_instruction: usize,
    fired: FixedBitSet,
    last_position: Option<PositionSample>,
    deviation: DeviationWindow,
}

impl GuidanceState {
    pub(crate) fn new(route: Route, config: &GuidanceConfig) -> Self {
        let instructions = synthesize_with(&route, &config.instructions);
        let cumulative = route.cumulative_distances();
        let fired = FixedBitSet::with_capacity(instructions.len());

        Self {
            route,
            instructions,
            cumulative,
            edge_index: 0,
            progress: 0.0,
            next_instruction: 0,
            fired,
            last_position: None,
            deviation: DeviationWindow::default(),
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Index of the edge being walked; edge `i` leads from step `i` to step `i + 1`
    pub fn edge_index(&self) -> usize {
        self.edge_index
    }

    pub fn last_position(&self) -> Option<&PositionSample> {
        self.last_position.as_ref()
    }

    /// Sequence numbers of instructions that were announced, ascending
    pub fn fired(&self) -> Vec<usize> {
        self.fired.ones().collect()
    }

    pub fn is_fired(&self, sequence: usize) -> bool {
        self.fired.contains(sequence)
    }

    pub fn distance_remaining(&self) -> Meters {
        (self.route.total_distance() - self.progress).max(0.0)
    }

    pub(crate) fn reset_deviation(&mut self) {
        self.deviation.reset();
    }

    fn arrival(&self) -> &Instruction {
        &self.instructions[self.instructions.len() - 1]
    }

    /// Applies an accepted sample while navigating
    pub(crate) fn advance(
        &mut self,
        sample: &PositionSample,
        config: &GuidanceConfig,
        events: &mut Vec<GuidanceEvent>,
    ) -> Transition {
        self.last_position = Some(sample.clone());

        if self.check_arrival(sample, events) {
            return Transition::Arrive;
        }

        let tolerance = config.off_route_threshold
            + config.accuracy_weight * sample.accuracy.unwrap_or(0.0);
        let (projection, along) = self.locate(sample, config, tolerance);

        if projection.cross_track > tolerance {
            trace!(
                "Sample {:.1} m off edge {} (tolerance {tolerance:.1} m)",
                projection.cross_track, self.edge_index
            );
            if self.deviation.observe(sample.timestamp, config) {
                events.push(GuidanceEvent::OffRoute {
                    deviation: projection.cross_track,
                    position: sample.clone(),
                });
                events.push(GuidanceEvent::ReplanRequested {
                    position: sample.clone(),
                    goal: self.route.goal().id.clone(),
                });
                return Transition::LeaveRoute;
            }
            return Transition::Stay;
        }

        self.deviation.reset();
        self.progress = self.progress.max(self.cumulative[self.edge_index] + along);
        self.fire_due_instructions(events);
        Transition::Stay
    }

    /// Applies an accepted sample while off-route: only arrival is tracked
    pub(crate) fn observe_off_route(
        &mut self,
        sample: &PositionSample,
        events: &mut Vec<GuidanceEvent>,
    ) -> Transition {
        self.last_position = Some(sample.clone());
        if self.check_arrival(sample, events) {
            Transition::Arrive
        } else {
            Transition::Stay
        }
    }

    fn check_arrival(&mut self, sample: &PositionSample, events: &mut Vec<GuidanceEvent>) -> bool {
        let arrival = self.arrival();
        let to_goal = geometry::distance(sample.point(), self.route.goal().geometry());
        if to_goal > arrival.trigger_distance {
            return false;
        }

        let instruction = arrival.clone();
        self.fired.insert(instruction.sequence);
        self.next_instruction = self.instructions.len();
        self.edge_index = self.route.edge_count().saturating_sub(1);
        self.progress = self.route.total_distance();
        events.push(GuidanceEvent::Arrived { instruction });
        true
    }

    /// Projects the sample onto the current edge, moving forward while it
    /// reaches the end of the edge. Returns the projection and the distance
    /// walked along the current edge.
    fn locate(
        &mut self,
        sample: &PositionSample,
        config: &GuidanceConfig,
        tolerance: Meters,
    ) -> (SegmentProjection, Meters) {
        let point = sample.point();

        if self.route.edge_count() == 0 {
            let projection = geometry::project_onto_segment(
                point,
                self.route.point(0),
                self.route.point(0),
            );
            return (projection, 0.0);
        }

        let last_edge = self.route.edge_count() - 1;
        loop {
            let edge = self.edge_index;
            let projection =
                geometry::project_onto_segment(point, self.route.point(edge), self.route.point(edge + 1));
            let length = self.route.edge_length(edge + 1);
            let along = projection.fraction * length;

            let reached_end = along >= length - config.advance_tolerance;
            if edge < last_edge && reached_end && projection.cross_track <= tolerance {
                self.edge_index += 1;
                debug!("Advanced to edge {} of {}", self.edge_index, last_edge);
                continue;
            }
            return (projection, along);
        }
    }

    /// Announces pending instructions whose trigger distance has been crossed.
    ///
    /// Instructions are consumed strictly in sequence and each one is spoken
    /// at most once. A jump past several triggers, or past the node itself,
    /// announces every crossed instruction in order.
    fn fire_due_instructions(&mut self, events: &mut Vec<GuidanceEvent>) {
        while let Some(instruction) = self.instructions.get(self.next_instruction) {
            if instruction.stage == AnnouncementStage::Arrival {
                break;
            }
            let distance = self.cumulative[instruction.route_index] - self.progress;
            if distance > instruction.trigger_distance {
                break;
            }

            let sequence = self.next_instruction;
            let instruction = instruction.clone();
            debug!("Announcing instruction {sequence}: {}", instruction.text);
            self.fired.insert(sequence);
            self.next_instruction += 1;
            events.push(GuidanceEvent::Instruction {
                instruction,
                distance: distance.max(0.0),
            });
        }
    }
}

/// Snapshot of a tracker for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuidanceStatus {
    pub phase: Phase,
    pub destination: Option<String>,
    pub edge_index: usize,
    pub edge_count: usize,
    pub instructions_fired: usize,
    pub instructions_total: usize,
    pub distance_remaining: Option<Meters>,
    pub last_position: Option<PositionSample>,
    pub reroutes: usize,
}

impl GuidanceStatus {
    pub(crate) fn from_lifecycle(lifecycle: &Lifecycle, reroutes: usize) -> Self {
        let state = lifecycle.state();
        Self {
            phase: lifecycle.phase(),
            destination: state.map(|s| s.route.goal().display_name().to_string()),
            edge_index: state.map_or(0, |s| s.edge_index),
            edge_count: state.map_or(0, |s| s.route.edge_count()),
            instructions_fired: state.map_or(0, |s| s.fired.count_ones(..)),
            instructions_total: state.map_or(0, |s| s.instructions.len()),
            distance_remaining: state.map(GuidanceState::distance_remaining),
            last_position: state.and_then(|s| s.last_position.clone()),
            reroutes,
        }
    }
}
