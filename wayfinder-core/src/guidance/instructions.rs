//! Turn-by-turn instruction synthesis

use itertools::Itertools;
use serde::Serialize;

use super::config::{AnnouncementTier, InstructionConfig};
use crate::geometry::{bearing, normalize_angle};
use crate::{Meters, Route};

/// Turn classification at a route node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Straight,
    SlightLeft,
    SlightRight,
    Left,
    Right,
    SharpLeft,
    SharpRight,
    TurnAround,
    Arrive,
}

impl TurnKind {
    /// Classifies a signed turn angle in degrees, positive to the right
    pub fn classify(angle: f64, config: &InstructionConfig) -> Self {
        let magnitude = angle.abs();
        let right = angle > 0.0;
        let pick = |left, right_kind| if right { right_kind } else { left };

        if magnitude < config.straight_max_angle {
            TurnKind::Straight
        } else if magnitude < config.slight_max_angle {
            pick(TurnKind::SlightLeft, TurnKind::SlightRight)
        } else if magnitude <= config.turn_max_angle {
            pick(TurnKind::Left, TurnKind::Right)
        } else if magnitude >= config.turn_around_min_angle {
            TurnKind::TurnAround
        } else {
            pick(TurnKind::SharpLeft, TurnKind::SharpRight)
        }
    }

    pub fn phrase(self) -> &'static str {
        match self {
            TurnKind::Straight => "continue straight",
            TurnKind::SlightLeft => "keep slightly left",
            TurnKind::SlightRight => "keep slightly right",
            TurnKind::Left => "turn left",
            TurnKind::Right => "turn right",
            TurnKind::SharpLeft => "turn sharp left",
            TurnKind::SharpRight => "turn sharp right",
            TurnKind::TurnAround => "turn around",
            TurnKind::Arrive => "arrive",
        }
    }
}

/// How far ahead of its turn an announcement is made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementStage {
    Far,
    Near,
    Imminent,
    Arrival,
}

/// A single spoken announcement bound to a route node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    /// Position in the instruction sequence, firing order
    pub sequence: usize,
    /// Index of the route step the announcement refers to
    pub route_index: usize,
    pub turn: TurnKind,
    pub stage: AnnouncementStage,
    /// Signed turn angle in degrees, positive to the right
    pub angle: f64,
    pub text: String,
    /// Fires once the remaining distance to the node drops to this value
    pub trigger_distance: Meters,
}

/// Derives instructions with the default [`InstructionConfig`]
pub fn synthesize(route: &Route) -> Vec<Instruction> {
    synthesize_with(route, &InstructionConfig::default())
}

/// Derives the ordered announcement list for a route.
///
/// Every interior node gets up to three announcements, closest last;
/// an arrival announcement always closes the list.
pub fn synthesize_with(route: &Route, config: &InstructionConfig) -> Vec<Instruction> {
    let mut instructions = Vec::new();

    for (offset, (prev, node, next)) in route.steps().iter().tuple_windows().enumerate() {
        let route_index = offset + 1;
        let incoming = bearing(prev.node.geometry(), node.node.geometry());
        let outgoing = bearing(node.node.geometry(), next.node.geometry());
        let angle = normalize_angle(outgoing - incoming);
        let turn = TurnKind::classify(angle, config);

        let action = next
            .incoming
            .as_ref()
            .and_then(|edge| edge.instruction_override.clone())
            .unwrap_or_else(|| turn.phrase().to_string());

        for (stage, distance) in trigger_distances(turn, route.edge_length(route_index), config) {
            instructions.push(Instruction {
                sequence: instructions.len(),
                route_index,
                turn,
                stage,
                angle,
                text: announcement_text(stage, distance, &action),
                trigger_distance: distance,
            });
        }
    }

    let goal = route.goal();
    instructions.push(Instruction {
        sequence: instructions.len(),
        route_index: route.len() - 1,
        turn: TurnKind::Arrive,
        stage: AnnouncementStage::Arrival,
        angle: 0.0,
        text: format!("You have arrived at {}", goal.display_name()),
        trigger_distance: config.arrival_radius,
    });

    instructions
}

/// Announcement distances for a turn reached over an edge of `edge_length`
fn trigger_distances(
    turn: TurnKind,
    edge_length: Meters,
    config: &InstructionConfig,
) -> Vec<(AnnouncementStage, Meters)> {
    let tiers: Vec<(AnnouncementStage, AnnouncementTier)> = if turn == TurnKind::Straight {
        vec![(AnnouncementStage::Far, config.far)]
    } else {
        vec![
            (AnnouncementStage::Far, config.far),
            (AnnouncementStage::Near, config.near),
            (AnnouncementStage::Imminent, config.imminent),
        ]
    };

    let mut kept: Vec<(AnnouncementStage, Meters)> = Vec::with_capacity(tiers.len());
    for (stage, tier) in tiers {
        let distance = tier.distance_for(edge_length);
        if distance <= 0.0 {
            continue;
        }
        let spaced = kept
            .last()
            .is_none_or(|(_, previous)| previous - distance >= config.min_tier_gap);
        if spaced {
            kept.push((stage, distance));
        }
    }
    kept
}

fn announcement_text(stage: AnnouncementStage, distance: Meters, action: &str) -> String {
    match stage {
        AnnouncementStage::Imminent => format!("{} now", capitalize(action)),
        _ => format!("In {} meters, {action}", distance.round()),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
