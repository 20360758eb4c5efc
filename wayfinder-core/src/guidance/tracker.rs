use std::mem;

use chrono::{DateTime, Utc};
use log::{info, warn};

use super::config::GuidanceConfig;
use super::events::{EventSink, GuidanceEvent, PositionSample};
use super::state::{GuidanceState, GuidanceStatus, Lifecycle, Phase, Transition};
use crate::geometry::is_valid_coordinate;
use crate::{Error, Route};

/// Follows a user along a planned route and reports guidance events.
///
/// The tracker is a single-writer state machine: every operation takes
/// `&mut self` and runs to completion, emitting events synchronously into
/// its [`EventSink`].
#[derive(Debug)]
pub struct GuidanceTracker<S: EventSink = Vec<GuidanceEvent>> {
    config: GuidanceConfig,
    lifecycle: Lifecycle,
    sink: S,
    last_timestamp: Option<DateTime<Utc>>,
    reroutes: usize,
}

impl<S: EventSink> GuidanceTracker<S> {
    pub fn new(config: GuidanceConfig, sink: S) -> Self {
        Self {
            config,
            lifecycle: Lifecycle::Idle,
            sink,
            last_timestamp: None,
            reroutes: 0,
        }
    }

    pub fn config(&self) -> &GuidanceConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// Active session, `None` while idle
    pub fn session(&self) -> Option<&GuidanceState> {
        self.lifecycle.state()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn status(&self) -> GuidanceStatus {
        GuidanceStatus::from_lifecycle(&self.lifecycle, self.reroutes)
    }

    /// Begins guidance along `route` from its first edge
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTransition`] unless idle
    pub fn start(&mut self, route: Route) -> Result<(), Error> {
        if !matches!(self.lifecycle, Lifecycle::Idle) {
            return Err(self.rejected("start"));
        }

        info!(
            "Starting guidance to {} ({} edges, {:.1} m)",
            route.goal().id,
            route.edge_count(),
            route.total_distance()
        );
        self.lifecycle = Lifecycle::Navigating(GuidanceState::new(route, &self.config));
        self.last_timestamp = None;
        self.reroutes = 0;
        Ok(())
    }

    /// Processes one position sample and returns the resulting phase.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTransition`] unless navigating or off-route,
    /// [`Error::InvalidPosition`] for unusable samples; neither changes state
    pub fn update(&mut self, sample: PositionSample) -> Result<Phase, Error> {
        if !matches!(
            self.lifecycle,
            Lifecycle::Navigating(_) | Lifecycle::OffRoute(_)
        ) {
            return Err(self.rejected("update"));
        }
        if let Err(e) = self.validate(&sample) {
            warn!("Rejected position sample: {e}");
            return Err(e);
        }
        self.last_timestamp = Some(sample.timestamp);

        let mut events = Vec::new();
        let transition = match &mut self.lifecycle {
            Lifecycle::Navigating(state) => state.advance(&sample, &self.config, &mut events),
            Lifecycle::OffRoute(state) => state.observe_off_route(&sample, &mut events),
            _ => Transition::Stay,
        };

        self.lifecycle = match (mem::replace(&mut self.lifecycle, Lifecycle::Idle), transition) {
            (Lifecycle::Navigating(state) | Lifecycle::OffRoute(state), Transition::Arrive) => {
                info!("Arrived at {}", state.route().goal().id);
                Lifecycle::Arrived(state)
            }
            (Lifecycle::Navigating(state), Transition::LeaveRoute) => {
                info!("User left the route on edge {}", state.edge_index());
                Lifecycle::OffRoute(state)
            }
            (lifecycle, _) => lifecycle,
        };

        for event in events {
            self.sink.emit(event);
        }
        Ok(self.phase())
    }

    /// # Errors
    ///
    /// [`Error::InvalidTransition`] unless navigating
    pub fn pause(&mut self) -> Result<(), Error> {
        match mem::replace(&mut self.lifecycle, Lifecycle::Idle) {
            Lifecycle::Navigating(state) => {
                self.lifecycle = Lifecycle::Paused(state);
                Ok(())
            }
            other => {
                self.lifecycle = other;
                Err(self.rejected("pause"))
            }
        }
    }

    /// # Errors
    ///
    /// [`Error::InvalidTransition`] unless paused
    pub fn resume(&mut self) -> Result<(), Error> {
        match mem::replace(&mut self.lifecycle, Lifecycle::Idle) {
            Lifecycle::Paused(mut state) => {
                state.reset_deviation();
                self.lifecycle = Lifecycle::Navigating(state);
                Ok(())
            }
            other => {
                self.lifecycle = other;
                Err(self.rejected("resume"))
            }
        }
    }

    /// Continues guidance on a replacement route after leaving the old one
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTransition`] unless off-route
    pub fn reroute(&mut self, route: Route) -> Result<(), Error> {
        if !matches!(self.lifecycle, Lifecycle::OffRoute(_)) {
            return Err(self.rejected("reroute"));
        }

        info!(
            "Rerouting to {} ({} edges, {:.1} m)",
            route.goal().id,
            route.edge_count(),
            route.total_distance()
        );
        self.lifecycle = Lifecycle::Navigating(GuidanceState::new(route, &self.config));
        self.reroutes += 1;
        Ok(())
    }

    /// Ends any session; always succeeds
    pub fn cancel(&mut self) {
        if let Some(state) = self.lifecycle.state() {
            info!("Guidance to {} cancelled", state.route().goal().id);
        }
        self.lifecycle = Lifecycle::Idle;
        self.last_timestamp = None;
    }

    fn validate(&self, sample: &PositionSample) -> Result<(), Error> {
        if !is_valid_coordinate(sample.lat, sample.lon) {
            return Err(Error::InvalidPosition(format!(
                "coordinate ({}, {}) is out of range",
                sample.lat, sample.lon
            )));
        }
        if let Some(accuracy) = sample.accuracy {
            if !accuracy.is_finite() || accuracy < 0.0 {
                return Err(Error::InvalidPosition(format!(
                    "accuracy {accuracy} is not a distance"
                )));
            }
            if accuracy > self.config.max_sample_accuracy {
                return Err(Error::InvalidPosition(format!(
                    "accuracy {accuracy:.1} m exceeds {:.1} m",
                    self.config.max_sample_accuracy
                )));
            }
        }
        if let Some(last) = self.last_timestamp
            && sample.timestamp < last
        {
            return Err(Error::InvalidPosition(format!(
                "timestamp {} precedes the last accepted sample at {last}",
                sample.timestamp
            )));
        }
        Ok(())
    }

    fn rejected(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.phase().as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use geo::{Destination, Haversine, Point};

    use super::*;
    use crate::guidance::instructions::{AnnouncementStage, TurnKind};
    use crate::{CampusGraph, EdgeRecord, NodeRecord, plan};

    const ORIGIN: (f64, f64) = (116.4074, 39.9042);

    fn origin() -> Point<f64> {
        Point::new(ORIGIN.0, ORIGIN.1)
    }

    fn record_at(id: &str, point: Point<f64>) -> NodeRecord {
        NodeRecord::new(id, point.y(), point.x())
    }

    /// a -> b -> c, 100 m north then `second_leg` meters towards `turn_bearing`
    fn two_leg_route(turn_bearing: f64, second_leg: f64) -> Route {
        let a = origin();
        let b = Haversine.destination(a, 0.0, 100.0);
        let c = Haversine.destination(b, turn_bearing, second_leg);
        let graph = CampusGraph::load(
            vec![record_at("a", a), record_at("b", b), record_at("c", c)],
            vec![
                EdgeRecord::new("a", "b", 100.0),
                EdgeRecord::new("b", "c", second_leg),
            ],
        )
        .unwrap();
        plan(&graph, "a", "c", false).unwrap()
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + TimeDelta::seconds(seconds)
    }

    /// Sample `north` meters up the first leg, shifted `east` meters sideways
    fn sample(north: f64, east: f64, seconds: i64) -> PositionSample {
        let on_route = Haversine.destination(origin(), 0.0, north);
        let point = Haversine.destination(on_route, 90.0, east);
        PositionSample::at_point(point, at(seconds))
    }

    fn tracker_on(route: Route) -> GuidanceTracker {
        let mut tracker = GuidanceTracker::new(GuidanceConfig::default(), Vec::new());
        tracker.start(route).unwrap();
        tracker
    }

    fn fired_instructions(events: &[GuidanceEvent]) -> Vec<&crate::Instruction> {
        events
            .iter()
            .filter_map(|event| match event {
                GuidanceEvent::Instruction { instruction, .. } => Some(instruction),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn straight_walk_announces_then_arrives_once() {
        let mut tracker = tracker_on(two_leg_route(0.0, 100.0));

        for (i, north) in (0..=20).map(|step| f64::from(step) * 10.0).enumerate() {
            let phase = tracker.update(sample(north, 0.0, i as i64)).unwrap();
            if north < 190.0 {
                assert_eq!(phase, Phase::Navigating, "at {north} m");
            }
        }
        assert_eq!(tracker.phase(), Phase::Arrived);

        let events = tracker.sink();
        let spoken = fired_instructions(events);
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].turn, TurnKind::Straight);
        assert_eq!(spoken[0].text, "In 50 meters, continue straight");

        let arrivals = events
            .iter()
            .filter(|event| matches!(event, GuidanceEvent::Arrived { .. }))
            .count();
        assert_eq!(arrivals, 1);
        assert!(matches!(events.last(), Some(GuidanceEvent::Arrived { .. })));
        let emitted = events.len();

        assert_eq!(
            tracker.update(sample(200.0, 0.0, 30)).unwrap_err(),
            Error::InvalidTransition {
                action: "update",
                state: "arrived"
            }
        );
        assert_eq!(tracker.sink().len(), emitted);
    }

    #[test]
    fn jitter_never_refires_announcements() {
        let mut tracker = tracker_on(two_leg_route(90.0, 60.0));
        let walk = [0.0, 40.0, 55.0, 48.0, 70.0, 65.0, 85.0, 82.0, 90.0, 96.0, 94.0, 99.0];
        for (i, north) in walk.into_iter().enumerate() {
            tracker.update(sample(north, 0.0, i as i64)).unwrap();
        }

        let spoken = fired_instructions(tracker.sink());
        let stages: Vec<_> = spoken.iter().map(|i| i.stage).collect();
        assert_eq!(
            stages,
            [
                AnnouncementStage::Far,
                AnnouncementStage::Near,
                AnnouncementStage::Imminent
            ]
        );
        assert!(spoken.iter().all(|i| i.turn == TurnKind::Right));

        let sequences: Vec<_> = spoken.iter().map(|i| i.sequence).collect();
        assert_eq!(sequences, [0, 1, 2]);
        assert_eq!(tracker.session().unwrap().fired(), [0, 1, 2]);
    }

    #[test]
    fn jump_past_every_tier_announces_each_in_order() {
        let mut tracker = tracker_on(two_leg_route(90.0, 60.0));
        tracker.update(sample(0.0, 0.0, 0)).unwrap();
        tracker.update(sample(96.0, 0.0, 1)).unwrap();
        tracker.update(sample(97.0, 0.0, 2)).unwrap();

        let spoken = fired_instructions(tracker.sink());
        let sequences: Vec<_> = spoken.iter().map(|i| i.sequence).collect();
        assert_eq!(sequences, [0, 1, 2]);
        let stages: Vec<_> = spoken.iter().map(|i| i.stage).collect();
        assert_eq!(
            stages,
            [
                AnnouncementStage::Far,
                AnnouncementStage::Near,
                AnnouncementStage::Imminent
            ]
        );
        assert_eq!(spoken[2].text, "Turn right now");
        assert_eq!(tracker.session().unwrap().fired(), [0, 1, 2]);
    }

    #[test]
    fn walking_past_a_turn_still_announces_it_once() {
        let mut tracker = tracker_on(two_leg_route(90.0, 60.0));
        tracker.update(sample(0.0, 0.0, 0)).unwrap();
        // 10 m beyond the turn at b, along the second leg
        let b = Haversine.destination(origin(), 0.0, 100.0);
        let beyond = Haversine.destination(b, 90.0, 10.0);
        tracker
            .update(PositionSample::at_point(beyond, at(1)))
            .unwrap();
        tracker
            .update(PositionSample::at_point(beyond, at(2)))
            .unwrap();

        let sequences: Vec<_> = fired_instructions(tracker.sink())
            .iter()
            .map(|i| i.sequence)
            .collect();
        assert_eq!(sequences, [0, 1, 2]);
        assert_eq!(tracker.status().edge_index, 1);
    }

    #[test]
    fn advances_edges_and_tracks_remaining_distance() {
        let mut tracker = tracker_on(two_leg_route(90.0, 60.0));
        tracker.update(sample(50.0, 0.0, 0)).unwrap();
        assert_eq!(tracker.status().edge_index, 0);

        tracker.update(sample(98.0, 0.0, 1)).unwrap();
        let status = tracker.status();
        assert_eq!(status.edge_index, 1);
        assert_eq!(status.edge_count, 2);
        let remaining = status.distance_remaining.unwrap();
        assert!((remaining - 60.0).abs() < 1.0, "remaining {remaining}");

        // walking back does not undo progress
        tracker.update(sample(60.0, 0.0, 2)).unwrap();
        assert_eq!(tracker.status().edge_index, 1);
    }

    #[test]
    fn sustained_deviation_leaves_route() {
        let mut tracker = tracker_on(two_leg_route(0.0, 100.0));
        tracker.update(sample(10.0, 0.0, 0)).unwrap();

        assert_eq!(tracker.update(sample(20.0, 20.0, 1)).unwrap(), Phase::Navigating);
        assert_eq!(tracker.update(sample(25.0, 20.0, 2)).unwrap(), Phase::Navigating);
        assert_eq!(tracker.update(sample(30.0, 20.0, 3)).unwrap(), Phase::OffRoute);

        let events = tracker.sink();
        let n = events.len();
        assert!(matches!(events[n - 2], GuidanceEvent::OffRoute { deviation, .. } if deviation > 19.0));
        match &events[n - 1] {
            GuidanceEvent::ReplanRequested { goal, position } => {
                assert_eq!(goal, "c");
                assert_eq!(position.timestamp, at(3));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn deviation_window_also_expires_by_time() {
        let config = GuidanceConfig {
            debounce_samples: 100,
            ..GuidanceConfig::default()
        };
        let mut tracker = GuidanceTracker::new(config, Vec::new());
        tracker.start(two_leg_route(0.0, 100.0)).unwrap();

        for second in 0..5 {
            let phase = tracker.update(sample(20.0, 20.0, second)).unwrap();
            assert_eq!(phase, Phase::Navigating, "after {second} s");
        }
        assert_eq!(tracker.update(sample(20.0, 20.0, 5)).unwrap(), Phase::OffRoute);
    }

    #[test]
    fn single_blip_is_ignored() {
        let mut tracker = tracker_on(two_leg_route(0.0, 100.0));
        tracker.update(sample(10.0, 0.0, 0)).unwrap();
        tracker.update(sample(12.0, 20.0, 1)).unwrap();
        tracker.update(sample(14.0, 0.0, 2)).unwrap();
        tracker.update(sample(16.0, 20.0, 3)).unwrap();
        tracker.update(sample(18.0, 0.0, 4)).unwrap();

        assert_eq!(tracker.phase(), Phase::Navigating);
        assert!(
            tracker
                .sink()
                .iter()
                .all(|event| !matches!(event, GuidanceEvent::OffRoute { .. }))
        );
    }

    #[test]
    fn poor_accuracy_widens_the_corridor() {
        let mut tracker = tracker_on(two_leg_route(0.0, 100.0));
        for second in 0..6 {
            let fix = sample(20.0, 20.0, second).with_accuracy(12.0);
            assert_eq!(tracker.update(fix).unwrap(), Phase::Navigating);
        }
    }

    #[test]
    fn invalid_samples_leave_state_untouched() {
        let mut tracker = tracker_on(two_leg_route(0.0, 100.0));
        tracker.update(sample(30.0, 0.0, 10)).unwrap();
        let before = tracker.status();
        let events_before = tracker.sink().len();

        let mut bad_lat = sample(30.0, 0.0, 11);
        bad_lat.lat = 91.0;
        let mut nan_lon = sample(30.0, 0.0, 11);
        nan_lon.lon = f64::NAN;
        let rejected = [
            bad_lat,
            nan_lon,
            sample(40.0, 0.0, 11).with_accuracy(-1.0),
            sample(40.0, 0.0, 11).with_accuracy(80.0),
            sample(60.0, 0.0, 9),
        ];
        for fix in rejected {
            assert!(matches!(tracker.update(fix), Err(Error::InvalidPosition(_))));
        }

        assert_eq!(tracker.status(), before);
        assert_eq!(tracker.sink().len(), events_before);
    }

    #[test]
    fn pause_holds_progress() {
        let mut tracker = tracker_on(two_leg_route(90.0, 60.0));
        tracker.update(sample(55.0, 0.0, 0)).unwrap();
        tracker.pause().unwrap();
        assert_eq!(tracker.phase(), Phase::Paused);

        assert!(matches!(
            tracker.update(sample(60.0, 0.0, 1)),
            Err(Error::InvalidTransition { action: "update", state: "paused" })
        ));
        assert!(tracker.pause().is_err());

        tracker.resume().unwrap();
        assert_eq!(tracker.phase(), Phase::Navigating);
        tracker.update(sample(60.0, 0.0, 2)).unwrap();
        assert_eq!(fired_instructions(tracker.sink()).len(), 1);
    }

    #[test]
    fn reroute_only_from_off_route() {
        let mut tracker = tracker_on(two_leg_route(0.0, 100.0));
        let detour = two_leg_route(90.0, 60.0);
        assert!(matches!(
            tracker.reroute(detour.clone()),
            Err(Error::InvalidTransition { action: "reroute", state: "navigating" })
        ));

        for second in 0..3 {
            tracker.update(sample(20.0, 25.0, second)).unwrap();
        }
        assert_eq!(tracker.phase(), Phase::OffRoute);

        tracker.reroute(detour).unwrap();
        let status = tracker.status();
        assert_eq!(status.phase, Phase::Navigating);
        assert_eq!(status.reroutes, 1);
        assert_eq!(status.instructions_fired, 0);
        assert_eq!(status.edge_index, 0);

        // timestamps stay ordered across the replacement route
        assert!(tracker.update(sample(10.0, 0.0, 1)).is_err());
        assert!(tracker.update(sample(10.0, 0.0, 3)).is_ok());
    }

    #[test]
    fn lifecycle_rejections_and_cancel() {
        let mut tracker = GuidanceTracker::new(GuidanceConfig::default(), Vec::new());
        assert_eq!(
            tracker.update(sample(0.0, 0.0, 0)).unwrap_err(),
            Error::InvalidTransition {
                action: "update",
                state: "idle"
            }
        );
        assert!(tracker.resume().is_err());

        tracker.start(two_leg_route(0.0, 100.0)).unwrap();
        assert!(matches!(
            tracker.start(two_leg_route(0.0, 100.0)),
            Err(Error::InvalidTransition { action: "start", .. })
        ));

        tracker.cancel();
        assert_eq!(tracker.phase(), Phase::Idle);
        assert_eq!(tracker.status().destination, None);
        assert!(tracker.start(two_leg_route(0.0, 100.0)).is_ok());
    }

    #[test]
    fn status_names_destination() {
        let tracker = tracker_on(two_leg_route(0.0, 100.0));
        let status = tracker.status();
        assert_eq!(status.phase, Phase::Navigating);
        assert_eq!(status.destination.as_deref(), Some("c"));
        assert_eq!(status.instructions_total, 2);
        assert_eq!(status.last_position, None);
    }
}
