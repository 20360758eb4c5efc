//! Asynchronous runner that owns a [`GuidanceTracker`] inside one task.
//!
//! Position samples reach the task through a `watch` channel, so a slow
//! tracker only ever sees the newest fix. Events leave through a bounded
//! `mpsc` channel and are dropped when the consumer falls behind.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::config::GuidanceConfig;
use super::events::{EventSink, GuidanceEvent, PositionSample};
use super::state::{GuidanceStatus, Phase};
use super::tracker::GuidanceTracker;
use crate::{CampusGraph, Error, Route, plan};

/// Graph access for automatic replanning once the user leaves the route
#[derive(Debug, Clone)]
pub struct ReplanContext {
    pub graph: Arc<CampusGraph>,
    pub require_accessible: bool,
}

type Reply = oneshot::Sender<Result<(), Error>>;

enum Command {
    Pause(Reply),
    Resume(Reply),
    Reroute(Route, Reply),
    Cancel,
}

/// Handle to a running guidance task
#[derive(Debug)]
pub struct NavigationSession {
    samples: watch::Sender<Option<PositionSample>>,
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<GuidanceStatus>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Pause(_) => "Pause",
            Command::Resume(_) => "Resume",
            Command::Reroute(..) => "Reroute",
            Command::Cancel => "Cancel",
        };
        f.write_str(name)
    }
}

impl NavigationSession {
    /// Starts guidance along `route` on the current tokio runtime.
    ///
    /// Returns the handle and the receiving end of the event queue. The task
    /// ends on arrival, on [`cancel`](Self::cancel), or when the handle is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Propagates [`GuidanceTracker::start`] failures
    pub fn spawn(
        config: GuidanceConfig,
        route: Route,
        replan: Option<ReplanContext>,
        event_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<GuidanceEvent>), Error> {
        let (event_tx, event_rx) = mpsc::channel(event_capacity.max(1));
        let mut tracker = GuidanceTracker::new(config, event_tx);
        tracker.start(route)?;

        let (sample_tx, sample_rx) = watch::channel(None);
        let (command_tx, command_rx) = mpsc::channel(8);
        let (status_tx, status_rx) = watch::channel(tracker.status());

        let runner = Runner {
            tracker,
            samples: sample_rx,
            commands: command_rx,
            status: status_tx,
            replan,
            pending: None,
            failed: None,
        };
        let task = tokio::spawn(runner.run());

        let session = Self {
            samples: sample_tx,
            commands: command_tx,
            status: status_rx,
            task,
        };
        Ok((session, event_rx))
    }

    /// Offers a sample; an unprocessed earlier sample is replaced
    ///
    /// # Errors
    ///
    /// [`Error::SessionClosed`] once the task has ended
    pub fn push_sample(&self, sample: PositionSample) -> Result<(), Error> {
        if self.samples.is_closed() {
            return Err(Error::SessionClosed);
        }
        self.samples.send_replace(Some(sample));
        Ok(())
    }

    pub async fn pause(&self) -> Result<(), Error> {
        self.request(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<(), Error> {
        self.request(Command::Resume).await
    }

    /// Replaces the route while off-route
    pub async fn reroute(&self, route: Route) -> Result<(), Error> {
        self.request(|reply| Command::Reroute(route, reply)).await
    }

    /// Asks the task to stop; use [`join`](Self::join) to wait for it
    pub async fn cancel(&self) -> Result<(), Error> {
        self.commands
            .send(Command::Cancel)
            .await
            .map_err(|_| Error::SessionClosed)
    }

    /// Latest published status
    pub fn status(&self) -> GuidanceStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<GuidanceStatus> {
        self.status.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task to end and returns its final status
    pub async fn join(self) -> GuidanceStatus {
        let Self { task, status, .. } = self;
        if let Err(e) = task.await {
            warn!("Navigation task failed: {e}");
        }
        status.borrow().clone()
    }

    async fn request(&self, command: impl FnOnce(Reply) -> Command) -> Result<(), Error> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| Error::SessionClosed)?;
        reply_rx.await.map_err(|_| Error::SessionClosed)?
    }
}

struct Runner {
    tracker: GuidanceTracker<mpsc::Sender<GuidanceEvent>>,
    samples: watch::Receiver<Option<PositionSample>>,
    commands: mpsc::Receiver<Command>,
    status: watch::Sender<GuidanceStatus>,
    replan: Option<ReplanContext>,
    pending: Option<PendingReplan>,
    /// `(start, goal)` of the last replan that found no route
    failed: Option<(String, String)>,
}

struct PendingReplan {
    start: String,
    goal: String,
    handle: JoinHandle<Result<Route, Error>>,
}

impl Runner {
    async fn run(mut self) {
        loop {
            tokio::select! {
                changed = self.samples.changed() => {
                    if changed.is_err() {
                        debug!("Position feed closed");
                        break;
                    }
                    let sample = self.samples.borrow_and_update().clone();
                    if let Some(sample) = sample {
                        self.on_sample(sample);
                    }
                }
                command = self.commands.recv() => match command {
                    Some(Command::Pause(reply)) => {
                        let result = self.tracker.pause();
                        self.reply(reply, result);
                    }
                    Some(Command::Resume(reply)) => {
                        let result = self.tracker.resume();
                        self.reply(reply, result);
                    }
                    Some(Command::Reroute(route, reply)) => {
                        let result = self.tracker.reroute(route);
                        if result.is_ok() {
                            self.failed = None;
                        }
                        self.reply(reply, result);
                    }
                    Some(Command::Cancel) | None => {
                        self.tracker.cancel();
                        self.status.send_replace(self.tracker.status());
                        break;
                    }
                },
                replanned = wait_pending(&mut self.pending), if self.pending.is_some() => {
                    if let Some(pending) = self.pending.take() {
                        self.on_replanned(pending.start, pending.goal, replanned);
                    }
                }
            }

            self.status.send_replace(self.tracker.status());
            if self.tracker.phase() == Phase::Arrived {
                info!("Navigation session finished");
                break;
            }
        }

        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }

    /// Publishes the new status before answering so callers observe it
    fn reply(&self, reply: Reply, result: Result<(), Error>) {
        self.status.send_replace(self.tracker.status());
        let _ = reply.send(result);
    }

    fn on_sample(&mut self, sample: PositionSample) {
        match self.tracker.update(sample.clone()) {
            Ok(Phase::OffRoute) if self.pending.is_none() => self.request_replan(sample),
            Ok(_) => {}
            Err(e) => debug!("Dropped position sample: {e}"),
        }
    }

    fn request_replan(&mut self, position: PositionSample) {
        let Some(context) = self.replan.clone() else {
            return;
        };
        let Some(goal) = self.tracker.session().map(|s| s.route().goal().id.clone()) else {
            return;
        };
        let Some(start) = context
            .graph
            .nearest_node(&position.point())
            .map(|(node, _)| node.id.clone())
        else {
            warn!("Cannot replan on an empty graph");
            return;
        };

        let inputs = (start, goal);
        if self.failed.as_ref() == Some(&inputs) {
            debug!("Not retrying replan from {} to {}", inputs.0, inputs.1);
            return;
        }
        let (start, goal) = inputs;

        debug!("Replanning from {start} to {goal}");
        let handle = {
            let (start, goal) = (start.clone(), goal.clone());
            tokio::task::spawn_blocking(move || {
                plan(&context.graph, &start, &goal, context.require_accessible)
            })
        };
        self.pending = Some(PendingReplan {
            start,
            goal,
            handle,
        });
    }

    fn on_replanned(
        &mut self,
        start: String,
        goal: String,
        result: Result<Result<Route, Error>, tokio::task::JoinError>,
    ) {
        match result {
            Ok(Ok(route)) if self.tracker.phase() == Phase::OffRoute => {
                match self.tracker.reroute(route) {
                    Ok(()) => self.failed = None,
                    Err(e) => warn!("Could not apply replanned route: {e}"),
                }
            }
            Ok(Ok(_)) => debug!("Discarding replanned route, session already moved on"),
            Ok(Err(e)) => {
                warn!("Replanning from {start} to {goal} failed: {e}");
                self.tracker.sink_mut().emit(GuidanceEvent::ReplanFailed {
                    start: start.clone(),
                    goal: goal.clone(),
                    reason: e.to_string(),
                });
                self.failed = Some((start, goal));
            }
            Err(e) => warn!("Replanning task failed: {e}"),
        }
    }
}

async fn wait_pending(
    pending: &mut Option<PendingReplan>,
) -> Result<Result<Route, Error>, tokio::task::JoinError> {
    match pending {
        Some(pending) => (&mut pending.handle).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeDelta, Utc};
    use geo::{Destination, Distance, Haversine, Point};
    use tokio::time::timeout;

    use super::*;
    use crate::{EdgeRecord, NodeRecord};

    fn origin() -> Point<f64> {
        Point::new(116.4074, 39.9042)
    }

    fn offset(north: f64, east: f64) -> Point<f64> {
        let on_line = Haversine.destination(origin(), 0.0, north);
        Haversine.destination(on_line, 90.0, east)
    }

    fn record(id: &str, point: Point<f64>) -> NodeRecord {
        NodeRecord::new(id, point.y(), point.x())
    }

    /// a -> b -> c due north, plus a side path x -> b from 25 m east of the line
    /// and an unconnected node 40 m east of the line
    fn campus() -> Arc<CampusGraph> {
        let side = offset(30.0, 25.0);
        let side_to_b = Haversine.distance(side, offset(100.0, 0.0));
        let graph = CampusGraph::load(
            vec![
                record("a", offset(0.0, 0.0)),
                record("b", offset(100.0, 0.0)),
                record("c", offset(200.0, 0.0)),
                record("x", side),
                record("island", offset(50.0, 40.0)),
            ],
            vec![
                EdgeRecord::new("a", "b", 100.0),
                EdgeRecord::new("b", "c", 100.0),
                EdgeRecord::new("x", "b", side_to_b),
            ],
        )
        .unwrap();
        Arc::new(graph)
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + TimeDelta::seconds(seconds)
    }

    async fn feed(session: &NavigationSession, north: f64, east: f64, seconds: i64) {
        let sample = PositionSample::at_point(offset(north, east), at(seconds));
        let mut status = session.subscribe_status();
        session.push_sample(sample.clone()).unwrap();
        timeout(
            Duration::from_secs(5),
            status.wait_for(|s| s.last_position.as_ref() == Some(&sample) || s.phase == Phase::Arrived),
        )
        .await
        .unwrap()
        .unwrap();
    }

    fn drain(events: &mut mpsc::Receiver<GuidanceEvent>) -> Vec<GuidanceEvent> {
        std::iter::from_fn(|| events.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn walks_to_arrival_and_stops() {
        let graph = campus();
        let route = plan(&graph, "a", "c", false).unwrap();
        let (session, mut events) =
            NavigationSession::spawn(GuidanceConfig::default(), route, None, 16).unwrap();

        for step in 0..=20 {
            feed(&session, f64::from(step) * 10.0, 0.0, i64::from(step)).await;
        }

        let status = timeout(Duration::from_secs(5), session.join()).await.unwrap();
        assert_eq!(status.phase, Phase::Arrived);

        let events = drain(&mut events);
        assert!(matches!(events.first(), Some(GuidanceEvent::Instruction { .. })));
        assert!(matches!(events.last(), Some(GuidanceEvent::Arrived { .. })));
    }

    #[tokio::test]
    async fn leaving_the_route_triggers_replanning() {
        let graph = campus();
        let route = plan(&graph, "a", "c", false).unwrap();
        let context = ReplanContext {
            graph: Arc::clone(&graph),
            require_accessible: false,
        };
        let (session, mut events) =
            NavigationSession::spawn(GuidanceConfig::default(), route, Some(context), 16).unwrap();

        feed(&session, 10.0, 0.0, 0).await;
        for second in 1..=3 {
            feed(&session, 30.0, 25.0, second).await;
        }

        let mut status = session.subscribe_status();
        let rerouted = timeout(
            Duration::from_secs(5),
            status.wait_for(|s| s.reroutes == 1 && s.phase == Phase::Navigating),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(rerouted.edge_count, 2);

        let kinds: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(|e| !matches!(e, GuidanceEvent::Instruction { .. }))
            .collect();
        assert!(matches!(kinds[0], GuidanceEvent::OffRoute { .. }));
        assert!(matches!(&kinds[1], GuidanceEvent::ReplanRequested { goal, .. } if goal == "c"));

        session.cancel().await.unwrap();
        assert_eq!(session.join().await.phase, Phase::Idle);
    }

    #[tokio::test]
    async fn failed_replan_is_reported_to_the_consumer() {
        let graph = campus();
        let route = plan(&graph, "a", "c", false).unwrap();
        let context = ReplanContext {
            graph: Arc::clone(&graph),
            require_accessible: false,
        };
        let (session, mut events) =
            NavigationSession::spawn(GuidanceConfig::default(), route, Some(context), 16).unwrap();

        feed(&session, 10.0, 0.0, 0).await;
        for second in 1..=3 {
            feed(&session, 50.0, 40.0, second).await;
        }

        let failure = timeout(Duration::from_secs(5), async {
            loop {
                match events.recv().await {
                    Some(event @ GuidanceEvent::ReplanFailed { .. }) => break event,
                    Some(_) => continue,
                    None => panic!("event queue closed"),
                }
            }
        })
        .await
        .unwrap();
        assert!(matches!(
            failure,
            GuidanceEvent::ReplanFailed { start, goal, .. } if start == "island" && goal == "c"
        ));
        assert_eq!(session.status().phase, Phase::OffRoute);
        assert_eq!(session.status().reroutes, 0);

        session.cancel().await.unwrap();
        session.join().await;
    }

    #[tokio::test]
    async fn failed_replan_is_not_retried_from_the_same_node() {
        let graph = campus();
        let route = plan(&graph, "a", "c", false).unwrap();
        let (event_tx, mut event_rx) = mpsc::channel(16);
        let mut tracker = GuidanceTracker::new(GuidanceConfig::default(), event_tx);
        tracker.start(route).unwrap();

        let (_sample_tx, sample_rx) = watch::channel(None);
        let (_command_tx, command_rx) = mpsc::channel(1);
        let (status_tx, _status_rx) = watch::channel(tracker.status());
        let mut runner = Runner {
            tracker,
            samples: sample_rx,
            commands: command_rx,
            status: status_tx,
            replan: Some(ReplanContext {
                graph: Arc::clone(&graph),
                require_accessible: false,
            }),
            pending: None,
            failed: None,
        };

        let sample = |north, east, seconds| PositionSample::at_point(offset(north, east), at(seconds));
        runner.on_sample(sample(10.0, 0.0, 0));
        for second in 1..=3 {
            runner.on_sample(sample(50.0, 40.0, second));
        }
        assert_eq!(runner.tracker.phase(), Phase::OffRoute);

        let result = wait_pending(&mut runner.pending).await;
        let pending = runner.pending.take().unwrap();
        runner.on_replanned(pending.start, pending.goal, result);
        assert_eq!(
            runner.failed,
            Some(("island".to_string(), "c".to_string()))
        );

        // same nearest node and goal: nothing is planned
        runner.on_sample(sample(51.0, 40.0, 4));
        runner.on_sample(sample(50.0, 41.0, 5));
        assert!(runner.pending.is_none());

        let failures = std::iter::from_fn(|| event_rx.try_recv().ok())
            .filter(|event| matches!(event, GuidanceEvent::ReplanFailed { .. }))
            .count();
        assert_eq!(failures, 1);

        // a different nearest node is a new attempt
        runner.on_sample(sample(30.0, 25.0, 6));
        let pending = runner.pending.as_ref().unwrap();
        assert_eq!(pending.start, "x");
    }

    #[tokio::test]
    async fn commands_round_trip_through_the_task() {
        let graph = campus();
        let route = plan(&graph, "a", "c", false).unwrap();
        let (session, _events) =
            NavigationSession::spawn(GuidanceConfig::default(), route.clone(), None, 4).unwrap();

        session.pause().await.unwrap();
        assert_eq!(session.status().phase, Phase::Paused);
        assert!(matches!(
            session.pause().await,
            Err(Error::InvalidTransition { action: "pause", .. })
        ));
        assert!(session.reroute(route).await.is_err());

        session.resume().await.unwrap();
        assert_eq!(session.status().phase, Phase::Navigating);

        session.cancel().await.unwrap();
        let status = session.join().await;
        assert_eq!(status.phase, Phase::Idle);
    }

    #[tokio::test]
    async fn finished_session_rejects_input() {
        let graph = campus();
        let route = plan(&graph, "c", "c", false).unwrap();
        let (session, _events) =
            NavigationSession::spawn(GuidanceConfig::default(), route, None, 4).unwrap();

        feed(&session, 200.0, 0.0, 0).await;
        timeout(Duration::from_secs(5), async {
            while !session.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(session.status().phase, Phase::Arrived);
        assert_eq!(session.pause().await, Err(Error::SessionClosed));
        assert_eq!(
            session.push_sample(PositionSample::new(39.9, 116.4, at(1))),
            Err(Error::SessionClosed)
        );
    }
}
