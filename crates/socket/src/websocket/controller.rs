//! Reconnecting socket controller with heartbeat supervision.
//!
//! The controller is a plain state machine. It opens links through a
//! [`Connector`], arms timers through a [`Scheduler`], and reacts to whatever
//! the driver feeds back via [`SocketController::handle_transport_event`] and
//! [`SocketController::handle_timer`]. It never blocks and never spawns.
//!
//! Lifecycle:
//!
//! ```text
//! CONNECTING --open--> OPEN --close / heartbeat timeout--> CONNECTING (after delay)
//!      \                 \
//!       +-----budget exhausted / disconnect()-----> CLOSED (terminal)
//! ```

use crate::config::SocketConfig;
use crate::error::SocketError;

use super::core::{ReconnectBudget, TimerSlot};
use super::handlers::Handlers;
use super::ports::{Connector, LinkId, Scheduler, TimerId, Transport, TransportEvent};
use super::protocol::Status;

struct ActiveLink {
    id: LinkId,
    transport: Box<dyn Transport>,
}

enum Heartbeat {
    Ping,
    Pong,
}

pub struct SocketController<C, S> {
    config: SocketConfig,
    status: Status,
    link: Option<ActiveLink>,
    next_link: u64,
    budget: ReconnectBudget,
    handlers: Handlers,
    reconnect_timer: TimerSlot,
    heartbeat_timer: TimerSlot,
    grace_timer: TimerSlot,
    connector: C,
    scheduler: S,
}

impl<C: Connector, S: Scheduler> SocketController<C, S> {
    /// Create an idle controller. Nothing happens until [`connect`](Self::connect).
    pub fn new(config: SocketConfig, handlers: Handlers, connector: C, scheduler: S) -> Self {
        let budget = ReconnectBudget::new(config.reconnect_limit);
        Self {
            config,
            status: Status::Connecting,
            link: None,
            next_link: 0,
            budget,
            handlers,
            reconnect_timer: TimerSlot::default(),
            heartbeat_timer: TimerSlot::default(),
            grace_timer: TimerSlot::default(),
            connector,
            scheduler,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Reconnect attempts spent since the last successful open.
    pub fn reconnect_count(&self) -> u32 {
        self.budget.attempts()
    }

    pub fn has_transport(&self) -> bool {
        self.link.is_some()
    }

    pub fn heartbeat_enabled(&self) -> bool {
        self.config.ping_pong.is_some()
    }

    /// Replace or add callbacks.
    ///
    /// Callbacks registered after the controller is `CLOSED` are never invoked.
    pub fn handlers_mut(&mut self) -> &mut Handlers {
        &mut self.handlers
    }

    /// Open a transport unless one already exists.
    ///
    /// The heartbeat supervisor starts right away, before the link reports open.
    pub fn connect(&mut self) {
        if self.status.is_terminal() {
            tracing::debug!(url = %self.config.url, "connect ignored, socket is closed");
            return;
        }
        if self.link.is_some() {
            return;
        }

        self.reconnect_timer.cancel(&mut self.scheduler);
        self.status = Status::Connecting;

        self.next_link += 1;
        let id = LinkId(self.next_link);
        let transport = self.connector.open(&self.config.url, id);
        self.link = Some(ActiveLink { id, transport });
        tracing::info!(url = %self.config.url, link = %id, "opening socket");

        if self.heartbeat_enabled() {
            self.start_heartbeat();
        }
    }

    /// Write a payload to the current link. Nothing is queued.
    pub fn send(&mut self, payload: &str) -> Result<(), SocketError> {
        if self.status.is_terminal() {
            return Err(SocketError::Closed);
        }
        let link = self.link.as_mut().ok_or(SocketError::NotConnected)?;
        link.transport.send(payload)?;
        Ok(())
    }

    /// Dispatch an event from the link identified by `link`.
    ///
    /// Events from links that were already torn down are dropped.
    pub fn handle_transport_event(&mut self, link: LinkId, event: TransportEvent) {
        match self.link.as_ref() {
            Some(active) if active.id == link => {}
            _ => {
                tracing::trace!(link = %link, ?event, "dropping event from detached link");
                return;
            }
        }

        match event {
            TransportEvent::Open => self.on_open(link),
            TransportEvent::Message(payload) => self.on_message(payload),
            TransportEvent::Error(detail) => self.on_error(link, detail),
            TransportEvent::Close => self.on_close(link),
        }
    }

    /// Dispatch an elapsed timer.
    pub fn handle_timer(&mut self, timer: TimerId) {
        if self.reconnect_timer.fire(timer) {
            self.connect();
        } else if self.heartbeat_timer.fire(timer) {
            self.heartbeat_tick();
        } else if self.grace_timer.fire(timer) {
            tracing::warn!(
                grace_secs = self.config.heartbeat_grace.as_secs_f64(),
                "heartbeat timed out, reconnecting"
            );
            self.reconnect();
        } else {
            tracing::trace!(?timer, "ignoring stale timer");
        }
    }

    /// Start (or continue) a reconnect streak.
    ///
    /// Gives up for good once the attempt budget is spent.
    pub fn reconnect(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        if self.budget.is_exhausted() {
            tracing::error!(
                url = %self.config.url,
                attempts = self.budget.attempts(),
                limit = self.budget.limit(),
                "reconnect budget exhausted, giving up"
            );
            self.terminate();
            return;
        }

        if self.budget.is_streak_start() {
            self.handlers.reconnect();
        }
        let attempt = self.budget.advance();
        self.reset();

        self.reconnect_timer
            .arm(&mut self.scheduler, self.config.reconnect_delay);
        tracing::info!(
            attempt,
            limit = self.budget.limit(),
            delay_ms = u64::try_from(self.config.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling reconnect"
        );
    }

    /// Close for good. No-op if already closed.
    pub fn disconnect(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        tracing::info!(url = %self.config.url, "disconnect requested");
        self.terminate();
    }

    fn on_open(&mut self, link: LinkId) {
        self.status = Status::Open;
        let attempts = self.budget.attempts();
        self.budget.reset();
        match self.handlers.init.take() {
            Some(init) => {
                tracing::info!(link = %link, attempts, "socket open");
                if let Some(init) = init {
                    init();
                }
            }
            None => {
                tracing::info!(link = %link, attempts, "socket reconnected");
                self.handlers.reconnected();
            }
        }
    }

    fn on_message(&mut self, payload: String) {
        match self.classify(&payload) {
            Some(Heartbeat::Ping) => {
                tracing::debug!("ping received, answering");
                self.send_pong();
            }
            Some(Heartbeat::Pong) => {
                tracing::debug!("pong received");
                self.start_heartbeat();
            }
            None => self.handlers.data(payload),
        }
    }

    fn on_error(&mut self, link: LinkId, detail: Option<String>) {
        tracing::warn!(link = %link, error = ?detail, "socket error");
        self.handlers.error(detail);
    }

    fn on_close(&mut self, link: LinkId) {
        tracing::info!(link = %link, "socket closed");
        self.handlers.close();
        self.reconnect();
    }

    fn classify(&self, payload: &str) -> Option<Heartbeat> {
        let tokens = self.config.ping_pong.as_ref()?;
        if payload == tokens.ping {
            Some(Heartbeat::Ping)
        } else if payload == tokens.pong {
            Some(Heartbeat::Pong)
        } else {
            None
        }
    }

    /// (Re)start the probe cycle from "now". Cancels any pending probe and watcher.
    fn start_heartbeat(&mut self) {
        if !self.heartbeat_enabled() {
            return;
        }
        self.grace_timer.cancel(&mut self.scheduler);
        self.heartbeat_timer
            .arm(&mut self.scheduler, self.config.heartbeat_period);
    }

    fn heartbeat_tick(&mut self) {
        // An unanswered probe keeps its original deadline.
        if !self.grace_timer.is_armed() {
            self.grace_timer
                .arm(&mut self.scheduler, self.config.heartbeat_grace);
        }
        self.heartbeat_timer
            .arm(&mut self.scheduler, self.config.heartbeat_period);
        self.send_ping();
    }

    fn send_ping(&mut self) {
        let Some(ping) = self.config.ping_pong.as_ref().map(|t| t.ping.clone()) else {
            return;
        };
        if let Err(e) = self.send(&ping) {
            tracing::warn!(error = %e, "failed to send heartbeat ping");
        }
    }

    fn send_pong(&mut self) {
        let Some(pong) = self.config.ping_pong.as_ref().map(|t| t.pong.clone()) else {
            return;
        };
        if let Err(e) = self.send(&pong) {
            tracing::warn!(error = %e, "failed to answer heartbeat ping");
        }
    }

    /// Tear down the current link and heartbeat timers. Handlers are untouched.
    fn reset(&mut self) {
        if let Some(mut link) = self.link.take() {
            tracing::debug!(link = %link.id, "tearing down link");
            link.transport.close();
        }
        self.heartbeat_timer.cancel(&mut self.scheduler);
        self.grace_timer.cancel(&mut self.scheduler);
    }

    fn terminate(&mut self) {
        self.reset();
        self.reconnect_timer.cancel(&mut self.scheduler);
        self.status = Status::Closed;
        tracing::info!(url = %self.config.url, "socket closed for good");
        self.handlers.end();
        self.handlers.clear();
    }
}

impl<C, S> std::fmt::Debug for SocketController<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketController")
            .field("url", &self.config.url)
            .field("status", &self.status)
            .field("link", &self.link.as_ref().map(|l| l.id))
            .field("reconnect_count", &self.budget.attempts())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PingPong;
    use crate::error::TransportError;
    use crate::websocket::ports::MockTransport;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct LinkLog {
        opened: Vec<LinkId>,
        open: Vec<LinkId>,
        sent: Vec<(LinkId, String)>,
        closed: Vec<LinkId>,
    }

    struct FakeTransport {
        id: LinkId,
        log: Arc<Mutex<LinkLog>>,
    }

    impl Transport for FakeTransport {
        fn send(&mut self, payload: &str) -> Result<(), TransportError> {
            let mut log = self.log.lock().expect("log lock");
            if !log.open.contains(&self.id) {
                return Err(TransportError::NotOpen);
            }
            log.sent.push((self.id, payload.to_string()));
            Ok(())
        }

        fn close(&mut self) {
            self.log.lock().expect("log lock").closed.push(self.id);
        }
    }

    #[derive(Clone, Default)]
    struct FakeConnector {
        log: Arc<Mutex<LinkLog>>,
        scripted: Arc<Mutex<VecDeque<Box<dyn Transport>>>>,
    }

    impl FakeConnector {
        fn script(&self, transport: Box<dyn Transport>) {
            self.scripted.lock().expect("script lock").push_back(transport);
        }

        fn opened(&self) -> Vec<LinkId> {
            self.log.lock().expect("log lock").opened.clone()
        }

        fn sent(&self) -> Vec<String> {
            let log = self.log.lock().expect("log lock");
            log.sent.iter().map(|(_, p)| p.clone()).collect()
        }

        fn closed(&self) -> Vec<LinkId> {
            self.log.lock().expect("log lock").closed.clone()
        }

        /// Let sends through on `link`, as a real socket would after its handshake.
        fn mark_open(&self, link: LinkId) {
            self.log.lock().expect("log lock").open.push(link);
        }
    }

    impl Connector for FakeConnector {
        fn open(&mut self, _url: &str, link: LinkId) -> Box<dyn Transport> {
            self.log.lock().expect("log lock").opened.push(link);
            if let Some(t) = self.scripted.lock().expect("script lock").pop_front() {
                return t;
            }
            Box::new(FakeTransport {
                id: link,
                log: Arc::clone(&self.log),
            })
        }
    }

    #[derive(Default)]
    struct Clock {
        now: Duration,
        next: u64,
        armed: BTreeMap<TimerId, Duration>,
    }

    /// Virtual-time scheduler; the test advances time explicitly.
    #[derive(Clone, Default)]
    struct ManualScheduler {
        clock: Arc<Mutex<Clock>>,
    }

    impl ManualScheduler {
        fn pending(&self) -> usize {
            self.clock.lock().expect("clock lock").armed.len()
        }

        /// Pop the earliest timer due by `until`, moving the clock to its deadline.
        fn pop_due(&self, until: Duration) -> Option<TimerId> {
            let mut clock = self.clock.lock().expect("clock lock");
            let (id, at) = clock
                .armed
                .iter()
                .filter(|(_, at)| **at <= until)
                .min_by_key(|(id, at)| (**at, **id))
                .map(|(id, at)| (*id, *at))?;
            clock.armed.remove(&id);
            clock.now = at;
            Some(id)
        }

        fn now(&self) -> Duration {
            self.clock.lock().expect("clock lock").now
        }

        fn set_now(&self, now: Duration) {
            self.clock.lock().expect("clock lock").now = now;
        }
    }

    impl Scheduler for ManualScheduler {
        fn arm(&mut self, after: Duration) -> TimerId {
            let mut clock = self.clock.lock().expect("clock lock");
            clock.next += 1;
            let id = TimerId(clock.next);
            let at = clock.now + after;
            clock.armed.insert(id, at);
            id
        }

        fn cancel(&mut self, timer: TimerId) {
            self.clock.lock().expect("clock lock").armed.remove(&timer);
        }
    }

    /// Records every callback as a short tag.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn push(&self, tag: impl Into<String>) {
            self.0.lock().expect("recorder lock").push(tag.into());
        }

        fn count(&self, tag: &str) -> usize {
            self.0
                .lock()
                .expect("recorder lock")
                .iter()
                .filter(|t| *t == tag)
                .count()
        }

        fn all(&self) -> Vec<String> {
            self.0.lock().expect("recorder lock").clone()
        }

        fn handlers(&self) -> Handlers {
            let (a, b, c, d, e, f, g) = (
                self.clone(),
                self.clone(),
                self.clone(),
                self.clone(),
                self.clone(),
                self.clone(),
                self.clone(),
            );
            Handlers::new()
                .on_init(move || a.push("init"))
                .on_data(move |msg| b.push(format!("data:{msg}")))
                .on_error(move |_| c.push("error"))
                .on_close(move || d.push("close"))
                .on_reconnect(move || e.push("reconnect"))
                .on_reconnected(move || f.push("reconnected"))
                .on_end(move || g.push("end"))
        }
    }

    struct Harness {
        controller: SocketController<FakeConnector, ManualScheduler>,
        connector: FakeConnector,
        scheduler: ManualScheduler,
        events: Recorder,
    }

    impl Harness {
        fn new(config: SocketConfig) -> Self {
            let connector = FakeConnector::default();
            let scheduler = ManualScheduler::default();
            let events = Recorder::default();
            let controller = SocketController::new(
                config,
                events.handlers(),
                connector.clone(),
                scheduler.clone(),
            );
            Self {
                controller,
                connector,
                scheduler,
                events,
            }
        }

        fn current_link(&self) -> LinkId {
            *self.connector.opened().last().expect("a link was opened")
        }

        fn open(&mut self) {
            let link = self.current_link();
            self.connector.mark_open(link);
            self.controller
                .handle_transport_event(link, TransportEvent::Open);
        }

        fn close(&mut self) {
            let link = self.current_link();
            self.controller
                .handle_transport_event(link, TransportEvent::Close);
        }

        /// A failed open: the socket reports an error then closes without opening.
        fn fail(&mut self) {
            let link = self.current_link();
            self.controller
                .handle_transport_event(link, TransportEvent::Error(Some("refused".into())));
            self.controller
                .handle_transport_event(link, TransportEvent::Close);
        }

        fn message(&mut self, payload: &str) {
            let link = self.current_link();
            self.controller
                .handle_transport_event(link, TransportEvent::Message(payload.to_string()));
        }

        /// Advance virtual time, firing due timers in deadline order.
        fn advance(&mut self, by: Duration) {
            let until = self.scheduler.now() + by;
            while let Some(timer) = self.scheduler.pop_due(until) {
                self.controller.handle_timer(timer);
            }
            self.scheduler.set_now(until);
        }
    }

    fn config() -> SocketConfig {
        SocketConfig::new("ws://table.local/ws")
    }

    fn heartbeat_config() -> SocketConfig {
        config().with_ping_pong(PingPong::new("ping", "pong"))
    }

    const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

    // -------------------------------------------------------------------------
    // Connection lifecycle
    // -------------------------------------------------------------------------

    #[test]
    fn connect_is_idempotent_while_a_link_exists() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.controller.connect();

        assert_eq!(h.connector.opened().len(), 1);
        assert_eq!(h.controller.status(), Status::Connecting);
        assert!(h.controller.has_transport());
    }

    #[test]
    fn open_fires_init_and_sets_status() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();

        assert_eq!(h.controller.status(), Status::Open);
        assert_eq!(h.events.all(), vec!["init"]);
    }

    #[test]
    fn init_fires_once_across_reconnects() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();

        for _ in 0..3 {
            h.close();
            h.advance(RECONNECT_DELAY);
            h.open();
        }

        assert_eq!(h.events.count("init"), 1);
        assert_eq!(h.events.count("reconnected"), 3);
    }

    #[test]
    fn first_open_without_init_callback_is_not_a_reconnect() {
        let connector = FakeConnector::default();
        let events = Recorder::default();
        let rec = events.clone();
        let handlers = Handlers::new().on_reconnected(move || rec.push("reconnected"));
        let mut controller = SocketController::new(
            config(),
            handlers,
            connector.clone(),
            ManualScheduler::default(),
        );

        controller.connect();
        controller.handle_transport_event(LinkId(1), TransportEvent::Open);

        assert!(events.all().is_empty());
        assert_eq!(controller.status(), Status::Open);
    }

    #[test]
    fn send_without_link_fails_and_is_not_queued() {
        let mut h = Harness::new(config());
        assert_eq!(h.controller.send("shoot"), Err(SocketError::NotConnected));

        h.controller.connect();
        h.open();
        h.close();

        assert_eq!(h.controller.send("shoot"), Err(SocketError::NotConnected));
        h.advance(RECONNECT_DELAY);
        h.open();
        assert!(h.connector.sent().is_empty());
    }

    #[test]
    fn send_before_open_surfaces_transport_error() {
        let mut h = Harness::new(config());
        h.controller.connect();

        assert_eq!(
            h.controller.send("shoot"),
            Err(SocketError::Transport(TransportError::NotOpen))
        );
    }

    #[test]
    fn send_writes_to_current_link() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();

        h.controller.send("{\"cmd\":\"shoot\"}").expect("send");
        assert_eq!(h.connector.sent(), vec!["{\"cmd\":\"shoot\"}"]);
    }

    #[test]
    fn error_alone_does_not_reconnect() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();

        let link = h.current_link();
        h.controller
            .handle_transport_event(link, TransportEvent::Error(None));

        assert_eq!(h.events.count("error"), 1);
        assert_eq!(h.events.count("reconnect"), 0);
        assert!(h.controller.has_transport());
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[test]
    fn events_from_detached_links_are_ignored() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();
        let old = h.current_link();
        h.close();

        h.controller
            .handle_transport_event(old, TransportEvent::Message("late".into()));
        h.controller
            .handle_transport_event(old, TransportEvent::Close);

        assert_eq!(h.events.count("data:late"), 0);
        assert_eq!(h.events.count("close"), 1);
        assert_eq!(h.controller.reconnect_count(), 1);
    }

    // -------------------------------------------------------------------------
    // Reconnection
    // -------------------------------------------------------------------------

    #[test]
    fn close_tears_down_and_schedules_reconnect() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();
        let first = h.current_link();
        h.close();

        assert!(!h.controller.has_transport());
        assert_eq!(h.connector.closed(), vec![first]);
        assert_eq!(h.controller.reconnect_count(), 1);
        assert_eq!(h.events.all(), vec!["init", "close", "reconnect"]);

        h.advance(Duration::from_millis(1999));
        assert_eq!(h.connector.opened().len(), 1);
        h.advance(Duration::from_millis(1));
        assert_eq!(h.connector.opened().len(), 2);
        assert_eq!(h.controller.status(), Status::Connecting);
    }

    #[test]
    fn streak_reports_reconnect_once_and_resets_count() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();
        h.close();

        for _ in 0..2 {
            h.advance(RECONNECT_DELAY);
            h.fail();
        }
        h.advance(RECONNECT_DELAY);
        h.open();

        assert_eq!(h.events.count("reconnect"), 1);
        assert_eq!(h.events.count("reconnected"), 1);
        assert_eq!(h.controller.reconnect_count(), 0);
        assert_eq!(h.controller.status(), Status::Open);
    }

    #[test]
    fn single_attempt_limit_scenario() {
        let mut h = Harness::new(config().with_reconnect_limit(1));
        h.controller.connect();
        h.open();
        h.close();
        h.advance(RECONNECT_DELAY);
        h.close();
        h.advance(RECONNECT_DELAY);
        h.open();

        assert_eq!(h.events.count("reconnect"), 1);
        assert_eq!(h.events.count("close"), 2);
        assert_eq!(h.events.count("reconnected"), 1);
        assert_eq!(h.controller.status(), Status::Open);
        assert_eq!(h.controller.reconnect_count(), 0);
    }

    #[test]
    fn first_open_after_failed_attempts_starts_fresh_streak() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.fail();
        h.advance(RECONNECT_DELAY);
        h.fail();
        h.advance(RECONNECT_DELAY);
        h.open();

        assert_eq!(h.controller.reconnect_count(), 0);
        assert_eq!(h.events.count("init"), 1);
        assert_eq!(h.events.count("reconnected"), 0);

        h.close();
        assert_eq!(h.controller.reconnect_count(), 1);
        assert_eq!(h.events.count("reconnect"), 2);
    }

    #[test]
    fn reconnect_delay_beyond_u64_millis_still_schedules() {
        let delay = Duration::from_secs(u64::MAX / 1000 + 1);
        assert!(delay.as_millis() > u128::from(u64::MAX));

        let mut h = Harness::new(config().with_reconnect_delay(delay));
        h.controller.connect();
        h.open();
        h.close();

        assert_eq!(h.controller.reconnect_count(), 1);
        assert_eq!(h.events.count("reconnect"), 1);
        h.advance(RECONNECT_DELAY);
        assert_eq!(h.connector.opened().len(), 1);
    }

    #[test]
    fn exhausted_budget_ends_the_socket() {
        let mut h = Harness::new(config().with_reconnect_limit(1));
        h.controller.connect();
        h.fail();
        h.advance(RECONNECT_DELAY);
        h.fail();
        h.advance(RECONNECT_DELAY);
        h.fail();

        assert_eq!(h.controller.status(), Status::Closed);
        assert_eq!(h.events.count("end"), 1);
        assert_eq!(h.events.count("reconnect"), 1);
        assert!(h.controller.reconnect_count() <= 2);
        assert!(!h.controller.has_transport());
        assert_eq!(h.scheduler.pending(), 0);

        // Inert afterwards.
        h.controller.connect();
        h.controller.reconnect();
        h.advance(Duration::from_secs(60));
        assert_eq!(h.connector.opened().len(), 3);
        assert_eq!(h.controller.send("shoot"), Err(SocketError::Closed));
        assert_eq!(h.events.count("end"), 1);
    }

    #[test]
    fn default_budget_allows_limit_plus_one_attempts() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.fail();
        for _ in 0..4 {
            h.advance(RECONNECT_DELAY);
            assert_eq!(h.controller.status(), Status::Connecting);
            h.fail();
        }

        assert_eq!(h.connector.opened().len(), 5);
        assert_eq!(h.controller.status(), Status::Closed);
        assert_eq!(h.events.count("end"), 1);
    }

    #[test]
    fn rescheduling_keeps_only_latest_reconnect_timer() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();
        h.close();
        h.advance(Duration::from_millis(1000));
        h.controller.reconnect();

        assert_eq!(h.scheduler.pending(), 1);
        h.advance(Duration::from_millis(1000));
        assert_eq!(h.connector.opened().len(), 1, "first timer was replaced");
        h.advance(Duration::from_millis(1000));
        assert_eq!(h.connector.opened().len(), 2);
    }

    #[test]
    fn manual_connect_during_delay_cancels_pending_attempt() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();
        h.close();

        h.controller.connect();
        assert_eq!(h.connector.opened().len(), 2);
        assert_eq!(h.scheduler.pending(), 0);

        h.advance(RECONNECT_DELAY);
        assert_eq!(h.connector.opened().len(), 2);
    }

    #[test]
    fn status_is_stale_during_reconnect_delay() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();
        h.close();

        assert_eq!(h.controller.status(), Status::Open);
        h.advance(RECONNECT_DELAY);
        assert_eq!(h.controller.status(), Status::Connecting);
    }

    // -------------------------------------------------------------------------
    // Disconnect
    // -------------------------------------------------------------------------

    #[test]
    fn disconnect_twice_ends_once() {
        let mut h = Harness::new(heartbeat_config());
        h.controller.connect();
        h.open();

        h.controller.disconnect();
        h.controller.disconnect();

        assert_eq!(h.events.count("end"), 1);
        assert_eq!(h.controller.status(), Status::Closed);
        assert_eq!(h.scheduler.pending(), 0);
        assert_eq!(h.connector.closed().len(), 1);
    }

    #[test]
    fn disconnect_cancels_pending_reconnect() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();
        h.close();
        h.controller.disconnect();

        h.advance(Duration::from_secs(10));
        assert_eq!(h.connector.opened().len(), 1);
        assert_eq!(h.events.count("end"), 1);
    }

    #[test]
    fn disconnect_releases_handlers() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();
        h.controller.disconnect();

        let handlers = h.controller.handlers_mut();
        assert!(handlers.data.is_none());
        assert!(handlers.end.is_none());
        assert!(!handlers.init.is_pending());

        let late = h.events.clone();
        handlers.set_on_data(move |_| late.push("late-data"));
        let late = h.events.clone();
        handlers.set_on_end(move || late.push("late-end"));

        h.message("fish");
        h.controller.reconnect();
        h.controller.disconnect();
        h.advance(RECONNECT_DELAY);

        assert_eq!(h.events.count("late-data"), 0);
        assert_eq!(h.events.count("late-end"), 0);
    }

    // -------------------------------------------------------------------------
    // Messages and heartbeat
    // -------------------------------------------------------------------------

    #[test]
    fn payloads_pass_through_unmodified() {
        let mut h = Harness::new(heartbeat_config());
        h.controller.connect();
        h.open();

        h.message("{\"event\":\"hit\"}");
        h.message("  spaced  ");
        h.message("PING");

        assert_eq!(
            h.events.all(),
            vec![
                "init",
                "data:{\"event\":\"hit\"}",
                "data:  spaced  ",
                "data:PING"
            ]
        );
    }

    #[test]
    fn tokens_are_plain_data_without_heartbeat() {
        let mut h = Harness::new(config());
        h.controller.connect();
        h.open();

        h.message("ping");
        h.message("pong");

        assert_eq!(h.events.count("data:ping"), 1);
        assert_eq!(h.events.count("data:pong"), 1);
        assert!(h.connector.sent().is_empty());
        assert_eq!(h.scheduler.pending(), 0);
    }

    #[test]
    fn ping_is_answered_with_pong_and_swallowed() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|payload: &str| payload == "O")
            .times(1)
            .returning(|_| Ok(()));
        transport.expect_close().times(0);

        let mut h = Harness::new(config().with_ping_pong(PingPong::new("P", "O")));
        h.connector.script(Box::new(transport));
        h.controller.connect();
        h.open();
        h.message("P");

        assert_eq!(h.events.all(), vec!["init"]);
    }

    #[test]
    fn heartbeat_arms_at_connect_before_open() {
        let mut h = Harness::new(heartbeat_config());
        h.controller.connect();
        assert_eq!(h.scheduler.pending(), 1);

        // Probe against a link still handshaking: the send fails but the watcher arms.
        h.advance(Duration::from_secs(10));
        assert!(h.connector.sent().is_empty());
        assert_eq!(h.scheduler.pending(), 2);
    }

    #[test]
    fn probe_sends_ping_on_period() {
        let mut h = Harness::new(heartbeat_config());
        h.controller.connect();
        h.open();

        h.advance(Duration::from_secs(10));
        assert_eq!(h.connector.sent(), vec!["ping"]);
    }

    #[test]
    fn pong_restarts_supervisor_from_last_contact() {
        let mut h = Harness::new(heartbeat_config());
        h.controller.connect();
        h.open();

        h.advance(Duration::from_secs(10));
        h.advance(Duration::from_secs(2));
        h.message("pong");

        // Watcher cancelled, next probe 10s after the pong.
        assert_eq!(h.scheduler.pending(), 1);
        h.advance(Duration::from_secs(9));
        assert_eq!(h.connector.sent(), vec!["ping"]);
        h.advance(Duration::from_secs(1));
        assert_eq!(h.connector.sent(), vec!["ping", "ping"]);

        assert_eq!(h.events.count("reconnect"), 0);
        assert_eq!(h.events.count("data:pong"), 0);
    }

    #[test]
    fn missing_pong_triggers_one_reconnect_cycle() {
        let mut h = Harness::new(heartbeat_config());
        h.controller.connect();
        h.open();

        h.advance(Duration::from_secs(13) + Duration::from_millis(500));

        assert_eq!(h.events.count("reconnect"), 1);
        assert_eq!(h.events.count("close"), 0);
        assert_eq!(h.events.count("error"), 0);
        assert_eq!(h.controller.reconnect_count(), 1);
        assert!(!h.controller.has_transport());
        assert_eq!(h.scheduler.pending(), 1, "only the reconnect timer remains");
    }

    #[test]
    fn grace_watcher_is_never_duplicated() {
        let mut h = Harness::new(
            heartbeat_config()
                .with_heartbeat_timing(Duration::from_secs(1), Duration::from_secs(3)),
        );
        h.controller.connect();
        h.open();

        h.advance(Duration::from_secs(2));
        // period + watcher, never more
        assert_eq!(h.scheduler.pending(), 2);

        h.advance(Duration::from_secs(2));
        assert_eq!(h.events.count("reconnect"), 1);
    }

    #[test]
    fn heartbeat_restarts_with_new_link() {
        let mut h = Harness::new(heartbeat_config());
        h.controller.connect();
        h.open();
        h.close();
        assert_eq!(h.scheduler.pending(), 1);

        h.advance(RECONNECT_DELAY);
        h.open();
        h.advance(Duration::from_secs(10));
        assert_eq!(h.connector.sent(), vec!["ping"]);
    }
}
