//! Scheduling state machine for one subscribed resource.
//!
//! [`Machine`] is a plain value: it consumes [`Event`]s and answers with the
//! [`Effect`]s the driver must perform (start a fetch, arm or cancel the
//! poll timer, open or close the push channel). Nothing here sleeps or
//! spawns, so every transition can be tested without a runtime.
//!
//! Two counters keep concurrent fetches honest:
//!
//! - `epoch` identifies the current poll loop. `reconnect` bumps it, and a
//!   cycle or timer from an older epoch never re-arms the loop, so at most
//!   one loop runs per resource.
//! - every fetch carries a sequence number. A result older than the last one
//!   applied is discarded, so a slow response can never overwrite a newer
//!   one.

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::state::{ConnectionState, Phase};

/// How a resource receives updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Polling,
    Push,
}

/// Why a fetch was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchOrigin {
    /// Scheduled poll cycle belonging to `epoch`
    Cycle { epoch: u64 },
    /// `refetch()`
    Manual,
    /// Push message or initial push fetch
    Push,
}

/// Identifies one fetch from start to settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub seq: u64,
    pub origin: FetchOrigin,
}

/// Result of a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Succeeded(T),
    Failed(String),
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for FetchOutcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => FetchOutcome::Succeeded(data),
            Err(e) => FetchOutcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event<T> {
    Start { transport: Transport },
    TimerFired { epoch: u64 },
    FetchSettled {
        ticket: FetchTicket,
        outcome: FetchOutcome<T>,
        at: DateTime<Utc>,
    },
    VisibilityChanged { visible: bool },
    PushMessage,
    /// The push channel ended; fall back to polling.
    PushClosed,
    Refetch,
    Reconnect { transport: Transport },
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Fetch(FetchTicket),
    ArmTimer { epoch: u64, after: Duration },
    CancelTimer,
    OpenPush,
    ClosePush,
}

/// Output of one transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Step {
    pub effects: Vec<Effect>,
    /// The consumer-visible state changed
    pub publish: bool,
}

/// How a settled fetch was treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Succeeded,
    Failed,
    /// A newer result was already applied
    Superseded,
    /// Arrived after teardown
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Machine<T> {
    state: ConnectionState<T>,
    polling_interval: Duration,
    transport: Option<Transport>,
    visible: bool,
    epoch: u64,
    timer_armed: bool,
    cycle_in_flight: bool,
    in_flight: u32,
    next_seq: u64,
    last_applied_seq: u64,
    last_applied: Option<Applied>,
    torn_down: bool,
}

impl<T: Clone> Machine<T> {
    pub fn new(polling_interval: Duration, visible: bool) -> Self {
        Self {
            state: ConnectionState::default(),
            polling_interval,
            transport: None,
            visible,
            epoch: 0,
            timer_armed: false,
            cycle_in_flight: false,
            in_flight: 0,
            next_seq: 0,
            last_applied_seq: 0,
            last_applied: None,
            torn_down: false,
        }
    }

    pub fn state(&self) -> &ConnectionState<T> {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn transport(&self) -> Option<Transport> {
        self.transport
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn timer_armed(&self) -> bool {
        self.timer_armed
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// How the most recent settlement was treated.
    pub fn last_applied(&self) -> Option<Applied> {
        self.last_applied
    }

    pub fn handle(&mut self, event: Event<T>) -> Step {
        if self.torn_down {
            if let Event::FetchSettled { .. } = event {
                self.last_applied = Some(Applied::Ignored);
            }
            return Step::default();
        }

        let mut step = Step::default();
        match event {
            Event::Start { transport } => self.begin(transport, &mut step),
            Event::Reconnect { transport } => {
                if self.timer_armed {
                    self.timer_armed = false;
                    step.effects.push(Effect::CancelTimer);
                }
                if self.transport == Some(Transport::Push) {
                    step.effects.push(Effect::ClosePush);
                }
                self.epoch += 1;
                self.cycle_in_flight = false;
                self.state.retry_count = 0;
                self.begin(transport, &mut step);
            }
            Event::TimerFired { epoch } => {
                if epoch != self.epoch || !self.timer_armed {
                    return step;
                }
                self.timer_armed = false;
                if self.transport == Some(Transport::Polling) && self.visible {
                    self.start_cycle(&mut step);
                }
            }
            Event::FetchSettled {
                ticket,
                outcome,
                at,
            } => self.settle(ticket, outcome, at, &mut step),
            Event::VisibilityChanged { visible } => {
                self.visible = visible;
                if !visible {
                    if self.timer_armed {
                        self.timer_armed = false;
                        step.effects.push(Effect::CancelTimer);
                    }
                } else if self.transport == Some(Transport::Polling)
                    && !self.timer_armed
                    && !self.cycle_in_flight
                {
                    self.arm_timer(&mut step);
                }
            }
            Event::PushMessage => {
                if self.transport == Some(Transport::Push) {
                    self.start_fetch(FetchOrigin::Push, &mut step);
                }
            }
            Event::PushClosed => {
                if self.transport == Some(Transport::Push) {
                    self.transport = Some(Transport::Polling);
                    if self.visible && !self.cycle_in_flight {
                        self.arm_timer(&mut step);
                    }
                }
            }
            Event::Refetch => self.start_fetch(FetchOrigin::Manual, &mut step),
            Event::Teardown => {
                self.torn_down = true;
                if self.timer_armed {
                    self.timer_armed = false;
                    step.effects.push(Effect::CancelTimer);
                }
                if self.transport == Some(Transport::Push) {
                    step.effects.push(Effect::ClosePush);
                }
                self.state.phase = Phase::Disconnected;
                self.state.is_connected = false;
            }
        }
        step
    }

    fn begin(&mut self, transport: Transport, step: &mut Step) {
        self.transport = Some(transport);
        self.state.phase = Phase::Connecting;
        self.state.is_connected = false;
        step.publish = true;
        match transport {
            Transport::Push => {
                step.effects.push(Effect::OpenPush);
                self.start_fetch(FetchOrigin::Push, step);
            }
            Transport::Polling => self.start_cycle(step),
        }
    }

    fn start_cycle(&mut self, step: &mut Step) {
        self.cycle_in_flight = true;
        self.start_fetch(FetchOrigin::Cycle { epoch: self.epoch }, step);
    }

    fn start_fetch(&mut self, origin: FetchOrigin, step: &mut Step) {
        self.next_seq += 1;
        self.in_flight += 1;
        if !self.state.is_loading {
            self.state.is_loading = true;
            step.publish = true;
        }
        step.effects.push(Effect::Fetch(FetchTicket {
            seq: self.next_seq,
            origin,
        }));
    }

    fn arm_timer(&mut self, step: &mut Step) {
        self.timer_armed = true;
        step.effects.push(Effect::ArmTimer {
            epoch: self.epoch,
            after: self.polling_interval,
        });
    }

    fn settle(
        &mut self,
        ticket: FetchTicket,
        outcome: FetchOutcome<T>,
        at: DateTime<Utc>,
        step: &mut Step,
    ) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let loading = self.in_flight > 0;
        if self.state.is_loading != loading {
            self.state.is_loading = loading;
            step.publish = true;
        }

        if ticket.seq < self.last_applied_seq {
            self.last_applied = Some(Applied::Superseded);
        } else {
            self.last_applied_seq = ticket.seq;
            step.publish = true;
            match outcome {
                FetchOutcome::Succeeded(data) => {
                    self.state.data = Some(data);
                    self.state.error = None;
                    self.state.last_update = Some(at);
                    self.state.retry_count = 0;
                    self.state.phase = Phase::Connected;
                    self.state.is_connected = true;
                    self.last_applied = Some(Applied::Succeeded);
                }
                FetchOutcome::Failed(message) => {
                    self.state.error = Some(message);
                    self.state.retry_count = self.state.retry_count.saturating_add(1);
                    self.state.phase = Phase::Degraded;
                    self.state.is_connected = false;
                    self.last_applied = Some(Applied::Failed);
                }
            }
        }

        if let FetchOrigin::Cycle { epoch } = ticket.origin {
            if epoch == self.epoch {
                self.cycle_in_flight = false;
                if self.transport == Some(Transport::Polling) && self.visible {
                    self.arm_timer(step);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const INTERVAL: Duration = Duration::from_secs(3);

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn fetches(step: &Step) -> Vec<FetchTicket> {
        step.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Fetch(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    fn settle(m: &mut Machine<u32>, ticket: FetchTicket, outcome: FetchOutcome<u32>) -> Step {
        m.handle(Event::FetchSettled {
            ticket,
            outcome,
            at: at(),
        })
    }

    fn started() -> (Machine<u32>, FetchTicket) {
        let mut m = Machine::new(INTERVAL, true);
        let step = m.handle(Event::Start {
            transport: Transport::Polling,
        });
        let ticket = fetches(&step)[0];
        (m, ticket)
    }

    #[test]
    fn test_start_fetches_once_without_timer() {
        let mut m: Machine<u32> = Machine::new(INTERVAL, true);
        let step = m.handle(Event::Start {
            transport: Transport::Polling,
        });
        assert_eq!(
            step.effects,
            vec![Effect::Fetch(FetchTicket {
                seq: 1,
                origin: FetchOrigin::Cycle { epoch: 0 }
            })]
        );
        assert!(step.publish);
        assert_eq!(m.phase(), Phase::Connecting);
        assert!(m.state().is_loading);
        assert!(!m.timer_armed());
    }

    #[test]
    fn test_success_connects_and_arms_timer() {
        let (mut m, ticket) = started();
        let step = settle(&mut m, ticket, FetchOutcome::Succeeded(7));

        assert_eq!(
            step.effects,
            vec![Effect::ArmTimer {
                epoch: 0,
                after: INTERVAL
            }]
        );
        let state = m.state();
        assert_eq!(state.data, Some(7));
        assert!(state.error.is_none());
        assert!(state.is_connected);
        assert!(!state.is_loading);
        assert_eq!(state.last_update, Some(at()));
        assert_eq!(state.phase, Phase::Connected);
    }

    #[test]
    fn test_failure_keeps_data_and_counts_retries() {
        let (mut m, ticket) = started();
        settle(&mut m, ticket, FetchOutcome::Succeeded(1));

        let step = m.handle(Event::TimerFired { epoch: 0 });
        let second = fetches(&step)[0];
        settle(&mut m, second, FetchOutcome::Failed("HTTP 500".to_string()));

        let state = m.state();
        assert_eq!(state.data, Some(1));
        assert_eq!(state.error.as_deref(), Some("HTTP 500"));
        assert!(!state.is_connected);
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.phase, Phase::Degraded);
        assert!(m.timer_armed());

        let step = m.handle(Event::TimerFired { epoch: 0 });
        settle(&mut m, fetches(&step)[0], FetchOutcome::Succeeded(2));
        assert_eq!(m.state().retry_count, 0);
        assert_eq!(m.phase(), Phase::Connected);
    }

    #[test]
    fn test_reconnect_cancels_timer_and_fetches() {
        let (mut m, ticket) = started();
        settle(&mut m, ticket, FetchOutcome::Failed("down".to_string()));
        assert_eq!(m.state().retry_count, 1);
        assert!(m.timer_armed());

        let step = m.handle(Event::Reconnect {
            transport: Transport::Polling,
        });
        assert_eq!(step.effects[0], Effect::CancelTimer);
        let tickets = fetches(&step);
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].origin, FetchOrigin::Cycle { epoch: 1 });
        assert_eq!(m.state().retry_count, 0);
        assert_eq!(m.phase(), Phase::Connecting);
        assert!(!m.timer_armed());
    }

    #[test]
    fn test_stale_epoch_does_not_rearm() {
        let (mut m, ticket) = started();
        m.handle(Event::Reconnect {
            transport: Transport::Polling,
        });
        let step = settle(&mut m, ticket, FetchOutcome::Succeeded(1));
        assert!(step.effects.is_empty());
        assert!(!m.timer_armed());

        let step = m.handle(Event::TimerFired { epoch: 0 });
        assert!(step.effects.is_empty());
    }

    #[test]
    fn test_out_of_order_settle_discarded() {
        let (mut m, cycle) = started();
        let step = m.handle(Event::Refetch);
        let manual = fetches(&step)[0];
        assert_eq!(m.in_flight(), 2);

        settle(&mut m, manual, FetchOutcome::Succeeded(2));
        assert!(m.state().is_loading);
        let step = settle(&mut m, cycle, FetchOutcome::Succeeded(1));

        assert_eq!(m.last_applied(), Some(Applied::Superseded));
        assert_eq!(m.state().data, Some(2));
        assert!(!m.state().is_loading);
        assert!(step
            .effects
            .iter()
            .any(|e| matches!(e, Effect::ArmTimer { .. })));
    }

    #[test]
    fn test_manual_refetch_does_not_touch_cadence() {
        let (mut m, cycle) = started();
        settle(&mut m, cycle, FetchOutcome::Succeeded(1));
        let step = m.handle(Event::Refetch);
        let manual = fetches(&step)[0];
        assert_eq!(manual.origin, FetchOrigin::Manual);
        assert_eq!(step.effects.len(), 1);

        let step = settle(&mut m, manual, FetchOutcome::Succeeded(2));
        assert!(step.effects.is_empty());
        assert!(m.timer_armed());
    }

    #[test]
    fn test_hidden_then_visible_resumes_one_cycle() {
        let (mut m, cycle) = started();
        settle(&mut m, cycle, FetchOutcome::Succeeded(1));

        let step = m.handle(Event::VisibilityChanged { visible: false });
        assert_eq!(step.effects, vec![Effect::CancelTimer]);
        assert!(!step.publish);

        let step = m.handle(Event::VisibilityChanged { visible: true });
        assert_eq!(
            step.effects,
            vec![Effect::ArmTimer {
                epoch: 0,
                after: INTERVAL
            }]
        );

        let step = m.handle(Event::VisibilityChanged { visible: true });
        assert!(step.effects.is_empty());
    }

    #[test]
    fn test_hidden_during_flight_waits_for_visible() {
        let (mut m, cycle) = started();
        m.handle(Event::VisibilityChanged { visible: false });
        let step = settle(&mut m, cycle, FetchOutcome::Succeeded(1));
        assert!(step.effects.is_empty());
        assert_eq!(m.state().data, Some(1));

        let step = m.handle(Event::VisibilityChanged { visible: true });
        assert_eq!(step.effects.len(), 1);
        assert!(m.timer_armed());
    }

    #[test]
    fn test_visible_skips_while_cycle_in_flight() {
        let (mut m, _cycle) = started();
        m.handle(Event::VisibilityChanged { visible: false });
        let step = m.handle(Event::VisibilityChanged { visible: true });
        assert!(step.effects.is_empty());
    }

    #[test]
    fn test_teardown_ignores_late_settle() {
        let (mut m, cycle) = started();
        let step = m.handle(Event::Teardown);
        assert!(step.effects.is_empty());
        assert_eq!(m.phase(), Phase::Disconnected);

        let step = settle(&mut m, cycle, FetchOutcome::Succeeded(9));
        assert_eq!(step, Step::default());
        assert_eq!(m.last_applied(), Some(Applied::Ignored));
        assert!(m.state().data.is_none());
    }

    #[test]
    fn test_teardown_cancels_armed_timer() {
        let (mut m, cycle) = started();
        settle(&mut m, cycle, FetchOutcome::Succeeded(1));
        let step = m.handle(Event::Teardown);
        assert_eq!(step.effects, vec![Effect::CancelTimer]);
        assert!(m.is_torn_down());
    }

    #[test]
    fn test_push_transport_fetches_per_message() {
        let mut m: Machine<u32> = Machine::new(INTERVAL, true);
        let step = m.handle(Event::Start {
            transport: Transport::Push,
        });
        assert_eq!(step.effects[0], Effect::OpenPush);
        let first = fetches(&step)[0];
        assert_eq!(first.origin, FetchOrigin::Push);

        let step = settle(&mut m, first, FetchOutcome::Succeeded(1));
        assert!(step.effects.is_empty());

        let step = m.handle(Event::PushMessage);
        assert_eq!(fetches(&step).len(), 1);

        let step = m.handle(Event::VisibilityChanged { visible: true });
        assert!(step.effects.is_empty());
    }

    #[test]
    fn test_push_closed_falls_back_to_polling() {
        let mut m: Machine<u32> = Machine::new(INTERVAL, true);
        let step = m.handle(Event::Start {
            transport: Transport::Push,
        });
        settle(&mut m, fetches(&step)[0], FetchOutcome::Succeeded(1));

        let step = m.handle(Event::PushClosed);
        assert_eq!(m.transport(), Some(Transport::Polling));
        assert_eq!(
            step.effects,
            vec![Effect::ArmTimer {
                epoch: 0,
                after: INTERVAL
            }]
        );
        assert!(m.handle(Event::PushMessage).effects.is_empty());
    }

    #[test]
    fn test_reconnect_from_push_closes_channel() {
        let mut m: Machine<u32> = Machine::new(INTERVAL, true);
        m.handle(Event::Start {
            transport: Transport::Push,
        });
        let step = m.handle(Event::Reconnect {
            transport: Transport::Polling,
        });
        assert_eq!(step.effects[0], Effect::ClosePush);
        assert_eq!(m.transport(), Some(Transport::Polling));
    }
}
