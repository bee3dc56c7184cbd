use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Result;
use crate::pose::{PoseAdapter, PoseCapability, PoseFrameEvent};
use crate::session::WorkoutResult;
use crate::workout::WorkoutMachine;

/// Unified event type consumed by the workout loop
#[derive(Clone, Debug, PartialEq)]
pub enum WorkoutEvent {
    Pose(PoseFrameEvent),
    /// user ended the workout; keeps the result when active
    Finish,
    /// user left the workout; nothing is kept
    Cancel,
    Tick,
}

/// Source of workout events (pose frames, user requests)
pub trait WorkoutEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<WorkoutEvent, RecvTimeoutError>;
}

/// Event source backed by an mpsc channel
pub struct ChannelEventSource {
    rx: Receiver<WorkoutEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<WorkoutEvent>) -> Self {
        Self { rx }
    }

    /// A fresh channel and the source reading from it
    pub fn channel() -> (Sender<WorkoutEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }
}

impl WorkoutEventSource for ChannelEventSource {
    fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<WorkoutEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
        }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that serializes events and ticks into one stream.
///
/// Ticks are scheduled against a deadline, so a steady stream of events
/// cannot starve them.
pub struct Runner<E: WorkoutEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    next_tick: Instant,
}

impl<E: WorkoutEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let next_tick = Instant::now() + ticker.interval();
        Self {
            event_source,
            ticker,
            next_tick,
        }
    }

    pub fn interval(&self) -> Duration {
        self.ticker.interval()
    }

    /// Blocks until the next event or tick deadline and returns it
    pub fn step(&mut self) -> WorkoutEvent {
        let now = Instant::now();
        if now >= self.next_tick {
            return self.tick(now);
        }
        match self.event_source.recv_timeout(self.next_tick - now) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => self.tick(Instant::now()),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(self.next_tick.saturating_duration_since(Instant::now()));
                self.tick(Instant::now())
            }
        }
    }

    fn tick(&mut self, now: Instant) -> WorkoutEvent {
        self.next_tick += self.ticker.interval();
        // after a long stall, resume pacing from now rather than bursting
        if self.next_tick + self.ticker.interval() < now {
            self.next_tick = now + self.ticker.interval();
        }
        WorkoutEvent::Tick
    }
}

/// Handle for requesting that a running workout ends
#[derive(Clone, Debug)]
pub struct WorkoutHandle {
    tx: Sender<WorkoutEvent>,
}

impl WorkoutHandle {
    pub fn finish(&self) {
        let _ = self.tx.send(WorkoutEvent::Finish);
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(WorkoutEvent::Cancel);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkoutOutcome {
    Completed(WorkoutResult),
    Cancelled,
}

/// Drives one workout attempt: owns the machine, the pose subscription and
/// the event loop. The subscription is released when the workout completes,
/// is cancelled, or the driver is dropped.
pub struct WorkoutDriver<C: PoseCapability> {
    machine: WorkoutMachine,
    adapter: PoseAdapter<C>,
    tx: Sender<WorkoutEvent>,
    runner: Runner<ChannelEventSource, FixedTicker>,
}

impl<C: PoseCapability> WorkoutDriver<C> {
    /// Driver paced in real time by the machine's tick interval.
    pub fn new(machine: WorkoutMachine, capability: C) -> Self {
        let ticker = FixedTicker::new(machine.timing().tick_interval);
        Self::with_ticker(machine, capability, ticker)
    }

    /// Driver paced by `ticker`. Each tick still advances the machine by its
    /// own tick interval, so a faster ticker replays a workout faster.
    pub fn with_ticker(machine: WorkoutMachine, capability: C, ticker: FixedTicker) -> Self {
        let (tx, source) = ChannelEventSource::channel();
        Self {
            machine,
            adapter: PoseAdapter::new(capability),
            tx,
            runner: Runner::new(source, ticker),
        }
    }

    pub fn handle(&self) -> WorkoutHandle {
        WorkoutHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn machine(&self) -> &WorkoutMachine {
        &self.machine
    }

    pub fn adapter(&self) -> &PoseAdapter<C> {
        &self.adapter
    }

    /// Acquire the pose subscription; frames are queued onto the loop.
    pub fn start(&mut self) -> Result<()> {
        let tx = self.tx.clone();
        self.adapter
            .start(move |ev| tx.send(WorkoutEvent::Pose(ev)).is_ok())
    }

    /// Process one event. Returns `false` once the workout is over.
    pub fn step(&mut self) -> bool {
        if self.machine.is_finished() {
            self.adapter.stop();
            return false;
        }
        match self.runner.step() {
            WorkoutEvent::Tick => self.machine.advance(self.machine.timing().tick_interval),
            WorkoutEvent::Pose(ev) => self.machine.on_pose(&ev),
            WorkoutEvent::Finish => {
                if self.machine.finish().is_none() {
                    self.machine.cancel();
                }
            }
            WorkoutEvent::Cancel => self.machine.cancel(),
        }
        if self.machine.is_finished() {
            debug!(phase = %self.machine.phase(), "workout finished, releasing pose subscription");
            self.adapter.stop();
            return false;
        }
        true
    }

    /// Start the subscription and loop until the workout ends. `observe` sees
    /// the machine after every processed event.
    pub fn run<F>(&mut self, mut observe: F) -> Result<WorkoutOutcome>
    where
        F: FnMut(&WorkoutMachine),
    {
        self.start()?;
        while self.step() {
            observe(&self.machine);
        }
        observe(&self.machine);
        Ok(self.outcome())
    }

    pub fn outcome(&self) -> WorkoutOutcome {
        match self.machine.result() {
            Some(result) => WorkoutOutcome::Completed(result),
            None => WorkoutOutcome::Cancelled,
        }
    }
}
