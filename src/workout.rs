//! Workout state machine.
//!
//! `Positioning -> Countdown -> Active -> Completed`. Pose frames arrive
//! through [`WorkoutMachine::on_pose`] and time only moves through
//! [`WorkoutMachine::advance`], which fires the stability, countdown and
//! workout-tick timers from a single queue. Both inputs are expected on one
//! serialized context; nothing here is shared across threads.

use crate::counter::{ThresholdCounter, DEFAULT_ENTER_THRESHOLD, DEFAULT_EXIT_THRESHOLD};
use crate::format;
use crate::mode::{WorkoutConfiguration, WorkoutMode};
use crate::pose::{PoseFrameEvent, PoseStatus};
use crate::session::{WorkoutPhase, WorkoutResult, WorkoutSessionState};
use crate::timers::{TimerKind, TimerQueue};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const GET_INTO_POSITION: &str = "Get into position";
pub const STAND_IN_VIEW: &str = "Stand in view";
pub const SDK_ERROR: &str = "SDK error - please check your configuration";

/// Timer settings for one workout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub countdown_from: u32,
    pub stability_delay: Duration,
    pub countdown_interval: Duration,
    pub tick_interval: Duration,
    pub rep_enter_threshold: f64,
    pub rep_exit_threshold: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            countdown_from: 3,
            stability_delay: Duration::from_secs(1),
            countdown_interval: Duration::from_secs(1),
            tick_interval: Duration::from_millis(100),
            rep_enter_threshold: DEFAULT_ENTER_THRESHOLD,
            rep_exit_threshold: DEFAULT_EXIT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkoutMachine {
    config: WorkoutConfiguration,
    timing: Timing,
    state: WorkoutSessionState,
    counter: ThresholdCounter,
    timers: TimerQueue,
    cancelled: bool,
    /// completion latch: set once, never cleared
    result: Option<WorkoutResult>,
}

impl WorkoutMachine {
    pub fn new(config: WorkoutConfiguration, timing: Timing) -> Self {
        Self {
            state: WorkoutSessionState::new(&config, timing.countdown_from),
            counter: ThresholdCounter::new(timing.rep_enter_threshold, timing.rep_exit_threshold),
            timers: TimerQueue::new(),
            cancelled: false,
            result: None,
            config,
            timing,
        }
    }

    pub fn config(&self) -> &WorkoutConfiguration {
        &self.config
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn state(&self) -> &WorkoutSessionState {
        &self.state
    }

    pub fn phase(&self) -> WorkoutPhase {
        self.state.phase
    }

    pub fn feedback_text(&self) -> Option<&str> {
        self.state.feedback_text.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Completed or cancelled; no further input has any effect.
    pub fn is_finished(&self) -> bool {
        self.is_completed() || self.cancelled
    }

    pub fn result(&self) -> Option<WorkoutResult> {
        self.result
    }

    pub fn has_pending_timer(&self, kind: TimerKind) -> bool {
        self.timers.is_scheduled(kind)
    }

    /// Handle one normalized pose frame.
    pub fn on_pose(&mut self, event: &PoseFrameEvent) {
        if self.is_finished() {
            return;
        }

        match event.status {
            PoseStatus::PersonFound => {
                match self.state.phase {
                    WorkoutPhase::Active => {
                        if let Some(progress) = event.rep_progress {
                            self.state.rep_count = self.counter.count(progress);
                            if self.check_completion() {
                                return;
                            }
                            self.state.feedback_text = Some(self.progress_text());
                        }
                    }
                    WorkoutPhase::Positioning => {
                        if event.is_well_positioned() && !self.state.is_positioned {
                            self.state.is_positioned = true;
                            self.timers
                                .schedule_once(TimerKind::Stability, self.timing.stability_delay);
                            debug!("positioned, waiting for stability");
                        }
                    }
                    WorkoutPhase::Countdown | WorkoutPhase::Completed => {}
                }

                if let Some(text) = &event.required_feedback {
                    self.state.feedback_text = Some(text.clone());
                    if self.state.phase == WorkoutPhase::Positioning {
                        self.lose_position();
                    }
                } else if self.state.phase == WorkoutPhase::Positioning
                    && self.state.feedback_text.is_none()
                {
                    self.state.feedback_text = Some(GET_INTO_POSITION.to_string());
                }
            }
            PoseStatus::NoPersonFound => {
                if self.state.phase == WorkoutPhase::Positioning {
                    self.state.feedback_text = Some(STAND_IN_VIEW.to_string());
                    self.lose_position();
                }
            }
            PoseStatus::SdkError => {
                warn!(phase = %self.state.phase, "pose capability reported an error");
                self.state.feedback_text = Some(SDK_ERROR.to_string());
            }
        }
    }

    /// Move the logical clock forward and fire every timer that became due.
    pub fn advance(&mut self, dt: Duration) {
        if self.is_finished() {
            return;
        }
        self.timers.advance(dt);
        while let Some(kind) = self.timers.pop_due() {
            self.on_timer(kind);
            if self.is_finished() {
                break;
            }
        }
    }

    /// End an active workout early, keeping what was reached so far.
    /// Outside the active phase this only reports an existing result.
    pub fn finish(&mut self) -> Option<WorkoutResult> {
        if !self.cancelled && self.state.phase == WorkoutPhase::Active {
            self.complete();
        }
        self.result
    }

    /// Abandon the attempt. Halts every timer; later input is ignored.
    /// Has no effect once the workout has completed.
    pub fn cancel(&mut self) {
        if self.is_finished() {
            return;
        }
        self.cancelled = true;
        self.timers.cancel_all();
        info!(phase = %self.state.phase, "workout cancelled");
    }

    /// Complete the workout if its target is met. Safe to call from any
    /// path; only the first satisfying call takes effect.
    pub fn check_completion(&mut self) -> bool {
        if self.is_completed() {
            return true;
        }
        if self.cancelled || self.state.phase != WorkoutPhase::Active {
            return false;
        }
        let done = match self.config.mode {
            WorkoutMode::Reps => self.state.rep_count >= self.config.target_value,
            WorkoutMode::Time => self.state.remaining.is_some_and(|r| r.is_zero()),
        };
        if done {
            self.complete();
        }
        done
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Stability => {
                if self.state.phase == WorkoutPhase::Positioning && self.state.is_positioned {
                    self.start_countdown();
                }
            }
            TimerKind::Countdown => {
                if self.state.phase == WorkoutPhase::Countdown {
                    self.state.countdown_value = self.state.countdown_value.saturating_sub(1);
                    debug!(value = self.state.countdown_value, "countdown");
                    if self.state.countdown_value == 0 {
                        self.timers.cancel(TimerKind::Countdown);
                        self.start_active();
                    }
                }
            }
            TimerKind::WorkoutTick => {
                if self.state.phase == WorkoutPhase::Active {
                    let tick = self.timing.tick_interval;
                    self.state.elapsed += tick;
                    if let Some(remaining) = self.state.remaining {
                        self.state.remaining = Some(remaining.saturating_sub(tick));
                    }
                    if !self.check_completion() {
                        self.state.feedback_text = Some(self.progress_text());
                    }
                }
            }
        }
    }

    fn lose_position(&mut self) {
        self.state.is_positioned = false;
        self.timers.cancel(TimerKind::Stability);
    }

    fn start_countdown(&mut self) {
        self.timers.cancel(TimerKind::Stability);
        self.state.phase = WorkoutPhase::Countdown;
        self.state.countdown_value = self.timing.countdown_from;
        self.state.feedback_text = None;
        info!(from = self.timing.countdown_from, "countdown started");
        if self.timing.countdown_from == 0 {
            self.start_active();
        } else {
            self.timers
                .schedule_repeating(TimerKind::Countdown, self.timing.countdown_interval);
        }
    }

    fn start_active(&mut self) {
        self.state.phase = WorkoutPhase::Active;
        self.state.rep_count = 0;
        self.state.elapsed = Duration::ZERO;
        if self.config.mode == WorkoutMode::Time {
            self.state.remaining = Some(Duration::from_secs(self.config.target_value as u64));
        }
        self.counter.reset();
        self.timers
            .schedule_repeating(TimerKind::WorkoutTick, self.timing.tick_interval);
        self.state.feedback_text = Some(self.progress_text());
        info!(mode = %self.config.mode, target = self.config.target_value, "workout active");
    }

    fn complete(&mut self) {
        if self.result.is_some() {
            return;
        }
        self.timers.cancel_all();
        self.state.phase = WorkoutPhase::Completed;
        let result = WorkoutResult {
            config: self.config,
            completed_reps: self.state.rep_count,
            duration: self.state.elapsed,
        };
        self.result = Some(result);
        info!(
            reps = result.completed_reps,
            secs = result.duration_secs(),
            "workout completed"
        );
    }

    fn progress_text(&self) -> String {
        match self.config.mode {
            WorkoutMode::Reps => format!(
                "{} / {} reps",
                self.state.rep_count, self.config.target_value
            ),
            WorkoutMode::Time => format!(
                "{} reps\n{}",
                self.state.rep_count,
                format::clock(self.state.remaining.unwrap_or_default())
            ),
        }
    }
}
