use crate::mode::{WorkoutConfiguration, WorkoutMode};
use std::time::Duration;

/// Stage of a workout attempt. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::Display)]
pub enum WorkoutPhase {
    Positioning,
    Countdown,
    Active,
    Completed,
}

/// Mutable state of one attempt, owned by the state machine
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutSessionState {
    pub phase: WorkoutPhase,
    pub countdown_value: u32,
    pub rep_count: u32,
    pub elapsed: Duration,
    /// only tracked in time mode
    pub remaining: Option<Duration>,
    pub is_positioned: bool,
    pub feedback_text: Option<String>,
}

impl WorkoutSessionState {
    pub fn new(config: &WorkoutConfiguration, countdown_from: u32) -> Self {
        Self {
            phase: WorkoutPhase::Positioning,
            countdown_value: countdown_from,
            rep_count: 0,
            elapsed: Duration::ZERO,
            remaining: match config.mode {
                WorkoutMode::Time => Some(Duration::from_secs(config.target_value as u64)),
                WorkoutMode::Reps => None,
            },
            is_positioned: false,
            feedback_text: None,
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn remaining_secs(&self) -> Option<f64> {
        self.remaining.map(|r| r.as_secs_f64())
    }
}

/// Frozen outcome of a completed attempt; input to the summary step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkoutResult {
    pub config: WorkoutConfiguration,
    pub completed_reps: u32,
    pub duration: Duration,
}

impl WorkoutResult {
    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    /// Whether the configured target was reached rather than ended early.
    pub fn reached_target(&self) -> bool {
        match self.config.mode {
            WorkoutMode::Reps => self.completed_reps >= self.config.target_value,
            WorkoutMode::Time => {
                self.duration >= Duration::from_secs(self.config.target_value as u64)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_for_reps_mode() {
        let state = WorkoutSessionState::new(&WorkoutConfiguration::reps(20), 3);
        assert_eq!(state.phase, WorkoutPhase::Positioning);
        assert_eq!(state.countdown_value, 3);
        assert_eq!(state.rep_count, 0);
        assert_eq!(state.remaining, None);
        assert!(!state.is_positioned);
        assert_eq!(state.feedback_text, None);
    }

    #[test]
    fn new_state_for_time_mode_tracks_remaining() {
        let state = WorkoutSessionState::new(&WorkoutConfiguration::time(90), 3);
        assert_eq!(state.remaining_secs(), Some(90.0));
    }

    #[test]
    fn phases_are_ordered() {
        assert!(WorkoutPhase::Positioning < WorkoutPhase::Countdown);
        assert!(WorkoutPhase::Countdown < WorkoutPhase::Active);
        assert!(WorkoutPhase::Active < WorkoutPhase::Completed);
    }

    #[test]
    fn reached_target() {
        let result = WorkoutResult {
            config: WorkoutConfiguration::reps(10),
            completed_reps: 7,
            duration: Duration::from_secs(30),
        };
        assert!(!result.reached_target());

        let result = WorkoutResult {
            config: WorkoutConfiguration::time(30),
            completed_reps: 7,
            duration: Duration::from_secs(30),
        };
        assert!(result.reached_target());
    }
}
