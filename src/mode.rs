use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// What a workout is measured against
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutMode {
    /// finish after a fixed number of reps
    Reps,
    /// finish after a fixed number of seconds
    Time,
}

impl WorkoutMode {
    pub const ALL: [WorkoutMode; 2] = [WorkoutMode::Reps, WorkoutMode::Time];

    /// Stable lowercase name used in storage and exports
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutMode::Reps => "reps",
            WorkoutMode::Time => "time",
        }
    }

    /// Unit label shown next to a target value
    pub fn unit(&self) -> &'static str {
        match self {
            WorkoutMode::Reps => "reps",
            WorkoutMode::Time => "sec",
        }
    }

    pub fn target_range(&self) -> RangeInclusive<u32> {
        match self {
            WorkoutMode::Reps => 5..=100,
            WorkoutMode::Time => 30..=300,
        }
    }

    pub fn target_step(&self) -> u32 {
        match self {
            WorkoutMode::Reps => 5,
            WorkoutMode::Time => 30,
        }
    }

    pub fn default_target(&self) -> u32 {
        match self {
            WorkoutMode::Reps => 20,
            WorkoutMode::Time => 60,
        }
    }

    /// Every selectable target for this mode, smallest first
    pub fn target_choices(&self) -> Vec<u32> {
        self.target_range()
            .step_by(self.target_step() as usize)
            .collect()
    }

    /// Clamp `value` into the selectable range and snap it down to a step.
    pub fn clamp_target(&self, value: u32) -> u32 {
        let range = self.target_range();
        let step = self.target_step();
        let clamped = value.clamp(*range.start(), *range.end());
        let offset = (clamped - range.start()) / step * step;
        range.start() + offset
    }
}

impl FromStr for WorkoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reps" => Ok(WorkoutMode::Reps),
            "time" => Ok(WorkoutMode::Time),
            other => Err(format!("unknown workout mode '{other}'")),
        }
    }
}

/// Mode and target chosen at setup; immutable for the session attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutConfiguration {
    pub mode: WorkoutMode,
    /// rep count for [`WorkoutMode::Reps`], seconds for [`WorkoutMode::Time`]
    pub target_value: u32,
}

impl WorkoutConfiguration {
    /// Build a configuration, clamping the target into the mode's range.
    pub fn new(mode: WorkoutMode, target_value: u32) -> Self {
        Self {
            mode,
            target_value: mode.clamp_target(target_value),
        }
    }

    pub fn reps(target: u32) -> Self {
        Self::new(WorkoutMode::Reps, target)
    }

    pub fn time(target_secs: u32) -> Self {
        Self::new(WorkoutMode::Time, target_secs)
    }
}

impl Default for WorkoutConfiguration {
    fn default() -> Self {
        Self::reps(WorkoutMode::Reps.default_target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_storage_names() {
        assert_eq!(WorkoutMode::Reps.to_string(), "Reps");
        assert_eq!(WorkoutMode::Time.to_string(), "Time");
        assert_eq!(WorkoutMode::Reps.as_str(), "reps");
        assert_eq!("TIME".parse::<WorkoutMode>(), Ok(WorkoutMode::Time));
        assert!("plank".parse::<WorkoutMode>().is_err());
    }

    #[test]
    fn target_choices_follow_steps() {
        let reps = WorkoutMode::Reps.target_choices();
        assert_eq!(reps.first(), Some(&5));
        assert_eq!(reps.last(), Some(&100));
        assert_eq!(reps.len(), 20);

        let time = WorkoutMode::Time.target_choices();
        assert_eq!(time, vec![30, 60, 90, 120, 150, 180, 210, 240, 270, 300]);
    }

    #[test]
    fn clamp_target_into_range() {
        assert_eq!(WorkoutMode::Reps.clamp_target(0), 5);
        assert_eq!(WorkoutMode::Reps.clamp_target(500), 100);
        assert_eq!(WorkoutMode::Reps.clamp_target(23), 20);
        assert_eq!(WorkoutMode::Time.clamp_target(10), 30);
        assert_eq!(WorkoutMode::Time.clamp_target(95), 90);
        assert_eq!(WorkoutMode::Time.clamp_target(301), 300);
    }

    #[test]
    fn configuration_defaults() {
        let cfg = WorkoutConfiguration::default();
        assert_eq!(cfg.mode, WorkoutMode::Reps);
        assert_eq!(cfg.target_value, 20);
        assert_eq!(WorkoutConfiguration::time(61).target_value, 60);
    }
}
