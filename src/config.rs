use crate::app_dirs::AppDirs;
use crate::mode::{WorkoutConfiguration, WorkoutMode};
use crate::workout::Timing;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_mode: WorkoutMode,
    pub reps_target: u32,
    pub time_target_secs: u32,
    pub countdown_from: u32,
    pub stability_delay_ms: u64,
    pub tick_interval_ms: u64,
    pub rep_enter_threshold: f64,
    pub rep_exit_threshold: f64,
    pub db_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let timing = Timing::default();
        Self {
            default_mode: WorkoutMode::Reps,
            reps_target: WorkoutMode::Reps.default_target(),
            time_target_secs: WorkoutMode::Time.default_target(),
            countdown_from: timing.countdown_from,
            stability_delay_ms: timing.stability_delay.as_millis() as u64,
            tick_interval_ms: timing.tick_interval.as_millis() as u64,
            rep_enter_threshold: timing.rep_enter_threshold,
            rep_exit_threshold: timing.rep_exit_threshold,
            db_path: None,
        }
    }
}

impl Config {
    pub fn timing(&self) -> Timing {
        Timing {
            countdown_from: self.countdown_from,
            stability_delay: Duration::from_millis(self.stability_delay_ms),
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
            rep_enter_threshold: self.rep_enter_threshold,
            rep_exit_threshold: self.rep_exit_threshold,
            ..Timing::default()
        }
    }

    /// Saved target for `mode`, clamped into range
    pub fn target_for(&self, mode: WorkoutMode) -> u32 {
        let target = match mode {
            WorkoutMode::Reps => self.reps_target,
            WorkoutMode::Time => self.time_target_secs,
        };
        mode.clamp_target(target)
    }

    /// Workout setup from an optional override of mode and target
    pub fn workout(&self, mode: Option<WorkoutMode>, target: Option<u32>) -> WorkoutConfiguration {
        let mode = mode.unwrap_or(self.default_mode);
        WorkoutConfiguration::new(mode, target.unwrap_or_else(|| self.target_for(mode)))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "ignoring unreadable config")
                }
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
