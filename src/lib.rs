// Library surface for the CLI, headless integration tests and reuse.
pub mod app_dirs;
pub mod config;
pub mod counter;
pub mod error;
pub mod format;
pub mod history;
pub mod mode;
pub mod pose;
pub mod runtime;
pub mod session;
pub mod simulated;
pub mod store;
pub mod summary;
pub mod timers;
pub mod workout;

pub use error::{Result, WorkoutError};
pub use mode::{WorkoutConfiguration, WorkoutMode};
pub use session::{WorkoutPhase, WorkoutResult};
pub use workout::{Timing, WorkoutMachine};
