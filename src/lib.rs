mod config;
mod error;
mod progress;
mod quality;
mod queue;
mod scheduler;
mod simulation;
#[cfg(test)]
mod test_helpers;

pub use config::{
    DEFAULT_EASE_FACTOR, DEFAULT_MASTERY_INTERVAL, DEFAULT_MASTERY_QUALITY, InputMode,
    MAX_INTERVAL, MIN_EASE_FACTOR, MasteryRule, STRICT_MAX_EASE_FACTOR, SchedulerConfig,
};
pub use error::{Result, SM2Error};
pub use progress::{CardProgress, CardState, ReviewLog, Status};
pub use quality::{MAX_QUALITY, MIN_QUALITY, PASSING_QUALITY, Quality, Rating};
pub use queue::{DueQueue, SessionStats};
pub use scheduler::{
    FIRST_INTERVAL, LAPSE_INTERVAL, NextStates, ReviewResult, ReviewScheduler, SECOND_INTERVAL,
};
pub use simulation::{Card, SimulationResult, SimulatorConfig, simulate, simulate_seeds};
