pub mod analyzers;
pub mod cadence;
pub mod collaborators;
pub mod config;
pub mod effectors;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod io;
pub mod ledger;
pub mod paths;
pub mod pipeline;
pub mod store;
pub mod thresholds;
pub mod types;

pub use cadence::Cadence;
pub use collaborators::Collaborators;
pub use config::{ConfigPatch, ProactiveConfig};
pub use engine::{EngineState, EngineStatus, ProactiveEngine, TickReport};
pub use error::{ProactiveError, Result};
pub use types::{Action, ActionType, DecisionOutcome, OutcomeResult, Priority, SuggestedAction};
