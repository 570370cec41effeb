pub mod assistant;
pub mod capacity;
pub mod cli;
pub mod config;
pub mod launcher;
pub mod logging;
pub mod secrets;
pub mod store;

pub use assistant::{Orchestrator, OverlapPolicy, SessionRegistry, ToolRegistry};
pub use capacity::{calculate_capacity, Capacity, StatusClass};
pub use config::Config;
pub use launcher::{AppLauncher, Installation, LauncherRegistry, LauncherSpec};
pub use secrets::{SecretError, SecretStore};
pub use store::Store;
