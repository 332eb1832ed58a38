//! Orchestrator directory adapters

mod docker;
mod fixed;

pub use docker::{DockerDirectory, EngineHost, DEFAULT_ENGINE_SOCKET};
pub use fixed::StaticDirectory;
