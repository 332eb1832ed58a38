//! taskgate: command-line client for the taskgate gateway
//!
//! Provides the `taskgate` CLI for opening exec and logs sessions on swarm
//! workloads and checking gateway health.

pub mod client;
pub mod commands;
pub mod output;
pub mod session;
