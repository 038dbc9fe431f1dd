//! `pisensors` Core Library
//!
//! This crate provides the core functionality for the `pisensors` Raspberry Pi
//! dashboard: the SSH transport, the metric commands and their parsers, the
//! CPU rate calculator, the refresh collector and configuration.
//!
//! # Crate Structure
//!
//! - [`session`] - Command runner trait, SSH session, scripted runner for tests
//! - [`metrics`] - Remote commands, parsers, rate calculator and the [`Probe`]
//! - [`collector`] - Refresh cycles producing [`DashboardSnapshot`]s
//! - [`config`] - Persistent settings, runtime dashboard options, keybindings
//! - [`tracing`] - Logging initialisation
//! - [`error`] - Session, configuration and umbrella error types

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod session;
pub mod tracing;

pub use collector::{Collector, DashboardSnapshot};
pub use config::{ConfigManager, DashboardConfig, Settings};
pub use error::{ConfigError, ConfigResult, PiSensorsError, SessionError, SessionResult};
pub use metrics::{MetricResult, MetricsError, Probe};
pub use session::{CommandRunner, RawOutput, SshSession, SshTarget};
