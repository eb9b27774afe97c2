//! Registration and draft-pool workflows for youth sports team management.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
