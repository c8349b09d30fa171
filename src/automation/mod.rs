//! The song queue loop.
//!
//! This module provides:
//! - Configuration loading (config.json)
//! - Collaborator traits for capture, OCR, music service, notifier and overlay
//! - Session state and the stop flag
//! - The poll loop that ties them together

pub mod config;
pub mod message;
pub mod runner;
pub mod services;
pub mod state;

pub use config::{get_config, init_config};
pub use runner::{LoopSettings, PollLoop};
pub use state::{request_stop, reset_stop_flag, STOP_REQUESTED};
