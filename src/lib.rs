//! Course progression and completion engine: per-lesson watch tracking, quiz
//! grading, sequential lesson gating, course completion and exactly-once
//! certificate issuance.

pub mod catalog;
pub mod certificate;
pub mod completion;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod quiz;
pub mod render;
pub mod routes;
pub mod store;
pub mod tracker;
pub mod unlock;

pub use engine::ProgressionEngine;
pub use error::{EngineError, Result};
