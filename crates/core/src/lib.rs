//! Content release and progress engine.
//!
//! Pure domain logic deciding whether a learner may access a content item
//! and how much of a course they have completed. This crate has no
//! database dependency; evaluation is done against pre-loaded data and
//! the [`store`] traits describe what the async services load.

pub mod access;
pub mod completion;
pub mod config;
pub mod error;
pub mod formatting;
pub mod permissions;
pub mod prerequisites;
pub mod progress;
pub mod release;
pub mod reorder;
pub mod store;
pub mod types;
