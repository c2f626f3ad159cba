//! Async orchestration over the release and progress engine.
//!
//! The services here load data through the `drip-core` store traits, run
//! the pure engine functions and publish the resulting events on the
//! [`EventBus`](drip_events::EventBus). The `drip-worker` binary wires them
//! to PostgreSQL and runs the completion sweep.

pub mod config;
pub mod services;
pub mod sweep;

#[cfg(test)]
pub(crate) mod testing;
