//! External delivery of learner events.

pub mod certificate;
pub mod webhook;
