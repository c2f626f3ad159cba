//! Progress and completion event plumbing.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`LearnerEvent`]: the event envelope published when a learner's
//!   progress changes or a course is completed.
//! - [`delivery`]: hand-off of completion events to external systems.

pub mod bus;
pub mod delivery;

pub use bus::{EventBus, LearnerEvent};
pub use delivery::certificate::CertificateDispatcher;
pub use delivery::webhook::{WebhookDelivery, WebhookError};
