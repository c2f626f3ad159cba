//! Async services over the engine and its store traits.

pub mod access;
pub mod completion;
pub mod policy;
pub mod progress;
pub mod reorder;

pub use access::AccessService;
pub use completion::CompletionService;
pub use policy::PolicyService;
pub use progress::{ProgressService, ProgressUpdate};
pub use reorder::ReorderService;
