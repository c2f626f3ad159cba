//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod completion_repo;
pub mod content_repo;
pub mod group_repo;
pub mod module_repo;
pub mod product_repo;
pub mod progress_repo;
pub mod purchase_repo;
pub mod release_policy_repo;

pub use completion_repo::CompletionRepo;
pub use content_repo::ContentRepo;
pub use group_repo::GroupRepo;
pub use module_repo::ModuleRepo;
pub use product_repo::ProductRepo;
pub use progress_repo::ProgressRepo;
pub use purchase_repo::PurchaseRepo;
pub use release_policy_repo::ReleasePolicyRepo;
