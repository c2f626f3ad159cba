//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for inserts and patches, validated with `validator`
//! - Conversions into the `drip-core` engine shapes

pub mod completion;
pub mod content;
pub mod group;
pub mod module;
pub mod product;
pub mod progress;
pub mod purchase;
pub mod release_policy;
