//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod catalog;
pub mod copier;
pub mod cycle;
pub mod entities;
pub mod error;

pub use arena::{ComponentData, OperationNode, OperationTree};
pub use builder::{NodeSpec, TreeBuilder};
pub use catalog::Catalog;
pub use copier::{copy_subtree, merge_copied_fields, DERIVED_STATE_FIELDS};
pub use cycle::{detect_cycle, ReferenceChain};
pub use entities::*;
pub use error::{DomainError, DomainResult, ReferenceCopyError, ValidationError};
