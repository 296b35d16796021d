//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.

mod technology;

pub use technology::{NewComponent, TechnologyService};
