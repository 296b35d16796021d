//! Technology operation trees.
//!
//! A technology owns one tree of operation components. A component created with a
//! reference technology receives a detached copy of that technology's tree, guarded
//! against self-reference. Create, save and delete rules for components live in
//! [`application::hooks`].

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
