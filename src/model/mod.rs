//! Core data model.

pub mod work;

pub use work::*;
