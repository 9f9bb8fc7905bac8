//! Store adapter modules.

pub mod memory;
