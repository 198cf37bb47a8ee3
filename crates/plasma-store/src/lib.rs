//! Storage boundary of the plasma table stack.
//!
//! NPZ batch archives, the table layout header, batch supply.

pub mod batch;
pub mod header;
pub mod supplier;
