//! List comparison and diff rendering.

pub mod lists;
pub mod render;
