//! Data models for the scheme directory.
//!
//! Response shapes use camelCase field names to match the browser frontend.

mod enums;
mod payload;
mod scheme;

pub use enums::*;
pub use payload::*;
pub use scheme::*;
