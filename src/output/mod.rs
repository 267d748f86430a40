//! Console output.
//!
//! - [`console`] - progress and listing lines

pub mod console;
