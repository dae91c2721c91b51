//! Command implementations.

pub mod flatten;
pub mod run;
pub mod summary;
pub mod util;
