//! Database module for PostgreSQL persistence.

mod pool;
mod results;
mod stats;

pub use pool::*;
pub use results::*;
pub use stats::*;
