//! AOProto Core - Error taxonomy and shared wire aggregates

mod error;
mod types;

pub use error::*;
pub use types::*;
