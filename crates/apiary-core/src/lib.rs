pub mod error;
pub mod types;

pub use error::{ApiaryError, ApiaryResult};
pub use types::*;
