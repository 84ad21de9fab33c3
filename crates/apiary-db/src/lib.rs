pub mod ops;
pub mod schema;

pub use ops::{ApiaryDb, EventFilter, KindCount, SourceCount, StoreStats};
