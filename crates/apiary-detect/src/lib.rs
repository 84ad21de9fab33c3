pub mod behavior;
pub mod tools;
pub mod trends;

pub use behavior::AttackAnalyzer;
pub use tools::identify_tool;
pub use trends::trend_from_timeline;
