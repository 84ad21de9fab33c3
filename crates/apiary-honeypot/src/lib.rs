pub mod context;
pub mod logger;
pub mod response;
pub mod server;

pub use context::RequestContext;
pub use logger::{AttackLogger, LogOverrides};
pub use server::{honeypot_router, HoneypotState, RatePolicy};
