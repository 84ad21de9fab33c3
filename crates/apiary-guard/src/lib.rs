pub mod limiter;

pub use limiter::{RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
