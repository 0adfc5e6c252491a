pub mod limiter;
pub mod middleware;

pub use limiter::{RateLimitExceeded, RateLimitResult, RateLimiter};
pub use middleware::RateLimitLayer;
