mod brute_force;
mod error;
mod evaluator;
mod rate_limiter;
mod rules;
mod window;

pub use brute_force::BruteForce;
pub use error::{Error, Result};
pub use evaluator::{AccessEvaluator, AccessInfo};
pub use rate_limiter::RateLimiter;
pub use rules::{AccessLevel, AccessRule, groups_for_user, is_member, parse_groups, parse_rules};
pub use window::Attempt;
