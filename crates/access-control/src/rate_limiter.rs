//! RateLimiter: per-client sliding-window counter, applied pipeline-wide

use std::time::Duration;

use crate::window::{Attempt, Window};

const DEFAULT_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_WINDOW_MS: u64 = 1_000;

pub struct RateLimiter {
    window: Window,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window_ms: u64) -> Self {
        Self { window: Window::new(max_attempts, Duration::from_millis(window_ms)) }
    }

    pub async fn try_attempt(&self, key: &str) -> Attempt {
        self.window.try_attempt(key).await
    }

    pub async fn release(&self, key: &str) {
        self.window.release(key).await
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW_MS)
    }
}
