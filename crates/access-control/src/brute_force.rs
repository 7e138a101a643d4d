//! BruteForce: path-scoped alternative to the global RateLimiter
//!
//! Keyed by `(client address, request path)` instead of client address
//! alone, so a flood against one route doesn't also throttle the same
//! client on every other route.

use std::time::Duration;

use crate::window::{Attempt, Window};

pub struct BruteForce {
    window: Window,
}

impl BruteForce {
    pub fn new(max_attempts: u32, window_ms: u64) -> Self {
        Self { window: Window::new(max_attempts, Duration::from_millis(window_ms)) }
    }

    pub async fn try_attempt(&self, client: &str, path: &str) -> Attempt {
        self.window.try_attempt(&key(client, path)).await
    }

    pub async fn release(&self, client: &str, path: &str) {
        self.window.release(&key(client, path)).await
    }
}

fn key(client: &str, path: &str) -> String {
    format!("{client}|{path}")
}
