//! Shared sliding-window counter backing RateLimiter and BruteForce

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Ok,
    Exceeded,
}

struct Record {
    timestamp: Instant,
    count: u32,
}

pub struct Window {
    max_attempts: u32,
    window: Duration,
    records: Mutex<HashMap<String, Record>>,
}

impl Window {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self { max_attempts, window, records: Mutex::new(HashMap::new()) }
    }

    pub async fn try_attempt(&self, key: &str) -> Attempt {
        let now = Instant::now();
        let mut records = self.records.lock().await;
        match records.get_mut(key) {
            None => {
                records.insert(key.to_string(), Record { timestamp: now, count: 1 });
                Attempt::Ok
            }
            Some(record) if now.duration_since(record.timestamp) > self.window => {
                record.timestamp = now;
                record.count = 1;
                Attempt::Ok
            }
            Some(record) if record.count >= self.max_attempts => Attempt::Exceeded,
            Some(record) => {
                record.count += 1;
                Attempt::Ok
            }
        }
    }

    pub async fn release(&self, key: &str) {
        self.records.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_max_attempts() {
        let window = Window::new(3, Duration::from_millis(500));
        for _ in 0..3 {
            assert_eq!(window.try_attempt("ip").await, Attempt::Ok);
        }
        assert_eq!(window.try_attempt("ip").await, Attempt::Exceeded);
    }

    #[tokio::test]
    async fn resets_after_window_elapses() {
        let window = Window::new(1, Duration::from_millis(20));
        assert_eq!(window.try_attempt("ip").await, Attempt::Ok);
        assert_eq!(window.try_attempt("ip").await, Attempt::Exceeded);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(window.try_attempt("ip").await, Attempt::Ok);
    }

    #[tokio::test]
    async fn release_clears_the_record() {
        let window = Window::new(1, Duration::from_millis(500));
        assert_eq!(window.try_attempt("ip").await, Attempt::Ok);
        assert_eq!(window.try_attempt("ip").await, Attempt::Exceeded);
        window.release("ip").await;
        assert_eq!(window.try_attempt("ip").await, Attempt::Ok);
    }

    #[tokio::test]
    async fn different_keys_are_independent() {
        let window = Window::new(1, Duration::from_millis(500));
        assert_eq!(window.try_attempt("a").await, Attempt::Ok);
        assert_eq!(window.try_attempt("b").await, Attempt::Ok);
    }
}
