//! Request rate limiting.

use std::{
    collections::HashMap,
    convert::Infallible,
    net::IpAddr,
    sync::{Arc, Mutex, PoisonError},
    time,
};

use common::DateTime;

use crate::config;

/// Fixed-window request counter keyed by the caller network address.
///
/// Advisory throttling only: an over-limit caller is turned away with `429`,
/// nothing else depends on the counters. The counter table lives in process
/// memory behind this injected collaborator, so swapping in a shared counter
/// store touches only this module.
#[derive(Debug)]
pub struct Limiter {
    /// Configuration of this [`Limiter`].
    config: config::RateLimit,

    /// Per-client counting windows.
    windows: Mutex<HashMap<IpAddr, Window>>,
}

/// Single counting window of a [`Limiter`].
#[derive(Clone, Copy, Debug)]
struct Window {
    /// [`DateTime`] when this [`Window`] was opened.
    opened_at: DateTime,

    /// Number of requests counted within this [`Window`].
    count: u32,
}

impl Limiter {
    /// Creates a new [`Limiter`] with the provided configuration.
    #[must_use]
    pub fn new(config: config::RateLimit) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns whether a request from the provided address is admitted.
    ///
    /// Counts the request either way.
    pub fn allow(&self, key: IpAddr) -> bool {
        let now = DateTime::now();
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let window = windows.entry(key).or_insert(Window {
            opened_at: now,
            count: 0,
        });
        if now - window.opened_at >= self.config.window {
            *window = Window {
                opened_at: now,
                count: 0,
            };
        }
        window.count = window.count.saturating_add(1);
        window.count <= self.config.max_requests
    }

    /// Drops every [`Window`] that has already elapsed.
    pub fn sweep(&self) {
        let now = DateTime::now();
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, w| now - w.opened_at < self.config.window);
    }

    /// Sweeps stale [`Window`]s on the configured interval, forever.
    ///
    /// # Errors
    ///
    /// Never errors, the [`Result`] only matches the background task
    /// signature.
    pub async fn run_sweeping(
        self: Arc<Self>,
        interval: time::Duration,
    ) -> Result<(), Infallible> {
        let mut interval = tokio::time::interval(interval);
        loop {
            _ = interval.tick().await;
            self.sweep();
        }
    }
}

#[cfg(test)]
mod spec {
    use std::net::{IpAddr, Ipv4Addr};

    use crate::config;

    use super::Limiter;

    fn limiter(max_requests: u32, window: std::time::Duration) -> Limiter {
        Limiter::new(config::RateLimit {
            window,
            max_requests,
            sweep_interval: std::time::Duration::from_secs(60 * 60),
        })
    }

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7));
    const OTHER: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));

    #[test]
    fn admits_up_to_limit_per_client() {
        let limiter = limiter(3, std::time::Duration::from_secs(15 * 60));

        assert!(limiter.allow(CLIENT));
        assert!(limiter.allow(CLIENT));
        assert!(limiter.allow(CLIENT));
        assert!(!limiter.allow(CLIENT), "fourth request is over the limit");

        assert!(limiter.allow(OTHER), "clients are counted independently");
    }

    #[test]
    fn resets_after_window_elapses() {
        let limiter = limiter(1, std::time::Duration::ZERO);

        assert!(limiter.allow(CLIENT));
        assert!(
            limiter.allow(CLIENT),
            "zero-length window restarts on every request",
        );
    }

    #[test]
    fn sweep_keeps_current_windows() {
        let limiter = limiter(1, std::time::Duration::from_secs(15 * 60));
        assert!(limiter.allow(CLIENT));
        limiter.sweep();
        assert!(
            !limiter.allow(CLIENT),
            "current window survives the sweep",
        );
    }
}
