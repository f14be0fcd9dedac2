//! Per-IP request throttling.
//!
//! A fixed-window counter per client address: up to `limit` requests per
//! `window`, then 429 until the window rolls over. Windows for idle
//! addresses are purged periodically from a background task.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Clone)]
pub struct Throttle {
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
    limit: u32,
    window: Duration,
}

impl Throttle {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window,
        }
    }

    /// Record one request from `ip`. Returns `false` when over the limit.
    pub async fn allow(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let entry = windows.entry(ip).or_insert(Window { started: now, count: 0 });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        entry.count += 1;
        entry.count <= self.limit
    }

    /// Drop windows that have been idle for at least `max_idle`.
    pub async fn purge_stale(&self, max_idle: Duration) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, w| now.duration_since(w.started) < max_idle);
    }
}

impl Default for Throttle {
    // 120 requests / 10 s per address: generous for a dashboard polling
    // nothing (live updates ride a single SSE connection), tight enough to
    // blunt credential stuffing on /auth/login.
    fn default() -> Self {
        Self::new(120, Duration::from_secs(10))
    }
}

pub async fn throttle_middleware(
    axum::extract::State(throttle): axum::extract::State<Throttle>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(ip) = client_ip(&req) {
        if !throttle.allow(ip).await {
            warn!(ip = %ip, "Request throttled");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    Ok(next.run(req).await)
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_limit_then_blocks() {
        let throttle = Throttle::new(3, Duration::from_secs(60));
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..3 {
            assert!(throttle.allow(ip).await);
        }
        assert!(!throttle.allow(ip).await);
    }

    #[tokio::test]
    async fn addresses_are_independent() {
        let throttle = Throttle::new(1, Duration::from_secs(60));
        let ip1: IpAddr = "10.0.0.1".parse().unwrap();
        let ip2: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(throttle.allow(ip1).await);
        assert!(!throttle.allow(ip1).await);
        assert!(throttle.allow(ip2).await);
    }

    #[tokio::test]
    async fn window_rolls_over() {
        let throttle = Throttle::new(1, Duration::from_millis(10));
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        assert!(throttle.allow(ip).await);
        assert!(!throttle.allow(ip).await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(throttle.allow(ip).await);
    }

    #[tokio::test]
    async fn purge_drops_idle_windows() {
        let throttle = Throttle::new(10, Duration::from_secs(60));
        let ip: IpAddr = "10.1.1.1".parse().unwrap();
        assert!(throttle.allow(ip).await);

        throttle.purge_stale(Duration::ZERO).await;

        let windows = throttle.windows.lock().await;
        assert!(windows.is_empty());
    }
}
