//! Per-client, per-method request quotas
//!
//! Each limited method has its own keyed GCRA limiter, so a burst of writes
//! does not eat into a client's read allowance. Clients are keyed by IP.

use crate::AppState;
use crate::types::{AppError, Result};
use crate::utils::toml_config::RateLimitConfig;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use governor::{
    DefaultKeyedRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;

pub struct MethodRateLimiter {
    limiters: HashMap<Method, DefaultKeyedRateLimiter<IpAddr>>,
    clock: DefaultClock,
    trust_proxy_headers: bool,
}

impl MethodRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let limiters = [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE]
            .into_iter()
            .filter_map(|method| {
                let per_minute = NonZeroU32::new(config.per_minute(&method)?)?;
                Some((method, RateLimiter::keyed(Quota::per_minute(per_minute))))
            })
            .collect();

        Self {
            limiters,
            clock: DefaultClock::default(),
            trust_proxy_headers: config.trust_proxy_headers,
        }
    }

    /// Take one unit of `client`'s quota for `method`.
    pub fn check(&self, method: &Method, client: IpAddr) -> Result<()> {
        let Some(limiter) = self.limiters.get(method) else {
            return Ok(());
        };

        limiter.check_key(&client).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            AppError::RateLimited {
                retry_after_secs: wait.as_secs().max(1),
            }
        })
    }

    /// Forget clients whose buckets have fully refilled.
    pub fn sweep(&self) {
        for limiter in self.limiters.values() {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    /// Number of clients currently tracked across all methods
    pub fn tracked_clients(&self) -> usize {
        self.limiters.values().map(|limiter| limiter.len()).sum()
    }

    /// The address a request is accounted to. Requests without a known
    /// peer share the unspecified address.
    pub fn client_ip(&self, req: &Request) -> IpAddr {
        if self.trust_proxy_headers {
            if let Some(ip) = forwarded_ip(req.headers()) {
                return ip;
            }
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let first_hop = |name: &str| {
        headers
            .get(name)?
            .to_str()
            .ok()?
            .split(',')
            .next()?
            .trim()
            .parse::<IpAddr>()
            .ok()
    };

    first_hop("x-forwarded-for").or_else(|| first_hop("x-real-ip"))
}

pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Result<Response> {
    let client = state.rate_limits.client_ip(&req);

    if let Err(err) = state.rate_limits.check(req.method(), client) {
        tracing::warn!(%client, method = %req.method(), path = req.uri().path(), "rate limit exceeded");
        return Err(err);
    }

    Ok(next.run(req).await)
}
