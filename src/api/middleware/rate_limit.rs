//! Sliding-window rate limiting
//!
//! Tracks per-key request timestamps over the trailing minute and hour,
//! measured from "now" rather than aligned to clock buckets. State lives in
//! process memory only and resets on restart; deployments that run several
//! worker processes enforce each ceiling independently, effectively
//! multiplying it by the process count. Provision ceilings accordingly.

use std::collections::VecDeque;

use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::HttpResponse;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::store::RateLimitSettings;

/// Rate limit headers
pub const RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
pub const RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";
pub const RETRY_AFTER: &str = "Retry-After";

/// Snapshot of the minute window after an allowed request.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// When the oldest request in the minute window falls out of it.
    pub reset_at: DateTime<Utc>,
}

/// Outcome of a single check-and-record.
#[derive(Debug, Clone)]
pub enum RateDecision {
    Allowed(RateLimitStatus),
    Denied {
        retry_after_seconds: i64,
        message: String,
    },
}

/// Per-key sliding windows over shared ceilings.
pub struct RateLimiter {
    limits: RateLimitSettings,
    windows: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new(limits: RateLimitSettings) -> Self {
        Self {
            limits,
            windows: DashMap::new(),
        }
    }

    pub fn limits(&self) -> RateLimitSettings {
        self.limits
    }

    /// Check both ceilings for `key` and record the request if allowed.
    /// Denied requests are never recorded.
    pub fn check_and_record(&self, key: &str) -> RateDecision {
        self.check_at(key, Utc::now())
    }

    fn check_at(&self, key: &str, now: DateTime<Utc>) -> RateDecision {
        let mut window = self.windows.entry(key.to_owned()).or_default();

        // Entries older than the hour window can never matter again.
        while window
            .front()
            .is_some_and(|&t| now - t >= Duration::hours(1))
        {
            window.pop_front();
        }

        let minute_ago = now - Duration::minutes(1);
        let in_minute = window.iter().rev().take_while(|&&t| t > minute_ago).count();

        if in_minute as u32 >= self.limits.requests_per_minute {
            let oldest_in_minute = window[window.len() - in_minute];
            return RateDecision::Denied {
                retry_after_seconds: seconds_until(oldest_in_minute + Duration::minutes(1), now),
                message: format!(
                    "Rate limit exceeded: {} requests per minute",
                    self.limits.requests_per_minute
                ),
            };
        }

        // Post-prune, the whole window is the trailing hour.
        if window.len() as u32 >= self.limits.requests_per_hour {
            let oldest = window.front().copied().unwrap_or(now);
            return RateDecision::Denied {
                retry_after_seconds: seconds_until(oldest + Duration::hours(1), now),
                message: format!(
                    "Rate limit exceeded: {} requests per hour",
                    self.limits.requests_per_hour
                ),
            };
        }

        window.push_back(now);
        let oldest_in_minute = window[window.len() - in_minute - 1];

        RateDecision::Allowed(RateLimitStatus {
            limit: self.limits.requests_per_minute,
            remaining: self.limits.requests_per_minute - in_minute as u32 - 1,
            reset_at: oldest_in_minute + Duration::minutes(1),
        })
    }
}

fn seconds_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    // Round up so clients that honor the hint wait long enough.
    let millis = (deadline - now).num_milliseconds();
    ((millis + 999) / 1000).max(1)
}

/// Add quota hint headers to an allowed response.
pub fn append_rate_limit_headers(
    headers: &mut actix_web::http::header::HeaderMap,
    status: &RateLimitStatus,
) {
    let pairs = [
        (RATE_LIMIT_LIMIT, status.limit.to_string()),
        (RATE_LIMIT_REMAINING, status.remaining.to_string()),
        (RATE_LIMIT_RESET, status.reset_at.timestamp().to_string()),
    ];
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            headers.insert(name, value);
        }
    }
}

/// 429 response with retry hints.
pub fn rate_limit_exceeded_response(
    limit: u32,
    retry_after_seconds: i64,
    message: &str,
) -> HttpResponse {
    let reset_at = Utc::now() + Duration::seconds(retry_after_seconds);
    HttpResponse::TooManyRequests()
        .insert_header((RATE_LIMIT_LIMIT, limit.to_string()))
        .insert_header((RATE_LIMIT_REMAINING, "0"))
        .insert_header((RATE_LIMIT_RESET, reset_at.timestamp().to_string()))
        .insert_header((RETRY_AFTER, retry_after_seconds.to_string()))
        .json(serde_json::json!({
            "error": "Rate limit exceeded",
            "message": message,
            "retry_after_seconds": retry_after_seconds
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_minute: u32, per_hour: u32) -> RateLimiter {
        RateLimiter::new(RateLimitSettings {
            requests_per_minute: per_minute,
            requests_per_hour: per_hour,
        })
    }

    fn at(base: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
        base + Duration::milliseconds(millis)
    }

    #[test]
    fn test_fresh_key_is_allowed() {
        let limiter = limiter(5, 100);
        match limiter.check_and_record("k") {
            RateDecision::Allowed(status) => {
                assert_eq!(status.limit, 5);
                assert_eq!(status.remaining, 4);
            }
            RateDecision::Denied { .. } => panic!("fresh key denied"),
        }
    }

    #[test]
    fn test_minute_ceiling_denies_sixth_request() {
        let limiter = limiter(5, 100);
        let base = Utc::now();
        for i in 0..5 {
            assert!(matches!(
                limiter.check_at("k", at(base, i * 100)),
                RateDecision::Allowed(_)
            ));
        }
        match limiter.check_at("k", at(base, 600)) {
            RateDecision::Denied {
                retry_after_seconds,
                message,
            } => {
                assert!(retry_after_seconds > 0);
                assert!(message.contains("per minute"));
            }
            RateDecision::Allowed(_) => panic!("sixth request allowed"),
        }
    }

    #[test]
    fn test_denied_request_is_not_recorded() {
        let limiter = limiter(1, 100);
        let base = Utc::now();
        assert!(matches!(
            limiter.check_at("k", base),
            RateDecision::Allowed(_)
        ));
        for i in 1..10 {
            assert!(matches!(
                limiter.check_at("k", at(base, i * 100)),
                RateDecision::Denied { .. }
            ));
        }
        // Only the first request occupies the window, so one window length
        // later the key is allowed again.
        assert!(matches!(
            limiter.check_at("k", base + Duration::seconds(61)),
            RateDecision::Allowed(_)
        ));
    }

    #[test]
    fn test_window_recovery_without_waiting_the_hour() {
        let limiter = limiter(2, 10);
        let base = Utc::now();
        assert!(matches!(
            limiter.check_at("k", base),
            RateDecision::Allowed(_)
        ));
        assert!(matches!(
            limiter.check_at("k", at(base, 100)),
            RateDecision::Allowed(_)
        ));

        match limiter.check_at("k", at(base, 200)) {
            RateDecision::Denied {
                retry_after_seconds,
                ..
            } => assert_eq!(retry_after_seconds, 60),
            RateDecision::Allowed(_) => panic!("third request within the minute allowed"),
        }

        // Oldest timestamp has left the 60s window; hourly count is 3/10.
        assert!(matches!(
            limiter.check_at("k", base + Duration::seconds(61)),
            RateDecision::Allowed(_)
        ));
    }

    #[test]
    fn test_hour_ceiling_binds_after_minute_windows_pass() {
        let limiter = limiter(10, 3);
        let base = Utc::now();
        for i in 0..3 {
            assert!(matches!(
                limiter.check_at("k", base + Duration::minutes(i * 2)),
                RateDecision::Allowed(_)
            ));
        }
        match limiter.check_at("k", base + Duration::minutes(10)) {
            RateDecision::Denied {
                retry_after_seconds,
                message,
            } => {
                assert!(message.contains("per hour"));
                // The oldest entry leaves the hour window 50 minutes later.
                assert_eq!(retry_after_seconds, 50 * 60);
            }
            RateDecision::Allowed(_) => panic!("hour ceiling not enforced"),
        }
    }

    #[test]
    fn test_idle_hour_resets_both_windows() {
        let limiter = limiter(2, 3);
        let base = Utc::now();
        for i in 0..3 {
            limiter.check_at("k", base + Duration::minutes(i));
        }
        assert!(matches!(
            limiter.check_at("k", base + Duration::minutes(5)),
            RateDecision::Denied { .. }
        ));
        assert!(matches!(
            limiter.check_at("k", base + Duration::minutes(70)),
            RateDecision::Allowed(_)
        ));
    }

    #[test]
    fn test_keys_have_independent_windows() {
        let limiter = limiter(1, 10);
        let base = Utc::now();
        assert!(matches!(
            limiter.check_at("a", base),
            RateDecision::Allowed(_)
        ));
        assert!(matches!(
            limiter.check_at("b", at(base, 1)),
            RateDecision::Allowed(_)
        ));
        assert!(matches!(
            limiter.check_at("a", at(base, 2)),
            RateDecision::Denied { .. }
        ));
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = limiter(3, 100);
        let base = Utc::now();
        let mut remaining = Vec::new();
        for i in 0..3 {
            if let RateDecision::Allowed(status) = limiter.check_at("k", at(base, i)) {
                remaining.push(status.remaining);
            }
        }
        assert_eq!(remaining, vec![2, 1, 0]);
    }
}
