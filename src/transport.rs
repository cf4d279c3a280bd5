//! Rate-limited HTTP transport for the card API and the image host
//!
//! Every request, JSON or binary, takes a slot from the one shared
//! [`RateLimiter`] before it goes out. A 429 is absorbed here: we sleep the
//! cooldown and send the same request again. A 403 becomes
//! [`SyncError::Blocked`]; any other non-success status is returned as
//! [`SyncError::HttpStatus`] for the caller to record.

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::rate_limiter::RateLimiter;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

pub struct Transport {
    client: Client,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    quota_cooldown: Duration,
    max_quota_retries: Option<u32>,
}

impl Transport {
    /// Create a transport on real wall-clock time
    pub fn new(config: &SyncConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &SyncConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(&config.rate_limit, clock.clone()),
            clock,
            quota_cooldown: config.quota_cooldown,
            max_quota_retries: config.max_quota_retries,
        })
    }

    /// GET `url` with query `params` and decode the body as JSON
    pub fn fetch_json(&mut self, url: &str, params: &[(&str, &str)]) -> Result<serde_json::Value> {
        let response = self.send(url, params)?;
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    /// GET `url` and return the raw body
    pub fn fetch_bytes(&mut self, url: &str) -> Result<Vec<u8>> {
        let response = self.send(url, &[])?;
        Ok(response.bytes()?.to_vec())
    }

    fn send(&mut self, url: &str, params: &[(&str, &str)]) -> Result<Response> {
        let mut attempts: u32 = 0;
        loop {
            self.limiter.acquire();
            attempts += 1;
            log::debug!("GET {} {:?} (attempt {})", url, params, attempts);

            let response = self.client.get(url).query(params).send()?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    if self.max_quota_retries.is_some_and(|max| attempts > max) {
                        return Err(SyncError::QuotaExhausted {
                            url: url.to_string(),
                            attempts,
                        });
                    }
                    log::warn!(
                        "Quota exceeded (HTTP 429) for {}, cooling down {}s before retry",
                        url,
                        self.quota_cooldown.as_secs_f64()
                    );
                    self.clock.sleep(self.quota_cooldown);
                }
                StatusCode::FORBIDDEN => {
                    return Err(SyncError::Blocked {
                        url: url.to_string(),
                    });
                }
                _ => {
                    return Err(SyncError::HttpStatus {
                        status,
                        url: url.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
