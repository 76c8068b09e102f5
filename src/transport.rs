use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::BiomartError;

/// Synchronous fetch capability the session builds on.
pub trait MartTransport: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, BiomartError>;
}

/// Retry behavior for [`HttpTransport`]. The default is no retry; a fixed
/// attempt count with a constant interval can be opted into. Only transient
/// failures (connect/timeout errors, 429 and 5xx statuses) are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    #[default]
    None,
    FixedAttempts { attempts: usize, interval: Duration },
}

impl RetryPolicy {
    /// Delay before the next attempt, or `None` when the budget is spent.
    /// `attempt` is zero-based and counts attempts already made.
    fn backoff(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryPolicy::None => None,
            RetryPolicy::FixedAttempts { attempts, interval } => {
                (attempt + 1 < *attempts).then_some(*interval)
            }
        }
    }
}

pub struct HttpTransport {
    client: Client,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new() -> Result<Self, BiomartError> {
        Self::with_retry_policy(RetryPolicy::None)
    }

    pub fn with_retry_policy(retry: RetryPolicy) -> Result<Self, BiomartError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("biomart-client/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BiomartError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| BiomartError::Http(err.to_string()))?;
        Ok(Self { client, retry })
    }

    fn send_with_retries(&self, url: &str) -> Result<reqwest::blocking::Response, BiomartError> {
        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send() {
                Ok(resp) => {
                    if is_retryable_status(resp.status().as_u16()) {
                        if let Some(delay) = self.retry.backoff(attempt) {
                            thread::sleep(delay);
                            attempt += 1;
                            continue;
                        }
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if is_retryable_error(&err) {
                        if let Some(delay) = self.retry.backoff(attempt) {
                            thread::sleep(delay);
                            attempt += 1;
                            continue;
                        }
                    }
                    return Err(BiomartError::Http(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, BiomartError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "biomart request failed".to_string());
        Err(BiomartError::Status { status, message })
    }
}

impl MartTransport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, BiomartError> {
        let response = self.send_with_retries(url)?;
        let response = Self::handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| BiomartError::Http(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_retry_policy_never_backs_off() {
        assert_eq!(RetryPolicy::None.backoff(0), None);
    }

    #[test]
    fn fixed_attempts_back_off_until_spent() {
        let policy = RetryPolicy::FixedAttempts {
            attempts: 3,
            interval: Duration::from_millis(10),
        };
        assert_eq!(policy.backoff(0), Some(Duration::from_millis(10)));
        assert_eq!(policy.backoff(1), Some(Duration::from_millis(10)));
        assert_eq!(policy.backoff(2), None);
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }
}
