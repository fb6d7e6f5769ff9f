//! 지수 백오프 재시도.

use crate::error::ExchangeError;
use p2p_core::RetrySettings;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// 재시도 설정.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 최대 시도 횟수 (첫 요청 포함)
    pub max_attempts: u32,
    /// 첫 재시도 전 대기 시간
    pub initial_delay: Duration,
    /// 재시도 간 최대 대기 시간
    pub max_delay: Duration,
    /// 재시도마다 곱해지는 배수
    pub backoff_factor: f64,
    /// ±25% 지터 적용 여부
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            jitter: false,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: settings.initial_delay(),
            max_delay: settings.max_delay(),
            backoff_factor: settings.backoff_factor,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// 대기 없이 즉시 재시도하는 설정 (테스트용).
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 1.0,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// `retry`번째 재시도(0부터) 전 대기 시간.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(retry as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);

        let final_ms = if self.jitter {
            let jitter_range = capped * 0.25;
            let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_millis(final_ms as u64)
    }
}

/// 재시도 실행 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryStats {
    /// 실제 시도 횟수
    pub attempts: u32,
    /// 재시도 대기에 쓴 총 시간
    pub total_delay: Duration,
}

/// 조건부 재시도.
///
/// `should_retry`가 참을 반환하는 에러만 재시도하며, 최종 결과와 통계를 함께 반환합니다.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: P,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut stats = RetryStats::default();

    loop {
        stats.attempts += 1;
        match operation().await {
            Ok(value) => return (Ok(value), stats),
            Err(e) => {
                if !should_retry(&e) {
                    debug!(attempt = stats.attempts, error = %e, "Non-retryable error");
                    return (Err(e), stats);
                }
                if stats.attempts >= max_attempts {
                    warn!(attempts = stats.attempts, error = %e, "Retries exhausted");
                    return (Err(e), stats);
                }

                let delay = config.delay_for_attempt(stats.attempts - 1);
                warn!(
                    attempt = stats.attempts,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                stats.total_delay += delay;
            }
        }
    }
}

/// 재시도 가능한 거래소 에러만 재시도합니다.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: F,
) -> (Result<T, ExchangeError>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExchangeError>>,
{
    with_retry_if(config, operation, ExchangeError::is_retryable).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_for_attempt() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = RetryConfig::default().with_jitter(true);
        for _ in 0..50 {
            let delay = config.delay_for_attempt(1).as_millis();
            assert!((750..=1250).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = &AtomicU32::new(0);
        let (result, stats) = with_retry(&RetryConfig::default(), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ExchangeError::Timeout("slow".into()))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.total_delay, Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts() {
        let (result, stats) = with_retry(&RetryConfig::default(), || async {
            Err::<(), _>(ExchangeError::ServerError {
                status: 502,
                message: "bad gateway".into(),
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(stats.attempts, 3);
    }

    #[tokio::test]
    async fn test_auth_error_fails_fast() {
        let calls = &AtomicU32::new(0);
        let (result, stats) = with_retry(&RetryConfig::immediate(5), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(ExchangeError::Unauthorized("bad key".into()))
        })
        .await;

        assert!(result.unwrap_err().is_auth_error());
        assert_eq!(stats.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
