//! Bounded retries for browser session operations
//!
//! A [`RetryPolicy`] runs a [`SessionTask`] up to `max_attempts` times. After
//! every failed attempt it optionally clears the session's transient state
//! and sleeps for the backoff delay before trying again. The last failure is
//! always returned to the caller.

use crate::config::{BackoffConfig, RetryConfig};
use crate::session::{BrowserSession, Locator, SessionError};
use rand::Rng;
use std::time::Duration;
use thiserror::Error;

/// Delay applied between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Constant(Duration),
    /// Uniformly random delay within `[min, max]`
    Uniform { min: Duration, max: Duration },
}

impl Backoff {
    /// Picks the delay before the next attempt
    pub fn delay(&self) -> Duration {
        match *self {
            Backoff::Constant(delay) => delay,
            Backoff::Uniform { min, max } => uniform_between(min, max),
        }
    }
}

impl From<&BackoffConfig> for Backoff {
    fn from(config: &BackoffConfig) -> Self {
        match *config {
            BackoffConfig::Constant { constant_ms } => {
                Backoff::Constant(Duration::from_millis(constant_ms))
            }
            BackoffConfig::Uniform { min_ms, max_ms } => Backoff::Uniform {
                min: Duration::from_millis(min_ms),
                max: Duration::from_millis(max_ms),
            },
        }
    }
}

/// Random duration in `[min, max]`; returns `min` if the range is inverted
pub(crate) fn uniform_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rand::rng().random_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(millis)
}

/// Returned once every attempt has failed
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempt(s): {last}")]
pub struct RetryError {
    pub attempts: u32,
    /// The error from the final attempt
    pub last: SessionError,
}

/// One unit of retryable work against the browser session
#[allow(async_fn_in_trait)]
pub trait SessionTask<S: BrowserSession> {
    type Output;

    /// Short description used in retry logs
    fn describe(&self) -> String;

    async fn attempt(&mut self, session: &mut S) -> Result<Self::Output, SessionError>;
}

/// Navigates to a URL and optionally waits for a readiness marker
pub struct PageLoad<'a> {
    pub url: &'a str,
    pub ready: Option<(&'a Locator, Duration)>,
}

impl<'a> PageLoad<'a> {
    pub fn new(url: &'a str) -> Self {
        Self { url, ready: None }
    }

    /// Also requires `marker` to appear within `timeout`
    #[must_use]
    pub fn ready_when(mut self, marker: &'a Locator, timeout: Duration) -> Self {
        self.ready = Some((marker, timeout));
        self
    }
}

impl<S: BrowserSession> SessionTask<S> for PageLoad<'_> {
    type Output = ();

    fn describe(&self) -> String {
        format!("load {}", self.url)
    }

    async fn attempt(&mut self, session: &mut S) -> Result<(), SessionError> {
        session.navigate(self.url).await?;
        if let Some((marker, timeout)) = self.ready {
            session.wait_for(marker, timeout).await?;
        }
        Ok(())
    }
}

/// Retry policy shared by the listing crawler and the detail extractor
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Clear cookies and other session state between attempts
    pub clear_between_attempts: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            clear_between_attempts: true,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Backoff::from(&config.backoff))
    }

    /// Runs `task` until it succeeds or `max_attempts` is exhausted
    ///
    /// # Arguments
    ///
    /// * `session` - The session the task runs against
    /// * `task` - The work to retry
    ///
    /// # Returns
    ///
    /// * `Ok((output, attempts))` - The task's value and how many attempts it took
    /// * `Err(RetryError)` - Every attempt failed; carries the final error
    pub async fn run<S, T>(
        &self,
        session: &mut S,
        task: &mut T,
    ) -> Result<(T::Output, u32), RetryError>
    where
        S: BrowserSession,
        T: SessionTask<S>,
    {
        let mut attempt = 1;
        loop {
            match task.attempt(session).await {
                Ok(output) => return Ok((output, attempt)),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::warn!(
                        "{} failed on final attempt {}/{}: {}",
                        task.describe(),
                        attempt,
                        self.max_attempts,
                        e
                    );
                    return Err(RetryError {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.backoff.delay();
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        task.describe(),
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );

                    if self.clear_between_attempts {
                        if let Err(clear_err) = session.clear_session().await {
                            tracing::debug!("Could not clear session state: {}", clear_err);
                        }
                    }

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::testing::ScriptedSession;

    /// Fails a fixed number of times, then succeeds
    struct Flaky {
        failures_left: u32,
        calls: u32,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: failures,
                calls: 0,
            }
        }
    }

    impl SessionTask<ScriptedSession> for Flaky {
        type Output = &'static str;

        fn describe(&self) -> String {
            "flaky task".to_string()
        }

        async fn attempt(
            &mut self,
            _session: &mut ScriptedSession,
        ) -> Result<&'static str, SessionError> {
            self.calls += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                Err(SessionError::Navigation {
                    url: "https://example.com".to_string(),
                    reason: "connection reset".to_string(),
                })
            } else {
                Ok("done")
            }
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Backoff::Constant(Duration::from_secs(3)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let mut session = ScriptedSession::new();
        let mut task = Flaky::new(2);

        let (value, attempts) = policy(3).run(&mut session, &mut task).await.unwrap();

        assert_eq!(value, "done");
        assert_eq!(attempts, 3);
        assert_eq!(task.calls, 3);
        assert_eq!(session.clears, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_stops_after_max_attempts() {
        let mut session = ScriptedSession::new();
        let mut task = Flaky::new(u32::MAX);

        let err = policy(3).run(&mut session, &mut task).await.unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(task.calls, 3);
        assert!(matches!(err.last, SessionError::Navigation { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_applied_between_attempts() {
        let mut session = ScriptedSession::new();
        let mut task = Flaky::new(2);
        let started = tokio::time::Instant::now();

        policy(3).run(&mut session, &mut task).await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_clear_when_disabled() {
        let mut session = ScriptedSession::new();
        let mut task = Flaky::new(1);
        let mut retry = policy(2);
        retry.clear_between_attempts = false;

        retry.run(&mut session, &mut task).await.unwrap();
        assert_eq!(session.clears, 0);
    }

    #[test]
    fn test_uniform_backoff_within_bounds() {
        let backoff = Backoff::Uniform {
            min: Duration::from_millis(100),
            max: Duration::from_millis(200),
        };
        for _ in 0..50 {
            let delay = backoff.delay();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_backoff_from_config() {
        assert_eq!(
            Backoff::from(&BackoffConfig::Constant { constant_ms: 250 }),
            Backoff::Constant(Duration::from_millis(250))
        );
        assert_eq!(RetryPolicy::new(0, Backoff::Constant(Duration::ZERO)).max_attempts, 1);
    }
}
