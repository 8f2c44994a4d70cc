use tracing::{info, warn};

use super::client::WatchSource;
use super::event::UserId;
use super::retry::{RetryPolicy, RetryState};
use super::stream::{StreamOutcome, wait_for_label};
use crate::config::WatchConfig;
use crate::errors::{Result, SidecarError};
use crate::system::CancellationToken;

/// Connects to a `WatchSource` (retrying per policy) and waits for the user
/// label, reconnecting when the stream closes early if configured to.
pub struct Watcher<S: WatchSource> {
    source: S,
    policy: RetryPolicy,
    label_key: String,
    reconnect_on_close: bool,
    cancel: CancellationToken,
}

impl<S: WatchSource> Watcher<S> {
    pub fn new(
        source: S,
        policy: RetryPolicy,
        settings: &WatchConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            policy,
            label_key: settings.label_key.clone(),
            reconnect_on_close: settings.reconnect_on_close,
            cancel,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Block until a user is assigned
    ///
    /// Connection failures and early stream closes draw on one shared retry
    /// budget: a close waits out the policy delay before reconnecting, and
    /// `max_attempts` / `max_elapsed` count across every connection.
    pub fn wait_for_user(&self) -> Result<UserId> {
        let mut retry = RetryState::new("Agones SDK", &self.policy, &self.cancel);
        let mut connections = 0u32;

        loop {
            let mut stream = retry.run(|_| self.source.connect())?;
            connections += 1;

            info!(
                "Connected to {}, waiting for '{}' label",
                self.source.describe(),
                self.label_key
            );

            match wait_for_label(&mut stream, &self.label_key, &self.cancel)? {
                StreamOutcome::Found(user) => return Ok(user),
                StreamOutcome::Closed if self.reconnect_on_close => {
                    drop(stream);
                    warn!(
                        "Watch stream closed before a user was assigned (connection #{}), reconnecting",
                        connections
                    );
                    retry.backoff(&format!(
                        "watch stream closed on connection #{}",
                        connections
                    ))?;
                }
                StreamOutcome::Closed => {
                    return Err(SidecarError::stream_closed(format!(
                        "{} closed the watch stream before a '{}' label appeared",
                        self.source.describe(),
                        self.label_key
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::client::WatchStream;
    use crate::watch::retry::AttemptError;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::time::Duration;

    enum Step {
        Refuse,
        Status(u16),
        Stream(&'static str),
    }

    /// Replays scripted connection attempts
    struct Scripted {
        steps: RefCell<VecDeque<Step>>,
        attempts: RefCell<u32>,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: RefCell::new(steps.into()),
                attempts: RefCell::new(0),
            }
        }

        fn attempts(&self) -> u32 {
            *self.attempts.borrow()
        }
    }

    impl WatchSource for Scripted {
        fn connect(&self) -> std::result::Result<WatchStream, AttemptError> {
            *self.attempts.borrow_mut() += 1;
            match self.steps.borrow_mut().pop_front() {
                Some(Step::Refuse) => Err(AttemptError::Transient("connection refused".into())),
                Some(Step::Status(code)) => Err(AttemptError::Transient(format!("HTTP {}", code))),
                Some(Step::Stream(body)) => Ok(Box::new(Cursor::new(body.as_bytes().to_vec()))),
                None => Err(AttemptError::Fatal(SidecarError::connection("script exhausted"))),
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    const ALICE: &str = "{\"result\":{\"object_meta\":{\"labels\":{\"user\":\"alice\"}}}}\n";
    const NO_USER: &str = "{\"result\":{\"object_meta\":{\"labels\":{\"foo\":\"bar\"}}}}\n";

    fn watcher(steps: Vec<Step>, reconnect: bool) -> Watcher<Scripted> {
        let settings = WatchConfig {
            label_key: "user".to_string(),
            reconnect_on_close: reconnect,
        };
        Watcher::new(
            Scripted::new(steps),
            RetryPolicy::fixed(Duration::from_millis(5)),
            &settings,
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_refusals_then_stream() {
        let w = watcher(
            vec![Step::Refuse, Step::Refuse, Step::Stream(ALICE)],
            true,
        );
        assert_eq!(w.wait_for_user().unwrap().as_str(), "alice");
        assert_eq!(w.source().attempts(), 3);
    }

    #[test]
    fn test_non_200_is_one_retry_cycle() {
        let w = watcher(vec![Step::Status(503), Step::Stream(ALICE)], true);
        assert_eq!(w.wait_for_user().unwrap().as_str(), "alice");
        assert_eq!(w.source().attempts(), 2);
    }

    #[test]
    fn test_reconnects_after_early_close() {
        let w = watcher(
            vec![Step::Stream(NO_USER), Step::Refuse, Step::Stream(ALICE)],
            true,
        );
        assert_eq!(w.wait_for_user().unwrap().as_str(), "alice");
        assert_eq!(w.source().attempts(), 3);
    }

    #[test]
    fn test_early_close_without_reconnect_fails() {
        let w = watcher(vec![Step::Stream(NO_USER), Step::Stream(ALICE)], false);
        let err = w.wait_for_user().unwrap_err();
        assert!(matches!(err, SidecarError::StreamClosed(_)));
        assert_eq!(w.source().attempts(), 1);
    }

    fn closes_then_alice(closes: usize) -> Vec<Step> {
        let mut steps: Vec<Step> = (0..closes).map(|_| Step::Stream(NO_USER)).collect();
        steps.push(Step::Stream(ALICE));
        steps
    }

    fn watcher_with(
        steps: Vec<Step>,
        policy: RetryPolicy,
        cancel: CancellationToken,
    ) -> Watcher<Scripted> {
        Watcher::new(Scripted::new(steps), policy, &WatchConfig::default(), cancel)
    }

    #[test]
    fn test_reconnects_are_spaced_by_retry_delay() {
        let closes = 10;
        let delay = Duration::from_millis(20);
        let w = watcher_with(
            closes_then_alice(closes),
            RetryPolicy::fixed(delay),
            CancellationToken::new(),
        );

        let start = std::time::Instant::now();
        assert_eq!(w.wait_for_user().unwrap().as_str(), "alice");

        assert_eq!(w.source().attempts(), closes as u32 + 1);
        assert!(start.elapsed() >= delay * closes as u32);
    }

    #[test]
    fn test_max_attempts_counts_across_reconnects() {
        let w = watcher_with(
            closes_then_alice(10),
            RetryPolicy::fixed(Duration::from_millis(5)).with_max_attempts(3),
            CancellationToken::new(),
        );

        let err = w.wait_for_user().unwrap_err();
        assert!(matches!(err, SidecarError::RetriesExhausted(_)));
        assert_eq!(w.source().attempts(), 3);
    }

    #[test]
    fn test_refusals_and_closes_share_attempt_budget() {
        let w = watcher_with(
            vec![
                Step::Refuse,
                Step::Stream(NO_USER),
                Step::Refuse,
                Step::Stream(ALICE),
            ],
            RetryPolicy::fixed(Duration::from_millis(5)).with_max_attempts(3),
            CancellationToken::new(),
        );

        assert!(matches!(
            w.wait_for_user(),
            Err(SidecarError::RetriesExhausted(_))
        ));
        assert_eq!(w.source().attempts(), 3);
    }

    #[test]
    fn test_max_elapsed_counts_across_reconnects() {
        let w = watcher_with(
            closes_then_alice(50),
            RetryPolicy::fixed(Duration::from_millis(50))
                .with_max_elapsed(Duration::from_millis(120)),
            CancellationToken::new(),
        );

        let err = w.wait_for_user().unwrap_err();
        assert!(matches!(err, SidecarError::RetriesExhausted(_)));
        assert!(w.source().attempts() < 10);
    }

    #[test]
    fn test_cancel_during_reconnect_wait() {
        let cancel = CancellationToken::new();
        let w = watcher_with(
            closes_then_alice(1),
            RetryPolicy::fixed(Duration::from_secs(60)),
            cancel.clone(),
        );

        let remote = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });

        let start = std::time::Instant::now();
        let err = w.wait_for_user().unwrap_err();

        assert!(matches!(err, SidecarError::Cancelled(_)));
        assert!(start.elapsed() < Duration::from_secs(30));
        assert_eq!(w.source().attempts(), 1);
        handle.join().unwrap();
    }
}
