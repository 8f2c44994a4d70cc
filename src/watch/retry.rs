//! 连接重试模块
//!
//! 阻塞式重试执行器：每次尝试之间等待，等待可以被 CancellationToken 打断。
//! 默认策略与最初的行为一致：固定 1 秒间隔，无限重试。

use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::config::RetryConfig;
use crate::errors::{Result, SidecarError};
use crate::system::CancellationToken;

/// 单次尝试的失败类型
#[derive(Debug)]
pub enum AttemptError {
    /// 对端还没准备好，稍后重试
    Transient(String),
    /// 重试没有意义，直接返回
    Fatal(SidecarError),
}

/// 重试策略
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// 最大尝试次数（0 = 无限）
    pub max_attempts: u32,
    /// 总时长上限
    pub max_elapsed: Option<Duration>,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// 1.0 为固定间隔
    pub backoff_multiplier: f64,
    /// 附加 0-25% 随机抖动
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// 固定间隔、无限重试
    pub fn fixed(delay: Duration) -> Self {
        Self {
            max_attempts: 0,
            max_elapsed: None,
            initial_delay: delay,
            max_delay: delay,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = Some(max_elapsed);
        self
    }

    /// 第 `attempt` 次失败之后的等待时间（attempt 从 1 开始）
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(1024) as i32;
        let base_ms = self.initial_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let capped = (base_ms * self.backoff_multiplier.powi(exponent)).min(max_ms) as u64;

        if self.jitter && capped >= 4 {
            use rand::RngExt;
            // 添加 0-25% 的随机抖动，避免多个实例同时重连
            let jitter = rand::rng().random_range(0..=capped / 4);
            Duration::from_millis(capped.saturating_add(jitter))
        } else {
            Duration::from_millis(capped)
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            max_elapsed: (config.max_elapsed_secs > 0)
                .then(|| Duration::from_secs(config.max_elapsed_secs)),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
        }
    }
}

/// 跨多次重试共享的计数状态
///
/// 尝试次数与起始时间在整个生命周期内累计，因此 `max_attempts` 和
/// `max_elapsed` 对同一个 `RetryState` 上的所有失败都生效，包括调用方在
/// `run` 之外自行上报的失败（例如 watch 流提前断开）。
pub struct RetryState<'a> {
    operation_name: &'a str,
    policy: &'a RetryPolicy,
    cancel: &'a CancellationToken,
    started: Instant,
    attempt: u32,
}

impl<'a> RetryState<'a> {
    pub fn new(
        operation_name: &'a str,
        policy: &'a RetryPolicy,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            operation_name,
            policy,
            cancel,
            started: Instant::now(),
            attempt: 0,
        }
    }

    /// 已经开始的尝试次数
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    fn cancelled(&self) -> SidecarError {
        SidecarError::cancelled(format!(
            "'{}' cancelled after {} attempts",
            self.operation_name, self.attempt
        ))
    }

    /// 重复 `operation` 直到成功或出现不可重试的错误
    pub fn run<T, F>(&mut self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> std::result::Result<T, AttemptError>,
    {
        let first_attempt = self.attempt + 1;

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled());
            }

            self.attempt = self.attempt.saturating_add(1);

            let reason = match operation(self.attempt) {
                Ok(value) => {
                    if self.attempt > first_attempt {
                        debug!(
                            "Operation '{}' succeeded after {} retries",
                            self.operation_name,
                            self.attempt - first_attempt
                        );
                    }
                    return Ok(value);
                }
                Err(AttemptError::Fatal(e)) => {
                    debug!(
                        "Operation '{}' failed with non-retryable error: {}",
                        self.operation_name, e
                    );
                    return Err(e);
                }
                Err(AttemptError::Transient(reason)) => reason,
            };

            self.backoff(&reason)?;
        }
    }

    /// 记录当前尝试失败，按策略等待
    ///
    /// 次数或时长用尽返回 `RetriesExhausted`，等待期间被取消返回 `Cancelled`。
    pub fn backoff(&mut self, reason: &str) -> Result<()> {
        let attempt = self.attempt.max(1);

        if self.policy.max_attempts > 0 && attempt >= self.policy.max_attempts {
            error!(
                "Operation '{}' failed after {} attempts: {}",
                self.operation_name, attempt, reason
            );
            return Err(SidecarError::retries_exhausted(format!(
                "'{}' failed after {} attempts: {}",
                self.operation_name, attempt, reason
            )));
        }

        let delay = self.policy.delay_for(attempt);

        if let Some(max_elapsed) = self.policy.max_elapsed
            && self.started.elapsed() + delay > max_elapsed
        {
            error!(
                "Operation '{}' gave up after {:?}: {}",
                self.operation_name,
                self.started.elapsed(),
                reason
            );
            return Err(SidecarError::retries_exhausted(format!(
                "'{}' did not succeed within {}s: {}",
                self.operation_name,
                max_elapsed.as_secs(),
                reason
            )));
        }

        warn!(
            "Waiting for {}... (attempt {}): {}; retrying in {} ms",
            self.operation_name,
            attempt,
            reason,
            delay.as_millis()
        );

        if self.cancel.wait_timeout(delay) {
            return Err(self.cancelled());
        }
        Ok(())
    }
}

/// 重试执行器
///
/// `operation` 收到当前尝试序号（从 1 开始）。`Transient` 错误按策略等待后重试，
/// `Fatal` 错误立即返回。取消时返回 `SidecarError::Cancelled`，次数或时长用尽时
/// 返回 `SidecarError::RetriesExhausted`。
pub fn with_retry<T, F>(
    operation_name: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> std::result::Result<T, AttemptError>,
{
    RetryState::new(operation_name, policy, cancel).run(operation)
}
