//! Agones SDK watch client
//!
//! `WatchSource` is one connection attempt to something that streams game
//! server events. The production implementation is a blocking ureq GET on the
//! local SDK sidecar; tests plug in scripted sources.

use std::io::{BufRead, BufReader};
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

use super::retry::AttemptError;
use crate::config::{SDK_PORT_ENV, SdkConfig};
use crate::errors::{Result, SidecarError};

/// Open watch stream, read line by line
pub type WatchStream = Box<dyn BufRead>;

pub trait WatchSource {
    /// Make one connection attempt.
    ///
    /// "Not up yet" conditions, including a non-200 status, are
    /// `AttemptError::Transient`.
    fn connect(&self) -> std::result::Result<WatchStream, AttemptError>;

    /// Human-readable endpoint for logs
    fn describe(&self) -> String;
}

/// Streaming GET against the Agones SDK HTTP gateway
pub struct HttpWatchSource {
    url: String,
    agent: Agent,
}

impl HttpWatchSource {
    /// `connect_timeout` bounds establishing the connection only; the stream
    /// itself is long-lived and has no read timeout.
    pub fn new(url: impl Into<String>, connect_timeout: Option<Duration>) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(connect_timeout)
            .build()
            .into();

        Self {
            url: url.into(),
            agent,
        }
    }

    pub fn from_config(sdk: &SdkConfig) -> Result<Self> {
        let url = sdk.watch_url().ok_or_else(|| {
            SidecarError::config(format!(
                "Agones SDK port is not configured; set {}",
                SDK_PORT_ENV
            ))
        })?;
        let connect_timeout =
            (sdk.connect_timeout_secs > 0).then(|| Duration::from_secs(sdk.connect_timeout_secs));
        Ok(Self::new(url, connect_timeout))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl WatchSource for HttpWatchSource {
    fn connect(&self) -> std::result::Result<WatchStream, AttemptError> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .map_err(|e| classify_error(&self.url, e))?;

        let status = response.status().as_u16();
        if status != 200 {
            // 非 200 与连接失败一样处理：丢弃响应，稍后重试
            return Err(AttemptError::Transient(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }

        debug!("Watch stream opened: {}", self.url);
        Ok(Box::new(BufReader::new(response.into_body().into_reader())))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// 区分“SDK 还没启动”与无法通过重试解决的错误
fn classify_error(url: &str, err: ureq::Error) -> AttemptError {
    match err {
        ureq::Error::Io(_)
        | ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Protocol(_)
        | ureq::Error::StatusCode(_) => {
            AttemptError::Transient(format!("{} unreachable: {}", url, err))
        }
        other => AttemptError::Fatal(SidecarError::connection(format!(
            "request to {} failed: {}",
            url, other
        ))),
    }
}
