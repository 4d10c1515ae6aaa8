//! Transports for tailing scenario job logs.
//!
//! A [`LogSource`] opens a [`LogStream`] for one job. Streams yield raw byte
//! chunks and a single terminal [`StreamEvent::Closed`]; splitting into lines
//! and reconnecting are left to the caller.

use crate::client::{api_error_from_body, map_reqwest_error};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use krkn_core::exceptions::GenericError;
use log::{debug, info, warn};
use reqwest::Url;
use std::pin::Pin;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// The job whose logs are streamed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogTarget {
    pub scenario_run_name: String,
    pub job_id: String,
}

impl LogTarget {
    pub fn new(scenario_run_name: &str, job_id: &str) -> Self {
        Self {
            scenario_run_name: scenario_run_name.to_string(),
            job_id: job_id.to_string(),
        }
    }

    /// Log endpoint of this job under `base`. The run name and job id are
    /// percent-encoded as single path segments.
    pub fn url(&self, base: &Url, follow: bool) -> Url {
        let mut url = base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend([
                "scenarios",
                "run",
                &self.scenario_run_name,
                "jobs",
                &self.job_id,
                "logs",
            ]);
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("follow", if follow { "true" } else { "false" });
        url
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Data(Vec<u8>),
    /// The stream ended. `normal` is true for a clean close by the backend.
    Closed {
        normal: bool,
        reason: Option<String>,
    },
}

#[async_trait]
pub trait LogStream: Send {
    /// Next chunk or the terminal close. Once `Closed` has been returned the
    /// stream must not be polled again.
    async fn next_event(&mut self) -> StreamEvent;
}

#[async_trait]
pub trait LogSource: Send + Sync {
    async fn open(
        &self,
        target: &LogTarget,
        follow: bool,
    ) -> Result<Box<dyn LogStream>, GenericError>;
}

/// Build the WebSocket URL from a base HTTP URL.
///
/// Converts `http://` to `ws://` and `https://` to `wss://` and appends `path`.
pub fn build_ws_url(base_url: &str, path: &str) -> String {
    let ws_base = if base_url.starts_with("https://") {
        base_url.replacen("https://", "wss://", 1)
    } else if base_url.starts_with("http://") {
        base_url.replacen("http://", "ws://", 1)
    } else if base_url.starts_with("ws://") || base_url.starts_with("wss://") {
        base_url.to_string()
    } else {
        format!("ws://{}", base_url)
    };
    format!("{}{}", ws_base.trim_end_matches('/'), path)
}

/// Log source speaking the WebSocket variant of the log endpoint. Each text
/// frame carries one log line.
#[derive(Clone)]
pub struct WsLogSource {
    base_url: Url,
}

fn parse_base(base_url: &str) -> Result<Url, GenericError> {
    Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
        GenericError::ConfigError(format!("Invalid API base url {}: {}", base_url, e))
    })
}

impl WsLogSource {
    pub fn new(base_url: &str) -> Result<Self, GenericError> {
        Ok(Self {
            base_url: parse_base(&build_ws_url(base_url, ""))?,
        })
    }
}

#[async_trait]
impl LogSource for WsLogSource {
    async fn open(
        &self,
        target: &LogTarget,
        follow: bool,
    ) -> Result<Box<dyn LogStream>, GenericError> {
        let ws_url = target.url(&self.base_url, follow);
        info!("Connecting to log stream: {}", ws_url);
        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url.as_str())
            .await
            .map_err(|e| GenericError::Network(format!("WebSocket connection failed: {}", e)))?;
        Ok(Box::new(WsLogStream { inner: ws_stream }))
    }
}

struct WsLogStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

fn frame_line(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.last() != Some(&b'\n') {
        bytes.push(b'\n');
    }
    bytes
}

#[async_trait]
impl LogStream for WsLogStream {
    async fn next_event(&mut self) -> StreamEvent {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => {
                    return StreamEvent::Data(frame_line(text.into_bytes()));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    return StreamEvent::Data(frame_line(bytes));
                }
                Some(Ok(Message::Close(frame))) => {
                    let normal = frame
                        .as_ref()
                        .map(|f| f.code == CloseCode::Normal)
                        .unwrap_or(false);
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    debug!("Log stream closed (normal: {})", normal);
                    return StreamEvent::Closed { normal, reason };
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    return StreamEvent::Closed {
                        normal: false,
                        reason: Some(e.to_string()),
                    };
                }
                None => {
                    return StreamEvent::Closed {
                        normal: false,
                        reason: Some("Connection dropped".to_string()),
                    };
                }
            }
        }
    }
}

/// Log source reading the chunked HTTP variant of the log endpoint
#[derive(Clone)]
pub struct HttpLogSource {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpLogSource {
    /// Log bodies stay open while following, so only connecting is bounded
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, GenericError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| GenericError::ConfigError(e.to_string()))?;
        Ok(Self {
            base_url: parse_base(base_url)?,
            http,
        })
    }
}

type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

#[async_trait]
impl LogSource for HttpLogSource {
    async fn open(
        &self,
        target: &LogTarget,
        follow: bool,
    ) -> Result<Box<dyn LogStream>, GenericError> {
        let url = target.url(&self.base_url, follow);
        info!("Requesting log stream: {}", url);
        let resp = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error_from_body(status.as_u16(), &body));
        }
        let chunks: ChunkStream = Box::pin(resp.bytes_stream().map(|r| r.map(|b| b.to_vec())));
        Ok(Box::new(HttpLogStream { chunks }))
    }
}

struct HttpLogStream {
    chunks: ChunkStream,
}

#[async_trait]
impl LogStream for HttpLogStream {
    async fn next_event(&mut self) -> StreamEvent {
        loop {
            match self.chunks.next().await {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => return StreamEvent::Data(chunk),
                Some(Err(e)) => {
                    warn!("Log body read failed: {}", e);
                    return StreamEvent::Closed {
                        normal: false,
                        reason: Some(e.to_string()),
                    };
                }
                None => {
                    return StreamEvent::Closed {
                        normal: true,
                        reason: None,
                    };
                }
            }
        }
    }
}
