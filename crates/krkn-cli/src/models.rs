use krkn_core::{models::SecretType, LogTransport};
use serde::Serialize;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportArg {
    /// WebSocket log stream
    Websocket,
    /// Chunked HTTP log stream
    Http,
}

impl From<TransportArg> for LogTransport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Websocket => LogTransport::WebSocket,
            TransportArg::Http => LogTransport::Http,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretTypeArg {
    /// Full kubeconfig file
    Kubeconfig,
    /// Bearer token against the cluster api url
    Token,
    /// Username and password against the cluster api url
    Credentials,
}

impl From<SecretTypeArg> for SecretType {
    fn from(arg: SecretTypeArg) -> Self {
        match arg {
            SecretTypeArg::Kubeconfig => SecretType::Kubeconfig,
            SecretTypeArg::Token => SecretType::Token,
            SecretTypeArg::Credentials => SecretType::Credentials,
        }
    }
}

/// Parse a `KEY=VALUE` argument
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}
