use crate::exceptions::GenericError;
use std::str::FromStr;
use std::time::Duration;

/// Where a successful readiness poll lands the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowVariant {
    /// Land on the scenario runs list and start new runs from there
    #[default]
    JobsListLanding,
    /// Go straight to cluster selection
    DirectClusterSelection,
}

impl FromStr for WorkflowVariant {
    type Err = GenericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jobs_list" | "jobs-list" => Ok(Self::JobsListLanding),
            "cluster_selection" | "cluster-selection" | "clusters" => {
                Ok(Self::DirectClusterSelection)
            }
            other => Err(GenericError::ConfigError(format!(
                "Unknown workflow variant '{}', expected jobs_list or cluster_selection",
                other
            ))),
        }
    }
}

/// Transport used to tail job logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTransport {
    #[default]
    WebSocket,
    Http,
}

impl FromStr for LogTransport {
    type Err = GenericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "websocket" | "ws" => Ok(Self::WebSocket),
            "http" | "chunked" => Ok(Self::Http),
            other => Err(GenericError::ConfigError(format!(
                "Unknown log transport '{}', expected websocket or http",
                other
            ))),
        }
    }
}

/// Typed view over every console setting
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleSettings {
    pub api_base_url: String,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub run_poll_interval: Duration,
    pub request_timeout: Duration,
    pub log_reconnect_base: Duration,
    pub log_reconnect_max: Duration,
    pub log_max_reconnect_attempts: usize,
    pub log_transport: LogTransport,
    pub default_scenario_image: String,
    pub kubeconfig_path: String,
    pub workflow_variant: WorkflowVariant,
    pub debug_mode: bool,
}

impl ConsoleSettings {
    /// Build settings from the environment, warning and falling back to the
    /// defaults for any value that fails to parse.
    pub fn from_env() -> Self {
        let log_transport = crate::get_krkn_setting!(KRKN_LOG_TRANSPORT)
            .parse()
            .unwrap_or_else(|e: GenericError| {
                log::warn!("{}. Using websocket", e);
                LogTransport::WebSocket
            });
        let workflow_variant = crate::get_krkn_setting!(KRKN_WORKFLOW_VARIANT)
            .parse()
            .unwrap_or_else(|e: GenericError| {
                log::warn!("{}. Using jobs_list", e);
                WorkflowVariant::JobsListLanding
            });
        Self {
            api_base_url: crate::get_krkn_setting!(KRKN_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            poll_interval: millis(crate::get_krkn_setting!(KRKN_POLL_INTERVAL_MS, usize)),
            poll_timeout: millis(crate::get_krkn_setting!(KRKN_POLL_TIMEOUT_MS, usize)),
            run_poll_interval: millis(crate::get_krkn_setting!(KRKN_RUN_POLL_INTERVAL_MS, usize)),
            request_timeout: millis(crate::get_krkn_setting!(KRKN_REQUEST_TIMEOUT_MS, usize)),
            log_reconnect_base: millis(crate::get_krkn_setting!(KRKN_LOG_RECONNECT_BASE_MS, usize)),
            log_reconnect_max: millis(crate::get_krkn_setting!(KRKN_LOG_RECONNECT_MAX_MS, usize)),
            log_max_reconnect_attempts: crate::get_krkn_setting!(
                KRKN_LOG_MAX_RECONNECT_ATTEMPTS,
                usize
            ),
            log_transport,
            default_scenario_image: crate::get_krkn_setting!(KRKN_DEFAULT_SCENARIO_IMAGE),
            kubeconfig_path: crate::get_krkn_setting!(KRKN_KUBECONFIG_PATH),
            workflow_variant,
            debug_mode: crate::get_krkn_setting!(KRKN_DEBUG_MODE, bool),
        }
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        use crate::config::*;
        Self {
            api_base_url: KRKN_API_BASE_URL.to_string(),
            poll_interval: millis(KRKN_POLL_INTERVAL_MS),
            poll_timeout: millis(KRKN_POLL_TIMEOUT_MS),
            run_poll_interval: millis(KRKN_RUN_POLL_INTERVAL_MS),
            request_timeout: millis(KRKN_REQUEST_TIMEOUT_MS),
            log_reconnect_base: millis(KRKN_LOG_RECONNECT_BASE_MS),
            log_reconnect_max: millis(KRKN_LOG_RECONNECT_MAX_MS),
            log_max_reconnect_attempts: KRKN_LOG_MAX_RECONNECT_ATTEMPTS,
            log_transport: LogTransport::WebSocket,
            default_scenario_image: KRKN_DEFAULT_SCENARIO_IMAGE.to_string(),
            kubeconfig_path: KRKN_KUBECONFIG_PATH.to_string(),
            workflow_variant: WorkflowVariant::JobsListLanding,
            debug_mode: KRKN_DEBUG_MODE,
        }
    }
}

fn millis(ms: usize) -> Duration {
    Duration::from_millis(ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ConsoleSettings::default();
        assert_eq!(settings.poll_interval, Duration::from_secs(3));
        assert_eq!(settings.poll_timeout, Duration::from_secs(60));
        assert_eq!(settings.log_reconnect_max, Duration::from_secs(30));
        assert_eq!(settings.workflow_variant, WorkflowVariant::JobsListLanding);
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!(
            "cluster_selection".parse::<WorkflowVariant>().unwrap(),
            WorkflowVariant::DirectClusterSelection
        );
        assert_eq!(
            "Jobs_List".parse::<WorkflowVariant>().unwrap(),
            WorkflowVariant::JobsListLanding
        );
        assert!("wizard".parse::<WorkflowVariant>().is_err());
    }

    #[test]
    fn test_transport_parsing() {
        assert_eq!("http".parse::<LogTransport>().unwrap(), LogTransport::Http);
        assert_eq!("WS".parse::<LogTransport>().unwrap(), LogTransport::WebSocket);
        assert!(matches!(
            "carrier-pigeon".parse::<LogTransport>(),
            Err(GenericError::ConfigError(_))
        ));
    }
}
