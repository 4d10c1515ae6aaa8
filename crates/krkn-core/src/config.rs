/// This config file lists out all the default values for the main KRKN console settings.
/// All can be overridden by an ENV var of the same name. Some can also be overridden
/// from the command line. These should only be primitive types
///

/// base url of the operator API, including the version prefix
pub static KRKN_API_BASE_URL: &'static str = "http://localhost:8080/api/v1";

/// interval between target readiness polls
pub static KRKN_POLL_INTERVAL_MS: usize = 3000;

/// wall-clock budget for target readiness polling, measured from the first poll
pub static KRKN_POLL_TIMEOUT_MS: usize = 60000;

/// interval between status polls of a single active scenario run
pub static KRKN_RUN_POLL_INTERVAL_MS: usize = 5000;

/// timeout applied to every plain HTTP request made to the operator
pub static KRKN_REQUEST_TIMEOUT_MS: usize = 10000;

/// base delay before the first log stream reconnect
pub static KRKN_LOG_RECONNECT_BASE_MS: usize = 2000;

/// upper bound for any single log stream reconnect delay
pub static KRKN_LOG_RECONNECT_MAX_MS: usize = 30000;

/// number of reconnects a log stream makes before giving up
pub static KRKN_LOG_MAX_RECONNECT_ATTEMPTS: usize = 10;

/// transport used to tail job logs: websocket or http
pub static KRKN_LOG_TRANSPORT: &'static str = "websocket";

/// image repository used when no private registry is configured
pub static KRKN_DEFAULT_SCENARIO_IMAGE: &'static str = "quay.io/krkn-chaos/krkn-hub";

/// kubeconfig path handed to scenario pods
pub static KRKN_KUBECONFIG_PATH: &'static str = "/home/krkn/.kube/config";

/// where a successful target poll lands: jobs_list or cluster_selection
pub static KRKN_WORKFLOW_VARIANT: &'static str = "jobs_list";

/// verbose logging of every poll attempt
pub static KRKN_DEBUG_MODE: bool = false;
