use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioRunPhase {
    Pending,
    Running,
    Succeeded,
    PartiallyFailed,
    Failed,
}

impl ScenarioRunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::PartiallyFailed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterJobPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Reported by older operators for cancelled jobs
    Stopped,
}

impl ClusterJobPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Stopped)
    }
}

/// Execution of one scenario on one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterJob {
    #[serde(default)]
    pub provider_name: String,
    pub cluster_name: String,
    pub job_id: String,
    #[serde(default)]
    pub pod_name: String,
    pub phase: ClusterJobPhase,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub completion_time: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ClusterJob {
    /// Wall time between start and completion, or until `now` while running
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let start = parse_ts(self.start_time.as_deref()?)?;
        let end = match self.completion_time.as_deref() {
            Some(ts) => parse_ts(ts)?,
            None => now,
        };
        Some(end - start)
    }
}

fn parse_ts(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioFileMount {
    pub name: String,
    /// base64 encoded file content
    pub content: String,
    pub mount_path: String,
}

/// Body of `POST /scenarios/run`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRunRequest {
    pub target_request_id: String,
    pub target_clusters: BTreeMap<String, Vec<String>>,
    pub scenario_image: String,
    pub scenario_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kubeconfig_path: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub files: Vec<ScenarioFileMount>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub registry_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scenario_repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub skip_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub insecure: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScenarioRunResponse {
    pub scenario_run_name: String,
    #[serde(default)]
    pub target_clusters: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub total_targets: u32,
}

/// Response of `GET /scenarios/run/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRunStatusResponse {
    pub scenario_run_name: String,
    #[serde(default)]
    pub scenario_name: Option<String>,
    pub phase: ScenarioRunPhase,
    #[serde(default)]
    pub total_targets: u32,
    #[serde(default)]
    pub successful_jobs: u32,
    #[serde(default)]
    pub failed_jobs: u32,
    #[serde(default)]
    pub running_jobs: u32,
    #[serde(default)]
    pub cluster_jobs: Vec<ClusterJob>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Response of `GET /scenarios/run`. Current operators answer with
/// `scenarioRuns`, newer ones with `runs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRunsResponse {
    #[serde(alias = "runs", default)]
    pub scenario_runs: Vec<ScenarioRunStatusResponse>,
}

/// A scenario run as tracked by the console
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioRun {
    pub scenario_run_name: String,
    pub scenario_name: String,
    pub phase: ScenarioRunPhase,
    pub total_targets: u32,
    pub successful_jobs: u32,
    pub failed_jobs: u32,
    pub running_jobs: u32,
    pub cluster_jobs: Vec<ClusterJob>,
    pub created_at: String,
}

impl ScenarioRun {
    /// A freshly submitted run, before the first status poll
    pub fn submitted(
        resp: &CreateScenarioRunResponse,
        scenario_name: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scenario_run_name: resp.scenario_run_name.clone(),
            scenario_name: scenario_name.to_string(),
            phase: ScenarioRunPhase::Pending,
            total_targets: resp.total_targets,
            successful_jobs: 0,
            failed_jobs: 0,
            running_jobs: 0,
            cluster_jobs: Vec::new(),
            created_at: created_at.to_rfc3339(),
        }
    }

    /// Build from a status response. The backend may omit the scenario name
    /// and creation time, in which case the previously known values are kept.
    pub fn from_status(status: ScenarioRunStatusResponse, previous: Option<&ScenarioRun>) -> Self {
        let scenario_name = status
            .scenario_name
            .or_else(|| previous.map(|p| p.scenario_name.clone()))
            .unwrap_or_default();
        let created_at = status
            .created_at
            .or_else(|| previous.map(|p| p.created_at.clone()))
            .unwrap_or_default();
        Self {
            scenario_run_name: status.scenario_run_name,
            scenario_name,
            phase: status.phase,
            total_targets: status.total_targets,
            successful_jobs: status.successful_jobs,
            failed_jobs: status.failed_jobs,
            running_jobs: status.running_jobs,
            cluster_jobs: status.cluster_jobs,
            created_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn job(&self, job_id: &str) -> Option<&ClusterJob> {
        self.cluster_jobs.iter().find(|j| j.job_id == job_id)
    }

    /// Whether `next` carries anything a view would render differently
    pub fn has_changes(&self, next: &ScenarioRun) -> bool {
        if self.phase != next.phase
            || self.running_jobs != next.running_jobs
            || self.successful_jobs != next.successful_jobs
            || self.failed_jobs != next.failed_jobs
            || self.cluster_jobs.len() != next.cluster_jobs.len()
        {
            return true;
        }
        self.cluster_jobs.iter().any(|prev| {
            match next.cluster_jobs.iter().find(|j| j.job_id == prev.job_id) {
                Some(job) => job.phase != prev.phase || job.message != prev.message,
                None => true,
            }
        })
    }
}
