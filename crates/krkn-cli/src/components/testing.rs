use async_trait::async_trait;
use krkn_api::{LogSource, LogStream, LogTarget, OperatorAPI, StreamEvent};
use krkn_core::{
    exceptions::GenericError,
    models::{
        ClusterJob, ClusterJobPhase, ClusterMap, CreateScenarioRunResponse, CreateTargetRequest,
        ScenarioDetail, ScenarioGlobals, ScenarioRunPhase, ScenarioRunRequest,
        ScenarioRunStatusResponse, ScenarioTag, ScenariosRequest, TargetOperationResponse,
        TargetResponse, TargetStatus,
    },
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn run_status(job_phase: ClusterJobPhase) -> ScenarioRunStatusResponse {
    ScenarioRunStatusResponse {
        scenario_run_name: "run-1".to_string(),
        scenario_name: None,
        phase: ScenarioRunPhase::Running,
        total_targets: 1,
        successful_jobs: 0,
        failed_jobs: 0,
        running_jobs: 1,
        cluster_jobs: vec![ClusterJob {
            provider_name: "krkn-operator".to_string(),
            cluster_name: "prod".to_string(),
            job_id: "j-1".to_string(),
            pod_name: "krkn-j-1".to_string(),
            phase: job_phase,
            start_time: None,
            completion_time: None,
            message: None,
        }],
        created_at: None,
    }
}

fn unscripted<T>() -> Result<T, GenericError> {
    Err(GenericError::NotFound("not scripted".to_string()))
}

/// Operator answering target readiness, job phases and node listings from
/// scripted queues. The last queued value repeats.
#[derive(Default)]
pub struct StubOperator {
    pub target_statuses: Mutex<VecDeque<TargetStatus>>,
    pub job_phases: Mutex<VecDeque<ClusterJobPhase>>,
    pub nodes: Vec<String>,
    pub status_calls: AtomicUsize,
    pub node_requests: Mutex<Vec<(String, String)>>,
}

fn next<T: Copy>(queue: &Mutex<VecDeque<T>>, fallback: T) -> T {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front().unwrap_or(fallback)
    } else {
        queue.front().copied().unwrap_or(fallback)
    }
}

#[async_trait]
impl OperatorAPI for StubOperator {
    async fn create_target_request(&self) -> Result<String, GenericError> {
        Ok("req-1".to_string())
    }

    async fn get_target_status(&self, _uuid: &str) -> Result<TargetStatus, GenericError> {
        Ok(next(&self.target_statuses, TargetStatus::Ready))
    }

    async fn get_clusters(&self, _uuid: &str) -> Result<ClusterMap, GenericError> {
        unscripted()
    }

    async fn get_nodes(&self, uuid: &str, cluster_name: &str) -> Result<Vec<String>, GenericError> {
        self.node_requests
            .lock()
            .unwrap()
            .push((uuid.to_string(), cluster_name.to_string()));
        Ok(self.nodes.clone())
    }

    async fn get_scenarios(
        &self,
        _registry: Option<&ScenariosRequest>,
    ) -> Result<Vec<ScenarioTag>, GenericError> {
        unscripted()
    }

    async fn get_scenario_detail(
        &self,
        _scenario_name: &str,
        _registry: Option<&ScenariosRequest>,
    ) -> Result<ScenarioDetail, GenericError> {
        unscripted()
    }

    async fn get_scenario_globals(
        &self,
        _scenario_name: &str,
        _registry: Option<&ScenariosRequest>,
    ) -> Result<ScenarioGlobals, GenericError> {
        unscripted()
    }

    async fn run_scenario(
        &self,
        _request: &ScenarioRunRequest,
    ) -> Result<CreateScenarioRunResponse, GenericError> {
        unscripted()
    }

    async fn get_scenario_run_status(
        &self,
        _scenario_run_name: &str,
    ) -> Result<ScenarioRunStatusResponse, GenericError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(run_status(next(&self.job_phases, ClusterJobPhase::Running)))
    }

    async fn list_scenario_runs(&self) -> Result<Vec<ScenarioRunStatusResponse>, GenericError> {
        Ok(vec![])
    }

    async fn delete_scenario_run(&self, _scenario_run_name: &str) -> Result<(), GenericError> {
        unscripted()
    }

    async fn cancel_job(&self, _run: &str, _job_id: &str) -> Result<(), GenericError> {
        unscripted()
    }

    async fn list_targets(&self) -> Result<Vec<TargetResponse>, GenericError> {
        Ok(vec![])
    }

    async fn get_target(&self, _uuid: &str) -> Result<TargetResponse, GenericError> {
        unscripted()
    }

    async fn create_target(
        &self,
        _request: &CreateTargetRequest,
    ) -> Result<TargetOperationResponse, GenericError> {
        unscripted()
    }

    async fn update_target(
        &self,
        _uuid: &str,
        _request: &CreateTargetRequest,
    ) -> Result<TargetOperationResponse, GenericError> {
        unscripted()
    }

    async fn delete_target(&self, _uuid: &str) -> Result<TargetOperationResponse, GenericError> {
        unscripted()
    }
}

struct ScriptedStream(VecDeque<StreamEvent>);

#[async_trait]
impl LogStream for ScriptedStream {
    async fn next_event(&mut self) -> StreamEvent {
        self.0.pop_front().unwrap_or(StreamEvent::Closed {
            normal: true,
            reason: None,
        })
    }
}

/// Log source handing out one scripted stream per open
#[derive(Default)]
pub struct ScriptedLogs {
    pub streams: Mutex<VecDeque<Vec<StreamEvent>>>,
    pub opens: Mutex<Vec<bool>>,
}

#[async_trait]
impl LogSource for ScriptedLogs {
    async fn open(
        &self,
        _target: &LogTarget,
        follow: bool,
    ) -> Result<Box<dyn LogStream>, GenericError> {
        self.opens.lock().unwrap().push(follow);
        match self.streams.lock().unwrap().pop_front() {
            Some(events) => Ok(Box::new(ScriptedStream(events.into()))),
            None => Err(GenericError::Network("connection refused".to_string())),
        }
    }
}
