use async_trait::async_trait;
use krkn_core::{
    exceptions::GenericError,
    models::{
        ClusterMap, CreateScenarioRunResponse, CreateTargetRequest, ScenarioDetail,
        ScenarioGlobals, ScenarioRunRequest, ScenarioRunStatusResponse, ScenarioTag,
        ScenariosRequest, TargetOperationResponse, TargetResponse, TargetStatus,
    },
};

/// The OperatorAPI trait defines every call the console makes against the
/// operator backend. The effects layer only ever talks to the backend through
/// this trait so that tests can swap in an in-memory implementation.
#[async_trait]
pub trait OperatorAPI: Send + Sync {
    /// Start a new target discovery request and return its uuid
    async fn create_target_request(&self) -> Result<String, GenericError>;

    /// Readiness of a target request, derived from the response status code
    async fn get_target_status(&self, uuid: &str) -> Result<TargetStatus, GenericError>;

    async fn get_clusters(&self, uuid: &str) -> Result<ClusterMap, GenericError>;

    async fn get_nodes(&self, uuid: &str, cluster_name: &str) -> Result<Vec<String>, GenericError>;

    async fn get_scenarios(
        &self,
        registry: Option<&ScenariosRequest>,
    ) -> Result<Vec<ScenarioTag>, GenericError>;

    async fn get_scenario_detail(
        &self,
        scenario_name: &str,
        registry: Option<&ScenariosRequest>,
    ) -> Result<ScenarioDetail, GenericError>;

    async fn get_scenario_globals(
        &self,
        scenario_name: &str,
        registry: Option<&ScenariosRequest>,
    ) -> Result<ScenarioGlobals, GenericError>;

    async fn run_scenario(
        &self,
        request: &ScenarioRunRequest,
    ) -> Result<CreateScenarioRunResponse, GenericError>;

    async fn get_scenario_run_status(
        &self,
        scenario_run_name: &str,
    ) -> Result<ScenarioRunStatusResponse, GenericError>;

    /// All known scenario runs. Backends without the listing endpoint yield
    /// an empty list rather than an error.
    async fn list_scenario_runs(&self) -> Result<Vec<ScenarioRunStatusResponse>, GenericError>;

    async fn delete_scenario_run(&self, scenario_run_name: &str) -> Result<(), GenericError>;

    async fn cancel_job(&self, scenario_run_name: &str, job_id: &str) -> Result<(), GenericError>;

    async fn list_targets(&self) -> Result<Vec<TargetResponse>, GenericError>;

    async fn get_target(&self, uuid: &str) -> Result<TargetResponse, GenericError>;

    async fn create_target(
        &self,
        request: &CreateTargetRequest,
    ) -> Result<TargetOperationResponse, GenericError>;

    async fn update_target(
        &self,
        uuid: &str,
        request: &CreateTargetRequest,
    ) -> Result<TargetOperationResponse, GenericError>;

    async fn delete_target(&self, uuid: &str) -> Result<TargetOperationResponse, GenericError>;
}
