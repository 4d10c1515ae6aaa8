use crate::OperatorAPI;
use async_trait::async_trait;
use krkn_core::{
    exceptions::GenericError,
    models::{
        ClusterMap, ClustersResponse, CreateScenarioRunResponse, CreateTargetRequest,
        CreateTargetResponse, ErrorResponse, ListTargetsResponse, NodesResponse, ScenarioDetail,
        ScenarioGlobals, ScenarioRunRequest, ScenarioRunStatusResponse, ScenarioRunsResponse,
        ScenarioTag, ScenariosRequest, ScenariosResponse, TargetOperationResponse,
        TargetResponse, TargetStatus,
    },
    ConsoleSettings,
};
use log::{debug, trace, warn};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the operator API. Every call is bounded by the configured
/// request timeout and every failure is reported as a [`GenericError`].
#[derive(Clone)]
pub struct OperatorClient {
    base_url: Url,
    http: reqwest::Client,
}

impl OperatorClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, GenericError> {
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            GenericError::ConfigError(format!("Invalid API base url '{}': {}", base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GenericError::ConfigError(format!(
                "API base url '{}' cannot carry a path",
                base_url
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GenericError::ConfigError(e.to_string()))?;
        Ok(Self { base_url, http })
    }

    pub fn from_settings(settings: &ConsoleSettings) -> Result<Self, GenericError> {
        Self::new(&settings.api_base_url, settings.request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base url, percent-encoding each one
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        trace!("{} {}", method, url);
        self.http.request(method, url)
    }

    /// Send a request and decode a successful JSON body
    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, GenericError> {
        let resp = req.send().await.map_err(map_reqwest_error)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error_from_body(status.as_u16(), &body));
        }
        let body = resp.text().await.map_err(map_reqwest_error)?;
        serde_json::from_str(&body).map_err(|e| {
            debug!("Undecodable response body: {}", body);
            GenericError::ParseError(e.to_string())
        })
    }

    /// Send a request whose successful body is irrelevant
    async fn send_empty(&self, req: RequestBuilder) -> Result<(), GenericError> {
        let resp = req.send().await.map_err(map_reqwest_error)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error_from_body(status.as_u16(), &body));
        }
        Ok(())
    }

    fn registry_body(registry: Option<&ScenariosRequest>) -> ScenariosRequest {
        registry.cloned().unwrap_or_default()
    }
}

/// Map a transport failure onto the error taxonomy
pub fn map_reqwest_error(e: reqwest::Error) -> GenericError {
    if e.is_timeout() {
        GenericError::Timeout(e.to_string())
    } else if e.is_decode() {
        GenericError::ParseError(e.to_string())
    } else if let Some(status) = e.status() {
        GenericError::Api {
            status: status.as_u16(),
            message: e.to_string(),
        }
    } else {
        GenericError::Network(e.to_string())
    }
}

/// Build an API error from a non-success response, preferring the message
/// carried in an `{error, message}` body.
pub fn api_error_from_body(status: u16, body: &str) -> GenericError {
    let decoded = serde_json::from_str::<ErrorResponse>(body).unwrap_or_default();
    let message = if !decoded.message.is_empty() {
        decoded.message
    } else if !decoded.error.is_empty() {
        decoded.error
    } else if !body.trim().is_empty() && !body.trim_start().starts_with('{') {
        body.trim().to_string()
    } else {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown status");
        format!("Request failed with status {} {}", status, reason)
    };
    GenericError::Api { status, message }
}

#[async_trait]
impl OperatorAPI for OperatorClient {
    async fn create_target_request(&self) -> Result<String, GenericError> {
        let req = self.request(Method::POST, self.url(&["targets"]));
        let resp: CreateTargetResponse = self.send_json(req).await?;
        debug!("Created target request {}", resp.uuid);
        Ok(resp.uuid)
    }

    async fn get_target_status(&self, uuid: &str) -> Result<TargetStatus, GenericError> {
        let resp = self
            .request(Method::GET, self.url(&["targets", uuid]))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Ok(TargetStatus::from(resp.status().as_u16()))
    }

    async fn get_clusters(&self, uuid: &str) -> Result<ClusterMap, GenericError> {
        let mut url = self.url(&["clusters"]);
        url.query_pairs_mut().append_pair("id", uuid);
        let resp: ClustersResponse = self.send_json(self.request(Method::GET, url)).await?;
        Ok(resp.target_data)
    }

    async fn get_nodes(&self, uuid: &str, cluster_name: &str) -> Result<Vec<String>, GenericError> {
        let mut url = self.url(&["nodes"]);
        url.query_pairs_mut()
            .append_pair("id", uuid)
            .append_pair("cluster-name", cluster_name);
        let resp: NodesResponse = self.send_json(self.request(Method::GET, url)).await?;
        Ok(resp.nodes)
    }

    async fn get_scenarios(
        &self,
        registry: Option<&ScenariosRequest>,
    ) -> Result<Vec<ScenarioTag>, GenericError> {
        let req = self
            .request(Method::POST, self.url(&["scenarios"]))
            .json(&Self::registry_body(registry));
        let resp: ScenariosResponse = self.send_json(req).await?;
        Ok(resp.scenarios)
    }

    async fn get_scenario_detail(
        &self,
        scenario_name: &str,
        registry: Option<&ScenariosRequest>,
    ) -> Result<ScenarioDetail, GenericError> {
        let req = self
            .request(
                Method::POST,
                self.url(&["scenarios", "detail", scenario_name]),
            )
            .json(&Self::registry_body(registry));
        self.send_json(req).await
    }

    async fn get_scenario_globals(
        &self,
        scenario_name: &str,
        registry: Option<&ScenariosRequest>,
    ) -> Result<ScenarioGlobals, GenericError> {
        let req = self
            .request(
                Method::POST,
                self.url(&["scenarios", "globals", scenario_name]),
            )
            .json(&Self::registry_body(registry));
        self.send_json(req).await
    }

    async fn run_scenario(
        &self,
        request: &ScenarioRunRequest,
    ) -> Result<CreateScenarioRunResponse, GenericError> {
        let req = self
            .request(Method::POST, self.url(&["scenarios", "run"]))
            .json(request);
        self.send_json(req).await
    }

    async fn get_scenario_run_status(
        &self,
        scenario_run_name: &str,
    ) -> Result<ScenarioRunStatusResponse, GenericError> {
        let req = self.request(
            Method::GET,
            self.url(&["scenarios", "run", scenario_run_name]),
        );
        self.send_json(req).await
    }

    async fn list_scenario_runs(&self) -> Result<Vec<ScenarioRunStatusResponse>, GenericError> {
        let req = self.request(Method::GET, self.url(&["scenarios", "run"]));
        match self.send_json::<ScenarioRunsResponse>(req).await {
            Ok(resp) => Ok(resp.scenario_runs),
            Err(GenericError::Api { status, .. }) if status == 404 || status == 405 => {
                warn!("Scenario run listing is not supported by this operator");
                Ok(vec![])
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_scenario_run(&self, scenario_run_name: &str) -> Result<(), GenericError> {
        let req = self.request(
            Method::DELETE,
            self.url(&["scenarios", "run", scenario_run_name]),
        );
        self.send_empty(req).await
    }

    async fn cancel_job(&self, scenario_run_name: &str, job_id: &str) -> Result<(), GenericError> {
        let req = self.request(
            Method::DELETE,
            self.url(&["scenarios", "run", scenario_run_name, "jobs", job_id]),
        );
        self.send_empty(req).await
    }

    async fn list_targets(&self) -> Result<Vec<TargetResponse>, GenericError> {
        let req = self.request(Method::GET, self.url(&["operator", "targets"]));
        let resp: ListTargetsResponse = self.send_json(req).await?;
        Ok(resp.targets)
    }

    async fn get_target(&self, uuid: &str) -> Result<TargetResponse, GenericError> {
        let req = self.request(Method::GET, self.url(&["operator", "targets", uuid]));
        self.send_json(req).await
    }

    async fn create_target(
        &self,
        request: &CreateTargetRequest,
    ) -> Result<TargetOperationResponse, GenericError> {
        let req = self
            .request(Method::POST, self.url(&["operator", "targets"]))
            .json(request);
        self.send_json(req).await
    }

    async fn update_target(
        &self,
        uuid: &str,
        request: &CreateTargetRequest,
    ) -> Result<TargetOperationResponse, GenericError> {
        let req = self
            .request(Method::PUT, self.url(&["operator", "targets", uuid]))
            .json(request);
        self.send_json(req).await
    }

    async fn delete_target(&self, uuid: &str) -> Result<TargetOperationResponse, GenericError> {
        let req = self.request(Method::DELETE, self.url(&["operator", "targets", uuid]));
        self.send_json(req).await
    }
}
