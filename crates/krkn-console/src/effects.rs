/// Effects module handles side effects (I/O against the operator API, pollers).
/// Effects observe actions after they are reduced and dispatch new Actions
/// with the results.
use crate::actions::{Action, Notification};
use crate::dispatcher::Dispatcher;
use crate::stores::{WorkflowPhase, WorkflowState, WorkflowStore};
use chrono::Utc;
use krkn_api::OperatorAPI;
use krkn_core::{
    exceptions::{AppError, GenericError},
    forms::{build_run_payload, group_clusters, scenario_image, validate_form},
    models::{
        RegistryType, ScenarioField, ScenarioRun, ScenarioRunRequest, ScenariosRequest,
        TargetStatus, TouchedFields,
    },
    ConsoleSettings,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tokio::time::Instant;

/// How long a notification stays visible
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Effects handler that executes side effects based on actions
pub struct Effects {
    dispatcher: Dispatcher,
    api: Arc<dyn OperatorAPI>,
    store: WorkflowStore,
    settings: ConsoleSettings,
    target_poller: Mutex<Option<JoinHandle<()>>>,
    run_pollers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Effects {
    pub fn new(
        dispatcher: Dispatcher,
        api: Arc<dyn OperatorAPI>,
        store: WorkflowStore,
        settings: ConsoleSettings,
    ) -> Self {
        Self {
            dispatcher,
            api,
            store,
            settings,
            target_poller: Mutex::new(None),
            run_pollers: Mutex::new(HashMap::new()),
        }
    }

    /// Handle an action that has already been reduced into the store
    pub fn handle(&self, action: &Action) {
        match action {
            Action::InitStart => self.create_target_request(),
            Action::Retry => {
                self.stop_target_poller();
                self.dispatcher.dispatch(Action::InitStart);
            }
            Action::InitSuccess(uuid) => self.start_target_poller(uuid.clone()),
            Action::PollSuccess => match self.store.phase() {
                WorkflowPhase::JobsList => self.fetch_scenario_runs(),
                WorkflowPhase::SelectingClusters => self.fetch_clusters_if_missing(),
                _ => {}
            },
            Action::JobsListReady | Action::RefreshScenarioRuns => self.fetch_scenario_runs(),
            Action::StartCreateWorkflow => self.fetch_clusters_if_missing(),
            Action::ScenariosLoading => self.fetch_scenarios(),
            Action::SelectScenarioForDetail(name) => self.fetch_scenario_detail(name.clone()),
            Action::SubmitScenarioRun => self.submit_scenario_run(),
            Action::RequestCancelJob {
                scenario_run_name,
                job_id,
            } => self.cancel_job(scenario_run_name.clone(), job_id.clone()),
            Action::RequestDeleteRun(name) => self.delete_run(name.clone()),
            Action::ShowNotification(notification) => self.expire_notification(notification.id),
            _ => {
                // Most actions don't require side effects
            }
        }
    }

    fn create_target_request(&self) {
        let dispatcher = self.dispatcher.clone();
        let api = self.api.clone();

        task::spawn(async move {
            log::info!("Creating target request...");
            match api.create_target_request().await {
                Ok(uuid) => {
                    log::info!("Target request {} created", uuid);
                    dispatcher.dispatch(Action::InitSuccess(uuid));
                }
                Err(e) => {
                    log::error!("Failed to create target request: {}", e);
                    dispatcher.dispatch(Action::InitError(e.to_app_error()));
                }
            }
        });
    }

    /// A newer poller supersedes an older one
    fn start_target_poller(&self, uuid: String) {
        let mut poller = self.target_poller.lock().unwrap();
        if let Some(previous) = poller.take() {
            previous.abort();
        }
        *poller = Some(task::spawn(poll_target_until_ready(
            self.api.clone(),
            self.dispatcher.clone(),
            uuid,
            self.settings.poll_interval,
            self.settings.poll_timeout,
            self.settings.debug_mode,
        )));
    }

    fn stop_target_poller(&self) {
        if let Some(previous) = self.target_poller.lock().unwrap().take() {
            previous.abort();
        }
    }

    fn fetch_scenario_runs(&self) {
        let dispatcher = self.dispatcher.clone();
        let api = self.api.clone();
        let store = self.store.clone();

        task::spawn(async move {
            match api.list_scenario_runs().await {
                Ok(statuses) => {
                    let known = store.get_state().scenario_runs;
                    let runs: Vec<ScenarioRun> = statuses
                        .into_iter()
                        .map(|status| {
                            let previous = known
                                .iter()
                                .find(|r| r.scenario_run_name == status.scenario_run_name);
                            ScenarioRun::from_status(status, previous)
                        })
                        .collect();
                    log::debug!("Loaded {} scenario runs", runs.len());
                    dispatcher.dispatch(Action::ScenarioRunsLoaded(runs));
                }
                Err(e) => {
                    log::warn!("Failed to load scenario runs: {}", e);
                    // Don't dispatch error to avoid disrupting user experience
                }
            }
        });
    }

    fn fetch_clusters_if_missing(&self) {
        let state = self.store.get_state();
        if !state.clusters.is_empty() {
            return;
        }
        let uuid = match state.uuid {
            Some(uuid) => uuid,
            None => {
                log::warn!("Cannot discover clusters without a target request");
                return;
            }
        };
        let dispatcher = self.dispatcher.clone();
        let api = self.api.clone();

        task::spawn(async move {
            match api.get_clusters(&uuid).await {
                Ok(clusters) => {
                    let total: usize = clusters.values().map(|c| c.len()).sum();
                    log::info!("Discovered {} clusters", total);
                    dispatcher.dispatch(Action::ClustersSuccess(clusters));
                }
                Err(e) => {
                    log::error!("Failed to fetch clusters: {}", e);
                    dispatcher.dispatch(Action::ClustersError(e.to_app_error()));
                }
            }
        });
    }

    fn fetch_scenarios(&self) {
        let dispatcher = self.dispatcher.clone();
        let api = self.api.clone();
        let store = self.store.clone();
        let registry = self.store.get_state().registry_config;

        task::spawn(async move {
            let result = api.get_scenarios(registry.as_ref()).await;
            if store.phase() != WorkflowPhase::LoadingScenarios {
                log::debug!("Dropping scenario list, workflow moved on");
                return;
            }
            match result {
                Ok(scenarios) => dispatcher.dispatch(Action::ScenariosSuccess(scenarios)),
                Err(e) => {
                    log::error!("Failed to fetch scenarios: {}", e);
                    dispatcher.dispatch(Action::ScenariosError(e.to_app_error()));
                }
            }
        });
    }

    /// Detail and globals are fetched concurrently; globals are optional
    fn fetch_scenario_detail(&self, scenario_name: String) {
        let dispatcher = self.dispatcher.clone();
        let api = self.api.clone();
        let store = self.store.clone();
        let registry = self.store.get_state().registry_config;

        task::spawn(async move {
            let (detail, globals) = tokio::join!(
                api.get_scenario_detail(&scenario_name, registry.as_ref()),
                api.get_scenario_globals(&scenario_name, registry.as_ref()),
            );
            let state = store.get_state();
            if state.phase != WorkflowPhase::LoadingScenarioDetail
                || state.selected_scenario.as_deref() != Some(scenario_name.as_str())
            {
                log::debug!("Dropping detail for {}, workflow moved on", scenario_name);
                return;
            }
            match detail {
                Ok(detail) => dispatcher.dispatch(Action::ScenarioDetailSuccess(detail)),
                Err(e) => {
                    log::error!("Failed to fetch scenario detail: {}", e);
                    dispatcher.dispatch(Action::ScenarioDetailError(e.to_app_error()));
                    return;
                }
            }
            match globals {
                Ok(globals) => dispatcher.dispatch(Action::ScenarioGlobalsSuccess(globals)),
                Err(e) => {
                    log::warn!("Scenario globals unavailable: {}", e);
                    dispatcher.dispatch(Action::ScenarioGlobalsFailed(e.to_app_error()));
                }
            }
        });
    }

    fn submit_scenario_run(&self) {
        let dispatcher = self.dispatcher.clone();
        let api = self.api.clone();
        let state = self.store.get_state();
        let request = build_run_request(&state, &self.settings);

        task::spawn(async move {
            let request = match request {
                Ok(request) => request,
                Err(e) => {
                    log::warn!("Scenario run rejected: {}", e);
                    dispatcher.dispatch(Action::ScenariosRunBatchError(e.to_app_error()));
                    return;
                }
            };
            log::info!(
                "Submitting {} to {} clusters",
                request.scenario_name,
                request.target_clusters.values().map(|c| c.len()).sum::<usize>()
            );
            match api.run_scenario(&request).await {
                Ok(resp) => {
                    log::info!("Scenario run {} created", resp.scenario_run_name);
                    let run = ScenarioRun::submitted(&resp, &request.scenario_name, Utc::now());
                    dispatcher.dispatch(Action::ScenarioRunAdded(run));
                    dispatcher.dispatch(Action::ScenariosRunBatchSuccess);
                }
                Err(e) => {
                    log::error!("Failed to create scenario run: {}", e);
                    dispatcher.dispatch(Action::ScenariosRunBatchError(e.to_app_error()));
                }
            }
        });
    }

    /// Fire and forget; the outcome shows up on the next run poll
    fn cancel_job(&self, scenario_run_name: String, job_id: String) {
        let dispatcher = self.dispatcher.clone();
        let api = self.api.clone();

        task::spawn(async move {
            if let Err(e) = api.cancel_job(&scenario_run_name, &job_id).await {
                log::warn!("Failed to cancel job {}: {}", job_id, e);
                dispatcher.dispatch(Action::ShowNotification(Notification::danger(
                    "Failed to cancel job",
                    &e.message(),
                )));
            }
        });
    }

    fn delete_run(&self, scenario_run_name: String) {
        let dispatcher = self.dispatcher.clone();
        let api = self.api.clone();

        task::spawn(async move {
            match api.delete_scenario_run(&scenario_run_name).await {
                Ok(()) => {
                    log::info!("Deleted scenario run {}", scenario_run_name);
                    dispatcher.dispatch(Action::ScenarioRunRemoved(scenario_run_name));
                }
                Err(e) => {
                    log::warn!("Failed to delete scenario run {}: {}", scenario_run_name, e);
                    dispatcher.dispatch(Action::ShowNotification(Notification::danger(
                        "Failed to delete scenario run",
                        &e.message(),
                    )));
                }
            }
        });
    }

    fn expire_notification(&self, id: u64) {
        let dispatcher = self.dispatcher.clone();
        task::spawn(async move {
            tokio::time::sleep(NOTIFICATION_TTL).await;
            dispatcher.dispatch(Action::HideNotification(id));
        });
    }

    /// Keep exactly one poller per non-terminal run. Pollers for runs that
    /// finished or disappeared are torn down.
    pub fn reconcile_run_pollers(&self) {
        let state = self.store.get_state();
        let active = state.active_run_names();
        let mut pollers = self.run_pollers.lock().unwrap();

        pollers.retain(|name, poller| {
            let keep = active.contains(name);
            if !keep {
                log::debug!("Stopping poller for scenario run {}", name);
                poller.abort();
            }
            keep
        });

        for name in active {
            if pollers.contains_key(&name) {
                continue;
            }
            let Some(run) = state.run(&name).cloned() else {
                continue;
            };
            log::debug!("Starting poller for scenario run {}", name);
            let poller = task::spawn(poll_scenario_run(
                self.api.clone(),
                self.dispatcher.clone(),
                run,
                self.settings.run_poll_interval,
                self.settings.debug_mode,
            ));
            pollers.insert(name, poller);
        }
    }

    /// Names of runs that currently have a poller
    pub fn active_pollers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.run_pollers.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Abort every background task
    pub fn shutdown(&self) {
        self.stop_target_poller();
        for (_, poller) in self.run_pollers.lock().unwrap().drain() {
            poller.abort();
        }
    }
}

/// Level poll ticks are logged at. `KRKN_DEBUG_MODE` raises them to info.
pub fn poll_log_level(verbose: bool) -> log::Level {
    if verbose {
        log::Level::Info
    } else {
        log::Level::Trace
    }
}

/// Poll target readiness until it is ready, gone, failing or too slow.
/// Exactly one of `PollSuccess` or `PollError` is dispatched.
pub async fn poll_target_until_ready(
    api: Arc<dyn OperatorAPI>,
    dispatcher: Dispatcher,
    uuid: String,
    interval: Duration,
    timeout: Duration,
    verbose: bool,
) {
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            log::warn!("Target request {} not ready after {:?}", uuid, timeout);
            dispatcher.dispatch(Action::PollError(AppError::timeout(format!(
                "Target request did not complete within {} seconds",
                timeout.as_secs()
            ))));
            return;
        }

        attempt += 1;
        log::log!(
            poll_log_level(verbose),
            "Polling target request {} (attempt {}, {:?} elapsed)",
            uuid,
            attempt,
            elapsed
        );
        dispatcher.dispatch(Action::PollAttempt(attempt));
        let status = match tokio::time::timeout(timeout - elapsed, api.get_target_status(&uuid))
            .await
        {
            Ok(status) => status,
            Err(_) => Err(GenericError::Timeout(format!(
                "Target request did not complete within {} seconds",
                timeout.as_secs()
            ))),
        };

        match status {
            Ok(TargetStatus::Ready) => {
                log::info!("Target request {} ready after {} polls", uuid, attempt);
                dispatcher.dispatch(Action::PollSuccess);
                return;
            }
            Ok(TargetStatus::Pending) => {
                log::debug!("Target request {} still pending (attempt {})", uuid, attempt);
            }
            Ok(TargetStatus::NotFound) => {
                dispatcher.dispatch(Action::PollError(AppError::not_found(format!(
                    "Target request {} not found",
                    uuid
                ))));
                return;
            }
            Ok(TargetStatus::Unexpected(code)) => {
                dispatcher.dispatch(Action::PollError(AppError::api(format!(
                    "Unexpected status {} while polling target request",
                    code
                ))));
                return;
            }
            Err(e) => {
                log::error!("Target poll failed: {}", e);
                dispatcher.dispatch(Action::PollError(e.to_app_error()));
                return;
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Poll one scenario run until it reaches a terminal phase. Failures are
/// logged and retried on the next tick; updates are only dispatched when
/// something visible changed.
pub async fn poll_scenario_run(
    api: Arc<dyn OperatorAPI>,
    dispatcher: Dispatcher,
    mut last: ScenarioRun,
    interval: Duration,
    verbose: bool,
) {
    let name = last.scenario_run_name.clone();
    while !last.is_terminal() {
        tokio::time::sleep(interval).await;
        log::log!(
            poll_log_level(verbose),
            "Polling scenario run {} ({:?})",
            name,
            last.phase
        );
        match api.get_scenario_run_status(&name).await {
            Ok(status) => {
                let next = ScenarioRun::from_status(status, Some(&last));
                if last.has_changes(&next) {
                    dispatcher.dispatch(Action::ScenarioRunUpdated(next.clone()));
                }
                last = next;
            }
            Err(e) => {
                log::debug!("Failed to poll scenario run {}: {}", name, e);
            }
        }
    }
    log::debug!("Scenario run {} finished with {:?}", name, last.phase);
}

fn touched_fields(fields: &[ScenarioField], touched: &TouchedFields) -> Vec<ScenarioField> {
    fields
        .iter()
        .filter(|f| touched.get(&f.meta.variable).copied().unwrap_or(false))
        .cloned()
        .collect()
}

/// Assemble the run request from the workflow state
pub fn build_run_request(
    state: &WorkflowState,
    settings: &ConsoleSettings,
) -> Result<ScenarioRunRequest, GenericError> {
    let uuid = state
        .uuid
        .clone()
        .ok_or_else(|| GenericError::Validation(vec!["No target request available".to_string()]))?;
    if state.selected_clusters.is_empty() {
        return Err(GenericError::Validation(vec![
            "Select at least one cluster".to_string()
        ]));
    }
    let detail = state
        .scenario_detail
        .as_ref()
        .ok_or_else(|| GenericError::Validation(vec!["No scenario configured".to_string()]))?;

    validate_form(&detail.fields, &state.scenario_form_values)?;
    if let Some(globals) = &state.scenario_globals {
        let touched = touched_fields(&globals.fields, &state.global_touched_fields);
        validate_form(&touched, &state.global_form_values)?;
    }

    let scenario_name = state
        .selected_scenario
        .clone()
        .unwrap_or_else(|| detail.name.clone());
    let payload = build_run_payload(
        detail,
        &state.scenario_form_values,
        state
            .scenario_globals
            .as_ref()
            .map(|g| (g, &state.global_form_values, &state.global_touched_fields)),
    );

    let registry = match state.registry_type {
        Some(RegistryType::Private) => state.registry_config.clone(),
        _ => None,
    };
    let ScenariosRequest {
        username,
        password,
        token,
        registry_url,
        scenario_repository,
        skip_tls,
        insecure,
    } = registry.clone().unwrap_or_default();

    Ok(ScenarioRunRequest {
        target_request_id: uuid,
        target_clusters: group_clusters(&state.selected_clusters),
        scenario_image: scenario_image(
            registry.as_ref(),
            &scenario_name,
            &settings.default_scenario_image,
        ),
        scenario_name,
        kubeconfig_path: Some(settings.kubeconfig_path.clone()),
        environment: payload.environment,
        files: payload.files,
        registry_url,
        scenario_repository,
        username,
        password,
        token,
        skip_tls,
        insecure,
    })
}
