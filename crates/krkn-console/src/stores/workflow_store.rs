/// WorkflowStore holds the single live workflow and applies the reducer
use crate::actions::{Action, Notification};
use krkn_core::{
    exceptions::AppError,
    models::{
        ClusterMap, FormValues, RegistryType, ScenarioDetail, ScenarioGlobals, ScenarioRun,
        ScenarioTag, ScenariosRequest, SelectedCluster, TouchedFields,
    },
    WorkflowVariant,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;

/// Which screen of the console is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkflowPhase {
    Initializing,
    Polling,
    JobsList,
    Settings,
    SelectingClusters,
    ConfiguringRegistry,
    LoadingScenarios,
    SelectingScenarios,
    LoadingScenarioDetail,
    ConfiguringScenario,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub phase: WorkflowPhase,
    pub variant: WorkflowVariant,

    /// Target request uuid returned by initialization
    pub uuid: Option<String>,
    pub poll_attempts: u32,

    pub scenario_runs: Vec<ScenarioRun>,
    pub expanded_run_ids: BTreeSet<String>,
    pub expanded_cluster_jobs: BTreeSet<String>,

    /// Discovered clusters, kept across workflows as a cache
    pub clusters: ClusterMap,
    pub selected_clusters: Vec<SelectedCluster>,

    pub registry_type: Option<RegistryType>,
    pub registry_config: Option<ScenariosRequest>,
    pub scenarios: Vec<ScenarioTag>,
    pub selected_scenarios: Vec<String>,

    pub selected_scenario: Option<String>,
    pub scenario_detail: Option<ScenarioDetail>,
    pub scenario_form_values: FormValues,
    pub scenario_globals: Option<ScenarioGlobals>,
    pub global_form_values: FormValues,
    pub global_touched_fields: TouchedFields,
    pub globals_error: Option<AppError>,

    pub error: Option<AppError>,
    pub notifications: Vec<Notification>,
}

impl WorkflowState {
    pub fn initial(variant: WorkflowVariant) -> Self {
        Self {
            phase: WorkflowPhase::Initializing,
            variant,
            uuid: None,
            poll_attempts: 0,
            scenario_runs: Vec::new(),
            expanded_run_ids: BTreeSet::new(),
            expanded_cluster_jobs: BTreeSet::new(),
            clusters: ClusterMap::new(),
            selected_clusters: Vec::new(),
            registry_type: None,
            registry_config: None,
            scenarios: Vec::new(),
            selected_scenarios: Vec::new(),
            selected_scenario: None,
            scenario_detail: None,
            scenario_form_values: FormValues::new(),
            scenario_globals: None,
            global_form_values: FormValues::new(),
            global_touched_fields: TouchedFields::new(),
            globals_error: None,
            error: None,
            notifications: Vec::new(),
        }
    }

    pub fn is_cluster_selected(&self, cluster: &SelectedCluster) -> bool {
        self.selected_clusters.iter().any(|c| c.same_cluster(cluster))
    }

    pub fn run(&self, scenario_run_name: &str) -> Option<&ScenarioRun> {
        self.scenario_runs
            .iter()
            .find(|r| r.scenario_run_name == scenario_run_name)
    }

    /// Names of the runs that still need polling
    pub fn active_run_names(&self) -> BTreeSet<String> {
        self.scenario_runs
            .iter()
            .filter(|r| !r.is_terminal())
            .map(|r| r.scenario_run_name.clone())
            .collect()
    }

    fn clear_scenario_configuration(&mut self) {
        self.selected_scenario = None;
        self.scenario_detail = None;
        self.scenario_form_values.clear();
        self.scenario_globals = None;
        self.global_form_values.clear();
        self.global_touched_fields.clear();
        self.globals_error = None;
    }

    fn clear_scenario_selection(&mut self) {
        self.scenarios.clear();
        self.selected_scenarios.clear();
    }

    fn clear_registry(&mut self) {
        self.registry_type = None;
        self.registry_config = None;
    }

    /// Drop everything a create-run workflow accumulated
    fn clear_transient_workflow(&mut self) {
        self.selected_clusters.clear();
        self.clear_registry();
        self.clear_scenario_selection();
        self.clear_scenario_configuration();
    }

    fn fail(&mut self, error: &AppError) {
        self.phase = WorkflowPhase::Error;
        self.error = Some(error.clone());
    }
}

/// Compute the next workflow state. Pure: performs no I/O and never panics.
/// Actions irrelevant to the workflow leave the state unchanged.
pub fn reduce(state: &WorkflowState, action: &Action) -> WorkflowState {
    let mut next = state.clone();

    match action {
        Action::InitStart => {
            next.phase = WorkflowPhase::Initializing;
            next.error = None;
        }
        Action::InitSuccess(uuid) => {
            next.phase = WorkflowPhase::Polling;
            next.uuid = Some(uuid.clone());
            next.poll_attempts = 0;
        }

        Action::PollAttempt(attempt) => {
            next.poll_attempts = *attempt;
        }
        Action::PollSuccess => {
            next.phase = match next.variant {
                WorkflowVariant::JobsListLanding => WorkflowPhase::JobsList,
                WorkflowVariant::DirectClusterSelection => WorkflowPhase::SelectingClusters,
            };
        }

        Action::JobsListReady => {
            next.phase = WorkflowPhase::JobsList;
        }
        Action::ScenarioRunsLoaded(runs) => {
            next.scenario_runs = runs.clone();
            let known: BTreeSet<&String> = runs.iter().map(|r| &r.scenario_run_name).collect();
            next.expanded_run_ids.retain(|id| known.contains(id));
        }
        Action::ScenarioRunAdded(run) => {
            match next
                .scenario_runs
                .iter_mut()
                .find(|r| r.scenario_run_name == run.scenario_run_name)
            {
                Some(existing) => *existing = run.clone(),
                None => next.scenario_runs.push(run.clone()),
            }
        }
        Action::ScenarioRunUpdated(run) => {
            // updates for runs removed in the meantime are dropped
            if let Some(existing) = next
                .scenario_runs
                .iter_mut()
                .find(|r| r.scenario_run_name == run.scenario_run_name)
            {
                *existing = run.clone();
            }
        }
        Action::ScenarioRunRemoved(name) => {
            if let Some(pos) = next
                .scenario_runs
                .iter()
                .position(|r| &r.scenario_run_name == name)
            {
                let removed = next.scenario_runs.remove(pos);
                for job in &removed.cluster_jobs {
                    next.expanded_cluster_jobs.remove(&job.job_id);
                }
            }
            next.expanded_run_ids.remove(name);
        }
        Action::ToggleRunAccordion(name) => {
            if !next.expanded_run_ids.remove(name) {
                next.expanded_run_ids.insert(name.clone());
            }
        }
        Action::ToggleClusterJobAccordion(job_id) => {
            if !next.expanded_cluster_jobs.remove(job_id) {
                next.expanded_cluster_jobs.insert(job_id.clone());
            }
        }

        Action::StartCreateWorkflow => {
            next.clear_transient_workflow();
            next.phase = WorkflowPhase::SelectingClusters;
        }
        Action::CancelWorkflow => {
            next.clear_transient_workflow();
            next.phase = WorkflowPhase::JobsList;
        }

        Action::ClustersSuccess(clusters) => {
            next.clusters = clusters.clone();
        }
        Action::ToggleCluster(cluster) => {
            match next
                .selected_clusters
                .iter()
                .position(|c| c.same_cluster(cluster))
            {
                Some(pos) => {
                    next.selected_clusters.remove(pos);
                }
                None => next.selected_clusters.push(cluster.clone()),
            }
        }
        Action::ClustersSelected => {
            next.phase = WorkflowPhase::ConfiguringRegistry;
        }

        Action::ConfigureRegistry => {
            next.phase = WorkflowPhase::ConfiguringRegistry;
        }
        Action::RegistryConfigured {
            registry_type,
            config,
        } => {
            next.registry_type = Some(*registry_type);
            next.registry_config = config.clone();
        }
        Action::ScenariosLoading => {
            next.phase = WorkflowPhase::LoadingScenarios;
        }
        Action::ScenariosSuccess(scenarios) => {
            next.scenarios = scenarios.clone();
            next.phase = WorkflowPhase::SelectingScenarios;
        }
        Action::SelectScenarios(names) => {
            next.selected_scenarios = names.clone();
        }

        Action::SelectScenarioForDetail(name) => {
            next.clear_scenario_configuration();
            next.selected_scenario = Some(name.clone());
            next.phase = WorkflowPhase::LoadingScenarioDetail;
        }
        Action::ScenarioDetailLoading => {
            next.phase = WorkflowPhase::LoadingScenarioDetail;
        }
        Action::ScenarioDetailSuccess(detail) => {
            next.scenario_detail = Some(detail.clone());
            next.phase = WorkflowPhase::ConfiguringScenario;
        }
        Action::ScenarioGlobalsSuccess(globals) => {
            next.scenario_globals = Some(globals.clone());
            next.globals_error = None;
        }
        Action::ScenarioGlobalsFailed(error) => {
            next.globals_error = Some(error.clone());
        }
        Action::UpdateScenarioForm(values) => {
            next.scenario_form_values = values.clone();
        }
        Action::UpdateGlobalForm { values, touched } => {
            next.global_form_values = values.clone();
            next.global_touched_fields = touched.clone();
        }

        Action::ScenariosRunBatchSuccess => {
            next.clear_transient_workflow();
            next.phase = WorkflowPhase::JobsList;
        }

        Action::InitError(error)
        | Action::PollError(error)
        | Action::ClustersError(error)
        | Action::ScenariosError(error)
        | Action::ScenarioDetailError(error)
        | Action::ScenariosRunBatchError(error) => {
            next.fail(error);
        }

        Action::NavigateToSettings => {
            next.phase = WorkflowPhase::Settings;
        }
        Action::GoBack => match next.phase {
            WorkflowPhase::SelectingClusters => {
                next.selected_clusters.clear();
                next.phase = WorkflowPhase::JobsList;
            }
            WorkflowPhase::ConfiguringRegistry => {
                next.clear_registry();
                next.phase = WorkflowPhase::SelectingClusters;
            }
            WorkflowPhase::SelectingScenarios => {
                next.clear_scenario_selection();
                next.phase = WorkflowPhase::ConfiguringRegistry;
            }
            WorkflowPhase::ConfiguringScenario => {
                next.clear_scenario_configuration();
                next.phase = WorkflowPhase::SelectingScenarios;
            }
            WorkflowPhase::Settings => {
                next.phase = WorkflowPhase::JobsList;
            }
            _ => {}
        },
        Action::Retry => {
            return WorkflowState::initial(state.variant);
        }

        Action::ShowNotification(notification) => {
            next.notifications.push(notification.clone());
        }
        Action::HideNotification(id) => {
            next.notifications.retain(|n| n.id != *id);
        }

        Action::SubmitScenarioRun
        | Action::RequestCancelJob { .. }
        | Action::RequestDeleteRun(_)
        | Action::RefreshScenarioRuns
        | Action::Quit => {}
    }

    next
}

/// Store that holds the workflow state. Every change is also published on a
/// watch channel so views can follow the state without polling the store.
#[derive(Clone)]
pub struct WorkflowStore {
    state: Arc<RwLock<WorkflowState>>,
    publisher: Arc<watch::Sender<WorkflowState>>,
    // orders publications without holding the state lock
    publishing: Arc<Mutex<()>>,
}

impl WorkflowStore {
    pub fn new(variant: WorkflowVariant) -> Self {
        let initial = WorkflowState::initial(variant);
        let (publisher, _) = watch::channel(initial.clone());
        Self {
            state: Arc::new(RwLock::new(initial)),
            publisher: Arc::new(publisher),
            publishing: Arc::new(Mutex::new(())),
        }
    }

    /// Get a read-only snapshot of the current state
    pub fn get_state(&self) -> WorkflowState {
        self.state.read().unwrap().clone()
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.state.read().unwrap().phase
    }

    /// Reducer: apply an action, returning whether the state changed
    pub fn reduce(&self, action: &Action) -> bool {
        let _publishing = self.publishing.lock().unwrap();
        let mut state = self.state.write().unwrap();
        let next = reduce(&state, action);
        if next == *state {
            return false;
        }
        if next.phase != state.phase {
            log::debug!(
                "Workflow phase {:?} -> {:?} on {}",
                state.phase,
                next.phase,
                action.name()
            );
        }
        *state = next.clone();
        drop(state);
        self.publisher.send_replace(next);
        true
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.publisher.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krkn_core::models::{
        Cluster, FieldKind, FieldMeta, FormValue, ScenarioField, ScenarioRunPhase,
    };
    use std::collections::BTreeMap;

    fn apply(state: WorkflowState, actions: &[Action]) -> WorkflowState {
        actions.iter().fold(state, |s, a| reduce(&s, a))
    }

    fn initial() -> WorkflowState {
        WorkflowState::initial(WorkflowVariant::JobsListLanding)
    }

    fn cluster(operator: &str, name: &str) -> SelectedCluster {
        SelectedCluster {
            operator_name: operator.to_string(),
            cluster_name: name.to_string(),
            cluster_api_url: format!("https://{}.example:6443", name),
        }
    }

    fn run(name: &str, phase: ScenarioRunPhase) -> ScenarioRun {
        ScenarioRun {
            scenario_run_name: name.to_string(),
            scenario_name: "pod-scenarios".to_string(),
            phase,
            total_targets: 1,
            successful_jobs: 0,
            failed_jobs: 0,
            running_jobs: 0,
            cluster_jobs: vec![],
            created_at: "2025-01-01T10:00:00Z".to_string(),
        }
    }

    fn detail() -> ScenarioDetail {
        ScenarioDetail {
            name: "pod-scenarios".to_string(),
            digest: None,
            size: None,
            last_modified: None,
            title: "Pod Scenarios".to_string(),
            description: String::new(),
            fields: vec![ScenarioField {
                meta: FieldMeta {
                    name: "namespace".to_string(),
                    short_description: "Namespace".to_string(),
                    title: None,
                    description: String::new(),
                    variable: "NAMESPACE".to_string(),
                    default: None,
                    required: true,
                    secret: false,
                },
                kind: FieldKind::String {
                    validator: None,
                    validation_message: None,
                },
            }],
        }
    }

    fn tag(name: &str) -> ScenarioTag {
        ScenarioTag {
            name: name.to_string(),
            digest: None,
            size: None,
            last_modified: None,
        }
    }

    /// State after walking the whole create workflow up to scenario configuration
    fn configuring_scenario() -> WorkflowState {
        apply(
            initial(),
            &[
                Action::InitStart,
                Action::InitSuccess("abc".to_string()),
                Action::PollSuccess,
                Action::StartCreateWorkflow,
                Action::ToggleCluster(cluster("krkn-operator", "prod")),
                Action::ClustersSelected,
                Action::RegistryConfigured {
                    registry_type: RegistryType::Public,
                    config: None,
                },
                Action::ScenariosLoading,
                Action::ScenariosSuccess(vec![tag("pod-scenarios"), tag("node-cpu-hog")]),
                Action::SelectScenarios(vec!["pod-scenarios".to_string()]),
                Action::SelectScenarioForDetail("pod-scenarios".to_string()),
                Action::ScenarioDetailSuccess(detail()),
                Action::UpdateScenarioForm(BTreeMap::from([(
                    "NAMESPACE".to_string(),
                    FormValue::from("default"),
                )])),
            ],
        )
    }

    #[test]
    fn test_initial_state() {
        let state = initial();
        assert_eq!(state.phase, WorkflowPhase::Initializing);
        assert_eq!(state.uuid, None);
        assert!(state.scenario_runs.is_empty());
        assert!(state.selected_clusters.is_empty());
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_end_to_end_lands_per_variant() {
        let actions = [
            Action::InitStart,
            Action::InitSuccess("abc".to_string()),
            Action::PollSuccess,
        ];
        let jobs = apply(initial(), &actions);
        assert_eq!(jobs.phase, WorkflowPhase::JobsList);
        assert_eq!(jobs.uuid.as_deref(), Some("abc"));

        let direct = apply(
            WorkflowState::initial(WorkflowVariant::DirectClusterSelection),
            &actions,
        );
        assert_eq!(direct.phase, WorkflowPhase::SelectingClusters);
        assert_eq!(direct.uuid.as_deref(), Some("abc"));
    }

    #[test]
    fn test_init_success_resets_poll_attempts() {
        let state = apply(
            initial(),
            &[
                Action::InitSuccess("a".to_string()),
                Action::PollAttempt(4),
                Action::InitSuccess("b".to_string()),
            ],
        );
        assert_eq!(state.phase, WorkflowPhase::Polling);
        assert_eq!(state.poll_attempts, 0);
        assert_eq!(state.uuid.as_deref(), Some("b"));
    }

    #[test]
    fn test_poll_attempt_keeps_phase() {
        let state = apply(
            initial(),
            &[Action::InitSuccess("abc".to_string()), Action::PollAttempt(3)],
        );
        assert_eq!(state.phase, WorkflowPhase::Polling);
        assert_eq!(state.poll_attempts, 3);
    }

    #[test]
    fn test_every_error_event_enters_error_phase() {
        let err = AppError::network("connection refused");
        for action in [
            Action::InitError(err.clone()),
            Action::PollError(err.clone()),
            Action::ClustersError(err.clone()),
            Action::ScenariosError(err.clone()),
            Action::ScenarioDetailError(err.clone()),
            Action::ScenariosRunBatchError(err.clone()),
        ] {
            let state = reduce(&configuring_scenario(), &action);
            assert_eq!(state.phase, WorkflowPhase::Error, "{}", action.name());
            assert_eq!(state.error, Some(err.clone()));
        }
    }

    #[test]
    fn test_toggle_cluster_twice_is_identity() {
        let base = apply(
            initial(),
            &[
                Action::ToggleCluster(cluster("acm", "edge-1")),
                Action::ToggleCluster(cluster("krkn", "prod")),
            ],
        );
        let c = cluster("acm", "edge-2");
        let toggled = apply(
            base.clone(),
            &[Action::ToggleCluster(c.clone()), Action::ToggleCluster(c)],
        );
        assert_eq!(toggled, base);
    }

    #[test]
    fn test_toggle_cluster_uses_identity_not_url() {
        let mut other_url = cluster("krkn", "prod");
        other_url.cluster_api_url = "https://elsewhere:6443".to_string();
        let state = apply(
            initial(),
            &[
                Action::ToggleCluster(cluster("krkn", "prod")),
                Action::ToggleCluster(other_url),
            ],
        );
        assert!(state.selected_clusters.is_empty());

        // same cluster name under another provider is a different cluster
        let state = apply(
            initial(),
            &[
                Action::ToggleCluster(cluster("krkn", "prod")),
                Action::ToggleCluster(cluster("acm", "prod")),
            ],
        );
        assert_eq!(state.selected_clusters.len(), 2);
    }

    #[test]
    fn test_toggle_order_insensitive() {
        let a = cluster("acm", "a");
        let b = cluster("acm", "b");
        let c = cluster("krkn", "c");
        let one = apply(
            initial(),
            &[
                Action::ToggleCluster(a.clone()),
                Action::ToggleCluster(b.clone()),
                Action::ToggleCluster(c.clone()),
                Action::ToggleCluster(a.clone()),
            ],
        );
        let two = apply(
            initial(),
            &[Action::ToggleCluster(c.clone()), Action::ToggleCluster(b.clone())],
        );
        let as_set = |s: &WorkflowState| -> BTreeSet<(String, String)> {
            s.selected_clusters
                .iter()
                .map(|c| (c.operator_name.clone(), c.cluster_name.clone()))
                .collect()
        };
        assert_eq!(as_set(&one), as_set(&two));
        assert!(!one.is_cluster_selected(&a));
    }

    #[test]
    fn test_go_back_chain_clears_forward_state() {
        let configuring = configuring_scenario();
        assert_eq!(configuring.phase, WorkflowPhase::ConfiguringScenario);

        let selecting = reduce(&configuring, &Action::GoBack);
        assert_eq!(selecting.phase, WorkflowPhase::SelectingScenarios);
        assert_eq!(selecting.selected_scenario, None);
        assert_eq!(selecting.scenario_detail, None);
        assert!(selecting.scenario_form_values.is_empty());
        assert_eq!(selecting.scenarios.len(), 2);
        assert_eq!(selecting.selected_scenarios, vec!["pod-scenarios".to_string()]);

        let registry = reduce(&selecting, &Action::GoBack);
        assert_eq!(registry.phase, WorkflowPhase::ConfiguringRegistry);
        assert!(registry.scenarios.is_empty());
        assert!(registry.selected_scenarios.is_empty());
        assert_eq!(registry.registry_type, Some(RegistryType::Public));

        let clusters = reduce(&registry, &Action::GoBack);
        assert_eq!(clusters.phase, WorkflowPhase::SelectingClusters);
        assert_eq!(clusters.registry_type, None);
        assert_eq!(clusters.registry_config, None);
        assert_eq!(clusters.selected_clusters.len(), 1);

        let jobs = reduce(&clusters, &Action::GoBack);
        assert_eq!(jobs.phase, WorkflowPhase::JobsList);
        assert!(jobs.selected_clusters.is_empty());
        assert_eq!(jobs.uuid.as_deref(), Some("abc"));
    }

    #[test]
    fn test_go_back_clears_globals() {
        let state = apply(
            configuring_scenario(),
            &[
                Action::ScenarioGlobalsFailed(AppError::api("no globals")),
                Action::UpdateGlobalForm {
                    values: BTreeMap::from([("WAIT_DURATION".to_string(), FormValue::from("5"))]),
                    touched: BTreeMap::from([("WAIT_DURATION".to_string(), true)]),
                },
                Action::GoBack,
            ],
        );
        assert_eq!(state.globals_error, None);
        assert!(state.global_form_values.is_empty());
        assert!(state.global_touched_fields.is_empty());
        assert_eq!(state.scenario_globals, None);
    }

    #[test]
    fn test_go_back_from_settings() {
        let state = apply(
            initial(),
            &[Action::PollSuccess, Action::NavigateToSettings],
        );
        assert_eq!(state.phase, WorkflowPhase::Settings);
        assert_eq!(reduce(&state, &Action::GoBack).phase, WorkflowPhase::JobsList);
    }

    #[test]
    fn test_go_back_is_noop_elsewhere() {
        for state in [
            initial(),
            apply(initial(), &[Action::InitSuccess("abc".to_string())]),
            apply(initial(), &[Action::InitError(AppError::timeout("slow"))]),
            apply(initial(), &[Action::PollSuccess]),
            apply(initial(), &[Action::ScenariosLoading]),
        ] {
            assert_eq!(reduce(&state, &Action::GoBack), state);
        }
    }

    #[test]
    fn test_retry_restores_initial_state() {
        let states = [
            configuring_scenario(),
            reduce(&configuring_scenario(), &Action::PollError(AppError::not_found("gone"))),
            apply(
                initial(),
                &[
                    Action::ScenarioRunAdded(run("r1", ScenarioRunPhase::Running)),
                    Action::ShowNotification(Notification::danger("x", "y")),
                ],
            ),
        ];
        for state in states {
            assert_eq!(reduce(&state, &Action::Retry), initial());
        }
        let direct = WorkflowState::initial(WorkflowVariant::DirectClusterSelection);
        let direct_run = apply(direct.clone(), &[Action::PollSuccess, Action::Retry]);
        assert_eq!(direct_run, direct);
    }

    #[test]
    fn test_batch_success_clears_transient_fields() {
        let state = apply(
            configuring_scenario(),
            &[
                Action::ScenarioRunAdded(run("pod-scenarios-abc12", ScenarioRunPhase::Pending)),
                Action::ScenariosRunBatchSuccess,
            ],
        );
        assert_eq!(state.phase, WorkflowPhase::JobsList);
        assert!(state.selected_clusters.is_empty());
        assert_eq!(state.registry_config, None);
        assert_eq!(state.registry_type, None);
        assert!(state.selected_scenarios.is_empty());
        assert!(state.scenarios.is_empty());
        assert!(state.scenario_form_values.is_empty());
        assert_eq!(state.scenario_runs.len(), 1);
        assert_eq!(state.uuid.as_deref(), Some("abc"));
    }

    #[test]
    fn test_cancel_workflow_returns_to_jobs_list() {
        let state = reduce(&configuring_scenario(), &Action::CancelWorkflow);
        assert_eq!(state.phase, WorkflowPhase::JobsList);
        assert!(state.selected_clusters.is_empty());
        assert_eq!(state.scenario_detail, None);
    }

    #[test]
    fn test_start_create_workflow_starts_clean() {
        let state = apply(
            initial(),
            &[
                Action::PollSuccess,
                Action::ToggleCluster(cluster("krkn", "stale")),
                Action::StartCreateWorkflow,
            ],
        );
        assert_eq!(state.phase, WorkflowPhase::SelectingClusters);
        assert!(state.selected_clusters.is_empty());
    }

    #[test]
    fn test_clusters_success_keeps_phase() {
        let clusters = ClusterMap::from([(
            "krkn-operator".to_string(),
            vec![Cluster {
                name: "prod".to_string(),
                api_url: "https://prod:6443".to_string(),
            }],
        )]);
        let state = apply(
            initial(),
            &[Action::StartCreateWorkflow, Action::ClustersSuccess(clusters.clone())],
        );
        assert_eq!(state.phase, WorkflowPhase::SelectingClusters);
        assert_eq!(state.clusters, clusters);
    }

    #[test]
    fn test_registry_configured_keeps_phase() {
        let cfg = ScenariosRequest {
            registry_url: Some("registry.local".to_string()),
            scenario_repository: Some("chaos".to_string()),
            ..Default::default()
        };
        let state = apply(
            initial(),
            &[
                Action::ConfigureRegistry,
                Action::RegistryConfigured {
                    registry_type: RegistryType::Private,
                    config: Some(cfg.clone()),
                },
            ],
        );
        assert_eq!(state.phase, WorkflowPhase::ConfiguringRegistry);
        assert_eq!(state.registry_config, Some(cfg));
    }

    #[test]
    fn test_globals_failure_stays_on_screen() {
        let state = reduce(
            &configuring_scenario(),
            &Action::ScenarioGlobalsFailed(AppError::api("globals unavailable")),
        );
        assert_eq!(state.phase, WorkflowPhase::ConfiguringScenario);
        assert_eq!(state.error, None);
        assert_eq!(state.globals_error, Some(AppError::api("globals unavailable")));
    }

    #[test]
    fn test_form_updates_keep_phase() {
        let before = configuring_scenario();
        let values = BTreeMap::from([("NAMESPACE".to_string(), FormValue::from("kube-system"))]);
        let after = reduce(&before, &Action::UpdateScenarioForm(values.clone()));
        assert_eq!(after.phase, before.phase);
        assert_eq!(after.scenario_form_values, values);
    }

    #[test]
    fn test_run_list_updates() {
        let state = apply(
            initial(),
            &[
                Action::ScenarioRunsLoaded(vec![
                    run("r1", ScenarioRunPhase::Running),
                    run("r2", ScenarioRunPhase::Succeeded),
                ]),
                Action::ScenarioRunAdded(run("r3", ScenarioRunPhase::Pending)),
                Action::ScenarioRunUpdated(run("r1", ScenarioRunPhase::Failed)),
                Action::ScenarioRunUpdated(run("ghost", ScenarioRunPhase::Running)),
                Action::ToggleRunAccordion("r2".to_string()),
                Action::ScenarioRunRemoved("r2".to_string()),
            ],
        );
        let names: Vec<&str> = state
            .scenario_runs
            .iter()
            .map(|r| r.scenario_run_name.as_str())
            .collect();
        assert_eq!(names, vec!["r1", "r3"]);
        assert_eq!(state.run("r1").map(|r| r.phase), Some(ScenarioRunPhase::Failed));
        assert!(state.expanded_run_ids.is_empty());
        assert_eq!(state.active_run_names(), BTreeSet::from(["r3".to_string()]));
    }

    #[test]
    fn test_accordion_toggles() {
        let state = apply(
            initial(),
            &[
                Action::ToggleRunAccordion("r1".to_string()),
                Action::ToggleClusterJobAccordion("j1".to_string()),
                Action::ToggleClusterJobAccordion("j2".to_string()),
                Action::ToggleClusterJobAccordion("j1".to_string()),
            ],
        );
        assert!(state.expanded_run_ids.contains("r1"));
        assert_eq!(state.expanded_cluster_jobs, BTreeSet::from(["j2".to_string()]));
    }

    #[test]
    fn test_notifications() {
        let n = Notification::danger("Cancel failed", "job not found");
        let shown = reduce(&initial(), &Action::ShowNotification(n.clone()));
        assert_eq!(shown.notifications, vec![n.clone()]);
        assert_eq!(shown.phase, WorkflowPhase::Initializing);
        let hidden = reduce(&shown, &Action::HideNotification(n.id));
        assert!(hidden.notifications.is_empty());
    }

    #[test]
    fn test_effect_only_actions_are_noops() {
        let state = configuring_scenario();
        for action in [
            Action::SubmitScenarioRun,
            Action::RefreshScenarioRuns,
            Action::RequestDeleteRun("r1".to_string()),
            Action::RequestCancelJob {
                scenario_run_name: "r1".to_string(),
                job_id: "j1".to_string(),
            },
            Action::Quit,
        ] {
            assert_eq!(reduce(&state, &action), state);
        }
    }

    #[test]
    fn test_store_publishes_changes() {
        let store = WorkflowStore::new(WorkflowVariant::JobsListLanding);
        let mut rx = store.subscribe();
        assert!(store.reduce(&Action::InitSuccess("abc".to_string())));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().phase, WorkflowPhase::Polling);

        assert!(!store.reduce(&Action::RefreshScenarioRuns));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(store.get_state().uuid.as_deref(), Some("abc"));
    }

    #[test]
    fn test_state_readable_while_a_subscriber_borrows() {
        let store = WorkflowStore::new(WorkflowVariant::JobsListLanding);
        let rx = store.subscribe();
        let borrowed = rx.borrow();

        let writer = store.clone();
        let reducer = std::thread::spawn(move || {
            writer.reduce(&Action::ShowNotification(Notification::success("Saved", "ok")))
        });
        // the reducer is parked on the watch channel, the state lock is free
        while store.get_state().notifications.is_empty() {
            std::thread::yield_now();
        }
        assert!(borrowed.notifications.is_empty());
        drop(borrowed);

        assert!(reducer.join().unwrap());
        assert_eq!(rx.borrow().notifications.len(), 1);
    }
}
