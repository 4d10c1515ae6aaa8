/// Core Action types for the flux architecture.
/// All state mutations flow through Actions dispatched to the Dispatcher.
use krkn_core::{
    exceptions::AppError,
    models::{
        ClusterMap, FormValues, RegistryType, ScenarioDetail, ScenarioGlobals, ScenarioRun,
        ScenarioTag, ScenariosRequest, SelectedCluster, TouchedFields,
    },
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Represents all possible user intents and system events in the console
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ===== Initialization =====
    InitStart,
    /// Target request created, carries its uuid
    InitSuccess(String),
    InitError(AppError),

    // ===== Target readiness polling =====
    /// A readiness poll is about to be issued, carries the 1-based attempt
    PollAttempt(u32),
    PollSuccess,
    PollError(AppError),

    // ===== Scenario runs list =====
    JobsListReady,
    ScenarioRunsLoaded(Vec<ScenarioRun>),
    ScenarioRunAdded(ScenarioRun),
    ScenarioRunUpdated(ScenarioRun),
    ScenarioRunRemoved(String),
    ToggleRunAccordion(String),
    ToggleClusterJobAccordion(String),

    // ===== Workflow control =====
    StartCreateWorkflow,
    CancelWorkflow,

    // ===== Cluster selection =====
    ClustersSuccess(ClusterMap),
    ClustersError(AppError),
    ToggleCluster(SelectedCluster),
    ClustersSelected,

    // ===== Registry and scenario discovery =====
    ConfigureRegistry,
    RegistryConfigured {
        registry_type: RegistryType,
        config: Option<ScenariosRequest>,
    },
    ScenariosLoading,
    ScenariosSuccess(Vec<ScenarioTag>),
    ScenariosError(AppError),
    SelectScenarios(Vec<String>),

    // ===== Scenario detail and configuration =====
    SelectScenarioForDetail(String),
    ScenarioDetailLoading,
    ScenarioDetailSuccess(ScenarioDetail),
    ScenarioDetailError(AppError),
    ScenarioGlobalsSuccess(ScenarioGlobals),
    /// Globals are optional, so their failure never leaves the screen
    ScenarioGlobalsFailed(AppError),
    UpdateScenarioForm(FormValues),
    UpdateGlobalForm {
        values: FormValues,
        touched: TouchedFields,
    },

    // ===== Run submission =====
    SubmitScenarioRun,
    ScenariosRunBatchSuccess,
    ScenariosRunBatchError(AppError),

    // ===== Locally scoped commands (handled by Effects only) =====
    RequestCancelJob {
        scenario_run_name: String,
        job_id: String,
    },
    RequestDeleteRun(String),
    RefreshScenarioRuns,

    // ===== Navigation =====
    NavigateToSettings,
    GoBack,
    Retry,

    // ===== Inline notifications =====
    ShowNotification(Notification),
    HideNotification(u64),

    /// The console should exit
    Quit,
}

impl Action {
    /// Short name used in logs, without the payload
    pub fn name(&self) -> &'static str {
        match self {
            Action::InitStart => "InitStart",
            Action::InitSuccess(_) => "InitSuccess",
            Action::InitError(_) => "InitError",
            Action::PollAttempt(_) => "PollAttempt",
            Action::PollSuccess => "PollSuccess",
            Action::PollError(_) => "PollError",
            Action::JobsListReady => "JobsListReady",
            Action::ScenarioRunsLoaded(_) => "ScenarioRunsLoaded",
            Action::ScenarioRunAdded(_) => "ScenarioRunAdded",
            Action::ScenarioRunUpdated(_) => "ScenarioRunUpdated",
            Action::ScenarioRunRemoved(_) => "ScenarioRunRemoved",
            Action::ToggleRunAccordion(_) => "ToggleRunAccordion",
            Action::ToggleClusterJobAccordion(_) => "ToggleClusterJobAccordion",
            Action::StartCreateWorkflow => "StartCreateWorkflow",
            Action::CancelWorkflow => "CancelWorkflow",
            Action::ClustersSuccess(_) => "ClustersSuccess",
            Action::ClustersError(_) => "ClustersError",
            Action::ToggleCluster(_) => "ToggleCluster",
            Action::ClustersSelected => "ClustersSelected",
            Action::ConfigureRegistry => "ConfigureRegistry",
            Action::RegistryConfigured { .. } => "RegistryConfigured",
            Action::ScenariosLoading => "ScenariosLoading",
            Action::ScenariosSuccess(_) => "ScenariosSuccess",
            Action::ScenariosError(_) => "ScenariosError",
            Action::SelectScenarios(_) => "SelectScenarios",
            Action::SelectScenarioForDetail(_) => "SelectScenarioForDetail",
            Action::ScenarioDetailLoading => "ScenarioDetailLoading",
            Action::ScenarioDetailSuccess(_) => "ScenarioDetailSuccess",
            Action::ScenarioDetailError(_) => "ScenarioDetailError",
            Action::ScenarioGlobalsSuccess(_) => "ScenarioGlobalsSuccess",
            Action::ScenarioGlobalsFailed(_) => "ScenarioGlobalsFailed",
            Action::UpdateScenarioForm(_) => "UpdateScenarioForm",
            Action::UpdateGlobalForm { .. } => "UpdateGlobalForm",
            Action::SubmitScenarioRun => "SubmitScenarioRun",
            Action::ScenariosRunBatchSuccess => "ScenariosRunBatchSuccess",
            Action::ScenariosRunBatchError(_) => "ScenariosRunBatchError",
            Action::RequestCancelJob { .. } => "RequestCancelJob",
            Action::RequestDeleteRun(_) => "RequestDeleteRun",
            Action::RefreshScenarioRuns => "RefreshScenarioRuns",
            Action::NavigateToSettings => "NavigateToSettings",
            Action::GoBack => "GoBack",
            Action::Retry => "Retry",
            Action::ShowNotification(_) => "ShowNotification",
            Action::HideNotification(_) => "HideNotification",
            Action::Quit => "Quit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    Success,
    Danger,
    Warning,
    Info,
}

/// An inline, dismissible message for failures that must not leave the
/// current screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub variant: NotificationVariant,
    pub title: String,
    pub message: String,
}

static NEXT_NOTIFICATION_ID: AtomicU64 = AtomicU64::new(1);

impl Notification {
    pub fn new(variant: NotificationVariant, title: &str, message: &str) -> Self {
        Self {
            id: NEXT_NOTIFICATION_ID.fetch_add(1, Ordering::Relaxed),
            variant,
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    pub fn danger(title: &str, message: &str) -> Self {
        Self::new(NotificationVariant::Danger, title, message)
    }

    pub fn success(title: &str, message: &str) -> Self {
        Self::new(NotificationVariant::Success, title, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_ids_are_unique() {
        let a = Notification::danger("Cancel failed", "boom");
        let b = Notification::success("Deleted", "run removed");
        assert_ne!(a.id, b.id);
        assert_eq!(a.variant, NotificationVariant::Danger);
    }

    #[test]
    fn test_action_name() {
        assert_eq!(Action::PollAttempt(3).name(), "PollAttempt");
        assert_eq!(
            Action::RequestCancelJob {
                scenario_run_name: "r".into(),
                job_id: "j".into()
            }
            .name(),
            "RequestCancelJob"
        );
    }
}
