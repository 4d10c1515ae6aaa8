use super::runs::print_run;
use crate::exceptions::CliError;
use crate::models::parse_assignment;
use krkn_console::{Action, ConsoleHandle, WorkflowPhase, WorkflowState};
use krkn_core::models::{
    ClusterMap, FormValue, FormValues, RegistryType, ScenarioDetail, ScenarioGlobals,
    ScenariosRequest, SelectedCluster, TouchedFields,
};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Run a chaos scenario against one or more clusters. Walks the same
/// workflow as the console: cluster selection, registry, scenario, form.
#[derive(clap::Args)]
#[command(version, about, long_about = None)]
pub struct RunArgs {
    /// Scenario to run, as published in the registry
    #[arg(long, short)]
    pub scenario: String,

    /// Target cluster as PROVIDER/CLUSTER, or CLUSTER when the name is
    /// unique across providers. Repeatable.
    #[arg(long, short, required = true)]
    pub cluster: Vec<String>,

    /// Scenario or global field value as VARIABLE=VALUE. Repeatable.
    #[arg(long = "set", short = 'e', value_parser = parse_assignment)]
    pub values: Vec<(String, String)>,

    /// File field as VARIABLE=PATH. Repeatable.
    #[arg(long = "file", short = 'f', value_parser = parse_assignment)]
    pub files: Vec<(String, String)>,

    /// Private registry url. Requires --scenario-repository.
    #[arg(long, requires = "scenario_repository")]
    pub registry_url: Option<String>,

    /// Repository holding the scenario images in the private registry
    #[arg(long, requires = "registry_url")]
    pub scenario_repository: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub token: Option<String>,

    /// Skip TLS verification against the private registry
    #[arg(long)]
    pub skip_tls: bool,

    /// Allow plain http against the private registry
    #[arg(long)]
    pub insecure: bool,

    /// Maximum time to wait on any single workflow step
    #[arg(long, default_value = "2m", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Keep watching the run until it finishes
    #[arg(long, short)]
    pub wait: bool,
}

impl RunArgs {
    pub fn registry(&self) -> (RegistryType, Option<ScenariosRequest>) {
        match (&self.registry_url, &self.scenario_repository) {
            (Some(url), Some(repo)) => (
                RegistryType::Private,
                Some(ScenariosRequest {
                    username: self.username.clone(),
                    password: self.password.clone(),
                    token: self.token.clone(),
                    registry_url: Some(url.clone()),
                    scenario_repository: Some(repo.clone()),
                    skip_tls: Some(self.skip_tls),
                    insecure: Some(self.insecure),
                }),
            ),
            _ => (RegistryType::Public, None),
        }
    }
}

/// Resolve `PROVIDER/CLUSTER` or bare `CLUSTER` names against the
/// discovered clusters
pub fn match_clusters(
    clusters: &ClusterMap,
    wanted: &[String],
) -> Result<Vec<SelectedCluster>, CliError> {
    let mut selected: Vec<SelectedCluster> = Vec::new();
    for name in wanted {
        let mut matches: Vec<SelectedCluster> = match name.split_once('/') {
            Some((provider, cluster)) => clusters
                .get(provider)
                .into_iter()
                .flatten()
                .filter(|c| c.name == cluster)
                .map(|c| SelectedCluster::new(provider, c))
                .collect(),
            None => clusters
                .iter()
                .flat_map(|(provider, list)| {
                    list.iter()
                        .filter(|c| &c.name == name)
                        .map(move |c| SelectedCluster::new(provider, c))
                })
                .collect(),
        };
        if matches.len() > 1 {
            return Err(CliError::Usage(format!(
                "Cluster '{}' exists in several providers, use PROVIDER/CLUSTER",
                name
            )));
        }
        match matches.pop() {
            Some(cluster) if !selected.contains(&cluster) => selected.push(cluster),
            Some(_) => {}
            None => return Err(CliError::Usage(format!("Unknown cluster '{}'", name))),
        }
    }
    Ok(selected)
}

/// Form values split between the scenario and the global form
#[derive(Debug, Default, PartialEq)]
pub struct AssignedValues {
    pub scenario: FormValues,
    pub globals: FormValues,
    pub touched: TouchedFields,
}

/// Route each value to the form that declares its variable. Scenario fields
/// win over globals of the same name.
pub fn assign_values(
    detail: &ScenarioDetail,
    globals: Option<&ScenarioGlobals>,
    values: Vec<(String, FormValue)>,
) -> Result<AssignedValues, CliError> {
    let mut assigned = AssignedValues::default();
    let mut unknown = Vec::new();
    for (variable, value) in values {
        if detail.field(&variable).is_some() {
            assigned.scenario.insert(variable, value);
        } else if globals.and_then(|g| g.field(&variable)).is_some() {
            assigned.touched.insert(variable.clone(), true);
            assigned.globals.insert(variable, value);
        } else {
            unknown.push(variable);
        }
    }
    if !unknown.is_empty() {
        return Err(CliError::Usage(format!(
            "Scenario {} has no field named {}",
            detail.name,
            unknown.join(", ")
        )));
    }
    Ok(assigned)
}

fn read_file_value(variable: &str, path: &str) -> Result<(String, FormValue), CliError> {
    let content = std::fs::read(path)?;
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| variable.to_lowercase());
    Ok((variable.to_string(), FormValue::File { name, content }))
}

async fn step<F>(
    handle: &ConsoleHandle,
    what: &str,
    timeout: Duration,
    pred: F,
) -> Result<WorkflowState, CliError>
where
    F: Fn(&WorkflowState) -> bool,
{
    log::debug!("Waiting for {}", what);
    let state = handle
        .wait_for(|s| s.phase == WorkflowPhase::Error || pred(s), timeout)
        .await
        .ok_or_else(|| CliError::Stalled(timeout, what.to_string()))?;
    match (state.phase, &state.error) {
        (WorkflowPhase::Error, Some(error)) => Err(CliError::Workflow(error.clone())),
        _ => Ok(state),
    }
}

/// Drive a running console through the create-run workflow. Returns the
/// name of the created scenario run.
pub async fn drive_wizard(handle: &ConsoleHandle, args: &RunArgs) -> Result<String, CliError> {
    let timeout = args.timeout;
    let ready = |s: &WorkflowState| {
        matches!(
            s.phase,
            WorkflowPhase::JobsList | WorkflowPhase::SelectingClusters
        )
    };
    let state = step(handle, "the operator to become ready", timeout, ready).await?;

    if state.phase == WorkflowPhase::JobsList {
        handle.dispatch(Action::StartCreateWorkflow);
    }
    let state = step(handle, "cluster discovery", timeout, |s| {
        s.phase == WorkflowPhase::SelectingClusters && !s.clusters.is_empty()
    })
    .await?;
    for cluster in match_clusters(&state.clusters, &args.cluster)? {
        log::info!("Targeting {}/{}", cluster.operator_name, cluster.cluster_name);
        handle.dispatch(Action::ToggleCluster(cluster));
    }
    handle.dispatch(Action::ClustersSelected);

    let (registry_type, config) = args.registry();
    handle.dispatch(Action::RegistryConfigured {
        registry_type,
        config,
    });
    handle.dispatch(Action::ScenariosLoading);
    let state = step(handle, "the scenario list", timeout, |s| {
        s.phase == WorkflowPhase::SelectingScenarios
    })
    .await?;
    if !state.scenarios.iter().any(|s| s.name == args.scenario) {
        return Err(CliError::Usage(format!(
            "Scenario '{}' not found in the registry",
            args.scenario
        )));
    }

    handle.dispatch(Action::SelectScenarios(vec![args.scenario.clone()]));
    handle.dispatch(Action::SelectScenarioForDetail(args.scenario.clone()));
    step(handle, "the scenario form", timeout, |s| {
        s.phase == WorkflowPhase::ConfiguringScenario
    })
    .await?;
    // globals arrive right after the detail and may fail on their own
    let state = step(handle, "the global options", timeout, |s| {
        s.scenario_globals.is_some() || s.globals_error.is_some()
    })
    .await?;
    if let Some(error) = &state.globals_error {
        log::warn!("Global options unavailable: {}", error);
    }
    let detail = state
        .scenario_detail
        .as_ref()
        .ok_or_else(|| CliError::Usage("Scenario detail missing".to_string()))?;

    let mut values: Vec<(String, FormValue)> = args
        .values
        .iter()
        .map(|(k, v)| (k.clone(), FormValue::Text(v.clone())))
        .collect();
    for (variable, path) in &args.files {
        values.push(read_file_value(variable, path)?);
    }
    let assigned = assign_values(detail, state.scenario_globals.as_ref(), values)?;
    handle.dispatch(Action::UpdateScenarioForm(assigned.scenario));
    if !assigned.globals.is_empty() {
        handle.dispatch(Action::UpdateGlobalForm {
            values: assigned.globals,
            touched: assigned.touched,
        });
    }
    let known_runs: BTreeSet<String> = handle
        .state()
        .scenario_runs
        .iter()
        .map(|r| r.scenario_run_name.clone())
        .collect();
    handle.dispatch(Action::SubmitScenarioRun);

    let state = step(handle, "the scenario run to be created", timeout, |s| {
        s.phase == WorkflowPhase::JobsList
            && s
                .scenario_runs
                .iter()
                .any(|r| !known_runs.contains(&r.scenario_run_name))
    })
    .await?;
    state
        .scenario_runs
        .iter()
        .find(|r| !known_runs.contains(&r.scenario_run_name))
        .map(|r| r.scenario_run_name.clone())
        .ok_or_else(|| CliError::Usage("Scenario run missing after submit".to_string()))
}

/// Print every change of the run until it reaches a terminal phase
pub async fn follow_run(handle: &ConsoleHandle, scenario_run_name: &str) {
    let mut rx = handle.subscribe();
    let mut last = None;
    loop {
        let run = rx.borrow_and_update().run(scenario_run_name).cloned();
        match run {
            Some(run) => {
                if last.as_ref() != Some(&run) {
                    print_run(&run);
                }
                if run.is_terminal() {
                    return;
                }
                last = Some(run);
            }
            None => {
                println!("Scenario run {} disappeared", scenario_run_name);
                return;
            }
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

pub async fn handle_run(handle: ConsoleHandle, args: RunArgs) -> Result<(), CliError> {
    let name = drive_wizard(&handle, &args).await?;
    println!("Created scenario run {}", name);
    if args.wait {
        follow_run(&handle, &name).await;
    }
    Ok(())
}
