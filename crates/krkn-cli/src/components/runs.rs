use chrono::Utc;
use krkn_api::OperatorAPI;
use krkn_core::{
    exceptions::GenericError,
    models::{ClusterJob, ClusterJobPhase, ScenarioRun, ScenarioRunPhase},
};

/// List the scenario runs known to the operator
#[derive(clap::Args)]
#[command(version, about, long_about = None)]
pub struct RunsArgs {
    /// Print the raw runs as JSON
    #[arg(long, short)]
    pub json: bool,
}

/// Show the status of one scenario run and its cluster jobs
#[derive(clap::Args)]
#[command(version, about, long_about = None)]
pub struct StatusArgs {
    /// Name of the scenario run
    pub scenario_run_name: String,

    /// Print the raw status as JSON
    #[arg(long, short)]
    pub json: bool,
}

/// Cancel a single cluster job of a scenario run
#[derive(clap::Args)]
#[command(version, about, long_about = None)]
pub struct CancelArgs {
    /// Name of the scenario run
    pub scenario_run_name: String,

    /// Job id as shown by `krkn status`
    pub job_id: String,
}

/// Delete a scenario run and all of its jobs
#[derive(clap::Args)]
#[command(version, about, long_about = None)]
pub struct DeleteArgs {
    /// Name of the scenario run
    pub scenario_run_name: String,
}

pub fn phase_icon(phase: ScenarioRunPhase) -> &'static str {
    match phase {
        ScenarioRunPhase::Pending => "⏳",
        ScenarioRunPhase::Running => "▶",
        ScenarioRunPhase::Succeeded => "✓",
        ScenarioRunPhase::PartiallyFailed => "⚠",
        ScenarioRunPhase::Failed => "✗",
    }
}

fn job_icon(phase: ClusterJobPhase) -> &'static str {
    match phase {
        ClusterJobPhase::Pending => "⏳",
        ClusterJobPhase::Running => "▶",
        ClusterJobPhase::Succeeded => "✓",
        ClusterJobPhase::Failed => "✗",
        ClusterJobPhase::Stopped => "■",
    }
}

/// `1h02m`, `3m05s` or `12s`
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h{:02}m", h, m)
    } else if m > 0 {
        format!("{}m{:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

pub fn print_run_summary(run: &ScenarioRun) {
    println!(
        "  {} {}  [{}]  {:?}  {}/{} succeeded, {} failed, {} running",
        phase_icon(run.phase),
        run.scenario_run_name,
        run.scenario_name,
        run.phase,
        run.successful_jobs,
        run.total_targets,
        run.failed_jobs,
        run.running_jobs,
    );
}

fn print_job(job: &ClusterJob) {
    let elapsed = job
        .elapsed(Utc::now())
        .map(format_elapsed)
        .unwrap_or_else(|| "-".to_string());
    println!(
        "    {} {}/{}  job={}  pod={}  {:?}  {}",
        job_icon(job.phase),
        job.provider_name,
        job.cluster_name,
        job.job_id,
        job.pod_name,
        job.phase,
        elapsed
    );
    if let Some(message) = job.message.as_deref().filter(|m| !m.is_empty()) {
        println!("      {}", message);
    }
}

pub fn print_run(run: &ScenarioRun) {
    print_run_summary(run);
    if !run.created_at.is_empty() {
        println!("    created {}", run.created_at);
    }
    for job in &run.cluster_jobs {
        print_job(job);
    }
}

pub async fn handle_runs(api: &dyn OperatorAPI, args: RunsArgs) -> Result<(), GenericError> {
    let statuses = api.list_scenario_runs().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }
    if statuses.is_empty() {
        println!("No scenario runs");
        return Ok(());
    }
    println!("Scenario runs ({}):", statuses.len());
    for status in statuses {
        print_run_summary(&ScenarioRun::from_status(status, None));
    }
    Ok(())
}

pub async fn handle_status(api: &dyn OperatorAPI, args: StatusArgs) -> Result<(), GenericError> {
    let status = api.get_scenario_run_status(&args.scenario_run_name).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_run(&ScenarioRun::from_status(status, None));
    }
    Ok(())
}

pub async fn handle_cancel(api: &dyn OperatorAPI, args: CancelArgs) -> Result<(), GenericError> {
    api.cancel_job(&args.scenario_run_name, &args.job_id).await?;
    println!(
        "Cancellation requested for job {} of {}",
        args.job_id, args.scenario_run_name
    );
    Ok(())
}

pub async fn handle_delete(api: &dyn OperatorAPI, args: DeleteArgs) -> Result<(), GenericError> {
    api.delete_scenario_run(&args.scenario_run_name).await?;
    println!("Deleted scenario run {}", args.scenario_run_name);
    Ok(())
}
