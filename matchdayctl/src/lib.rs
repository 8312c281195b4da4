use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use matchday_core::actuation::{
    ActuationCommand, ActuationError, DryRunActuator, HardwareActuator, HttpActuator,
};
use matchday_core::distribution::{
    validate_plan, DistributionEngine, DistributionError, DistributionPlan, EngineSettings,
    ExecutionReport, PlanExecutor, PlanOptions, PlanValidation,
};
use matchday_core::games::{GameCandidate, OracleError, ScoreTable};
use matchday_core::streaming::{
    merge_streaming, PlatformCatalog, StaticDeviceRegistry, StreamingCandidate,
    StreamingDetector, StreamingError,
};
use matchday_core::venue::SnapshotFile;
use matchday_core::{load_matchday_config, MatchdayConfig};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] matchday_core::ConfigError),
    #[error("io error on {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("invalid json in {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("planning failed: {0}")]
    Distribution(#[from] DistributionError),
    #[error("streaming detection failed: {0}")]
    Streaming(#[from] StreamingError),
    #[error("priority scores unavailable: {0}")]
    Oracle(#[from] OracleError),
    #[error("actuation error: {0}")]
    Actuation(#[from] ActuationError),
    #[error("plan failed validation with {0} violation(s)")]
    InvalidPlan(usize),
    #[error("execution finished with {0} failed or skipped output(s)")]
    ExecutionIncomplete(usize),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Matchday venue TV distribution control", long_about = None)]
pub struct Cli {
    /// Path to matchday.toml
    #[arg(long, default_value = "configs/matchday.toml")]
    pub config: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Builds a distribution plan from a state snapshot and candidate games
    Plan(PlanArgs),
    /// Checks a saved plan for double bookings and unmet minimums
    Validate(ValidateArgs),
    /// Matches candidates to streaming platforms and online devices
    Detect(DetectArgs),
    /// Sends a saved plan to the hardware layer
    Execute(ExecuteArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Snapshot JSON (state plus channel presets)
    #[arg(long)]
    pub state: PathBuf,
    /// Candidate games JSON
    #[arg(long)]
    pub candidates: PathBuf,
    /// Priority scores JSON
    #[arg(long)]
    pub scores: PathBuf,
    /// Streaming device registry JSON; enables streaming detection
    #[arg(long)]
    pub devices: Option<PathBuf>,
    /// Only plan these outputs
    #[arg(long, value_delimiter = ',')]
    pub outputs: Option<Vec<u32>>,
    /// Only use these inputs for games
    #[arg(long, value_delimiter = ',')]
    pub inputs: Option<Vec<u32>>,
    /// Write the plan as JSON to this file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Plan JSON written by `plan --save`
    #[arg(long)]
    pub plan: PathBuf,
    /// Overrides distribution.high_priority_threshold
    #[arg(long)]
    pub threshold: Option<f64>,
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    #[arg(long)]
    pub candidates: PathBuf,
    #[arg(long)]
    pub devices: PathBuf,
}

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    #[arg(long)]
    pub plan: PathBuf,
    /// Record commands instead of calling the controller
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_matchday_config(&cli.config)?;
    info!(venue = %config.venue.name, config = %cli.config.display(), "configuration loaded");

    match &cli.command {
        Commands::Plan(args) => {
            let plan = plan(&config, args).await?;
            if let Some(path) = &args.save {
                let json = serde_json::to_string_pretty(&plan)?;
                fs::write(path, json).map_err(|source| AppError::Io {
                    source,
                    path: path.clone(),
                })?;
                info!(plan_id = %plan.plan_id, path = %path.display(), "plan saved");
            }
            render(&plan, cli.format)?;
        }
        Commands::Validate(args) => {
            let plan: DistributionPlan = read_json(&args.plan)?;
            let threshold = args
                .threshold
                .unwrap_or(config.distribution.high_priority_threshold);
            let validation = validate_plan(&plan, threshold);
            render(&validation, cli.format)?;
            if !validation.valid {
                return Err(AppError::InvalidPlan(validation.violations.len()));
            }
        }
        Commands::Detect(args) => {
            let candidates: Vec<GameCandidate> = read_json(&args.candidates)?;
            let detector = detector(&config, &args.devices)?;
            let detected = DetectionList {
                rows: detector.detect(&candidates).await?,
            };
            render(&detected, cli.format)?;
        }
        Commands::Execute(args) => {
            let plan: DistributionPlan = read_json(&args.plan)?;
            let outcome = execute(&config, &plan, args.dry_run).await?;
            render(&outcome, cli.format)?;
            let incomplete = outcome.report.failed + outcome.report.skipped;
            if incomplete > 0 {
                return Err(AppError::ExecutionIncomplete(incomplete));
            }
        }
    }

    Ok(())
}

async fn plan(config: &MatchdayConfig, args: &PlanArgs) -> Result<DistributionPlan> {
    let mut candidates: Vec<GameCandidate> = read_json(&args.candidates)?;
    if let Some(devices) = &args.devices {
        let detected = detector(config, devices)?.detect(&candidates).await?;
        candidates = merge_streaming(candidates, detected);
    }
    let oracle = ScoreTable::from_path(&args.scores)?;
    let engine = DistributionEngine::new(
        Arc::new(SnapshotFile::open(&args.state)),
        Arc::new(oracle),
        EngineSettings::from_config(config),
    );
    let options = PlanOptions {
        outputs: args.outputs.clone(),
        inputs: args.inputs.clone(),
    };
    Ok(engine.create_plan(&candidates, &options).await?)
}

fn detector(config: &MatchdayConfig, devices: &Path) -> Result<StreamingDetector> {
    let registry = StaticDeviceRegistry::from_path(devices)?;
    Ok(StreamingDetector::new(
        PlatformCatalog::from_config(&config.streaming),
        Arc::new(registry),
    )?)
}

async fn execute(
    config: &MatchdayConfig,
    plan: &DistributionPlan,
    dry_run: bool,
) -> Result<ExecutionOutcome> {
    if dry_run {
        let recorder = Arc::new(DryRunActuator::new());
        let report = PlanExecutor::new(recorder.clone()).execute(plan).await;
        return Ok(ExecutionOutcome {
            dry_run,
            report,
            commands: recorder.commands(),
        });
    }
    let actuator: Arc<dyn HardwareActuator> =
        Arc::new(HttpActuator::from_config(&config.actuation)?);
    let report = PlanExecutor::new(actuator).execute(plan).await;
    Ok(ExecutionOutcome {
        dry_run,
        report,
        commands: Vec::new(),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|source| AppError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&content).map_err(|source| AppError::Json {
        source,
        path: path.to_path_buf(),
    })
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

impl DisplayFallback for DistributionPlan {
    fn display(&self) -> String {
        let summary = &self.summary;
        let mut lines = vec![
            format!("Plan {} ({})", self.plan_id, self.created_at.to_rfc3339()),
            format!(
                "  {} game(s) on {} output(s), {} default, {} idle, {} protected, {} change(s)",
                summary.games_scheduled,
                summary.game_outputs,
                summary.default_outputs,
                summary.idle_outputs,
                summary.protected_outputs,
                summary.channel_changes
            ),
        ];
        for game in &self.game_assignments {
            let status = if game.min_tvs_met { "ok" } else { "SHORT" };
            lines.push(format!(
                "{} | score={:.1} | {}/{} TVs [{status}]",
                game.game_key,
                game.priority.final_score,
                game.output_count(),
                game.min_tvs
            ));
            for assignment in &game.assignments {
                let change = if assignment.requires_channel_change {
                    "change"
                } else {
                    "keep"
                };
                lines.push(format!(
                    "    TV {} <- input {} ({}) {} [{change}]",
                    assignment.output, assignment.input, assignment.channel, assignment.phase
                ));
            }
        }
        for default in &self.default_assignments {
            lines.push(format!(
                "default | TV {} <- input {} ({})",
                default.output, default.input, default.kind
            ));
        }
        for unplaced in &self.unplaced {
            lines.push(format!(
                "unplaced | {} (score {:.1}): {}",
                unplaced.game_key, unplaced.final_score, unplaced.reason
            ));
        }
        lines.join("\n")
    }
}

impl DisplayFallback for PlanValidation {
    fn display(&self) -> String {
        if self.valid {
            return "Plan is valid".to_string();
        }
        let mut lines = vec![format!("Plan has {} violation(s):", self.violations.len())];
        for violation in &self.violations {
            lines.push(format!("  [{}] {}", violation.kind, violation.detail));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct DetectionList {
    pub rows: Vec<StreamingCandidate>,
}

impl DisplayFallback for DetectionList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No streaming matches".to_string();
        }
        self.rows
            .iter()
            .map(|row| {
                format!(
                    "{} | {} | input {} | {}",
                    row.candidate.key(),
                    row.platform,
                    row.input_number,
                    row.deep_link.as_deref().unwrap_or("<home screen>")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct ExecutionOutcome {
    pub dry_run: bool,
    pub report: ExecutionReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<ActuationCommand>,
}

impl DisplayFallback for ExecutionOutcome {
    fn display(&self) -> String {
        let report = &self.report;
        let mut lines = vec![format!(
            "{}: {} routed, {} failed, {} skipped, {} unchanged",
            if self.dry_run { "Dry run" } else { "Executed" },
            report.succeeded,
            report.failed,
            report.skipped,
            report.unchanged
        )];
        for failure in &report.failures {
            let target = failure
                .output
                .map(|output| format!("TV {output}"))
                .unwrap_or_else(|| format!("input {}", failure.input));
            lines.push(format!("  {} {target}: {}", failure.step, failure.error));
        }
        for command in &self.commands {
            lines.push(match command {
                ActuationCommand::Tune { input, channel } => {
                    format!("  tune input {input} to {channel}")
                }
                ActuationCommand::Launch { input, app_id, .. } => {
                    format!("  launch {app_id} on input {input}")
                }
                ActuationCommand::Route { output, input } => {
                    format!("  route TV {output} <- input {input}")
                }
            });
        }
        lines.join("\n")
    }
}
