use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use ideascore_lib::analysis::contrast::Region;
use ideascore_lib::commands::db::{record_lead, record_page_event, test_run_crud};
use ideascore_lib::commands::scoring::{
    get_metrics, get_score_report, get_validation_score, suggest_text_tone,
};
use ideascore_lib::commands::settings::{get_settings, save_settings};
use ideascore_lib::models::ad_spend::TestRun;

#[derive(Parser)]
#[command(name = "ideascore", version, about = "Landing-page validation score tooling")]
struct Cli {
    /// Directory holding the .ideascore state folder
    #[arg(long, short, default_value = ".")]
    workspace: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validation score with its breakdown
    Score(RangeArgs),
    /// Score plus funnel rates, component details and verdict
    Report(RangeArgs),
    /// Raw visitor, pricing click and lead counts
    Metrics(RangeArgs),
    /// Record a page visit or pricing click
    Event(EventArgs),
    /// Record a lead submission
    Lead(LeadArgs),
    /// Manage ad spend test runs
    TestRun {
        #[command(subcommand)]
        action: TestRunAction,
    },
    /// Show or update workspace settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Suggest light or dark text for a raw RGBA8 image
    Contrast(ContrastArgs),
}

#[derive(Parser)]
struct RangeArgs {
    #[arg(long)]
    project: String,
    /// First day included, YYYY-MM-DD
    #[arg(long, requires = "end")]
    start: Option<String>,
    /// Last day included, YYYY-MM-DD
    #[arg(long, requires = "start")]
    end: Option<String>,
}

#[derive(Parser)]
struct EventArgs {
    #[arg(long)]
    project: String,
    #[arg(long, value_parser = ["visit", "pricing_click"])]
    kind: String,
    #[arg(long)]
    visitor: String,
    /// Unix timestamp (default: now)
    #[arg(long)]
    at: Option<i64>,
}

#[derive(Parser)]
struct LeadArgs {
    #[arg(long)]
    project: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args)]
struct TestRunFields {
    #[arg(long)]
    spend_cents: Option<i64>,
    #[arg(long)]
    impressions: Option<i64>,
    #[arg(long)]
    clicks: Option<i64>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
enum TestRunAction {
    Create {
        #[arg(long)]
        project: String,
        #[command(flatten)]
        fields: TestRunFields,
    },
    /// Overwrite the given fields of an existing run
    Update {
        #[arg(long)]
        id: String,
        #[command(flatten)]
        fields: TestRunFields,
    },
    Read {
        #[arg(long)]
        id: String,
    },
    Latest {
        #[arg(long)]
        project: String,
    },
    List {
        #[arg(long)]
        project: Option<String>,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    /// Merge a JSON object into the current settings
    Set {
        #[arg(long)]
        json: String,
    },
}

#[derive(Parser)]
struct ContrastArgs {
    /// File of tightly packed RGBA8 pixels
    #[arg(long, value_name = "PATH")]
    rgba: PathBuf,
    #[arg(long)]
    width: u32,
    #[arg(long)]
    height: u32,
    /// Region as x,y,width,height (default: whole image)
    #[arg(long, value_parser = parse_region)]
    region: Option<Region>,
}

fn parse_region(raw: &str) -> Result<Region, String> {
    let parts: Vec<u32> = raw
        .split(',')
        .map(|p| p.trim().parse::<u32>().map_err(|e| format!("bad region '{raw}': {e}")))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, width, height] => Ok(Region {
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        }),
        _ => Err(format!("region '{raw}' must be x,y,width,height")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let workspace = cli.workspace.to_string_lossy().to_string();

    match cli.command {
        Commands::Score(args) => print_json(
            &get_validation_score(workspace, args.project, args.start, args.end).await?,
        ),
        Commands::Report(args) => {
            print_json(&get_score_report(workspace, args.project, args.start, args.end).await?)
        }
        Commands::Metrics(args) => {
            print_json(&get_metrics(workspace, args.project, args.start, args.end).await?)
        }
        Commands::Event(args) => print_json(
            &record_page_event(workspace, args.project, args.kind, args.visitor, args.at).await?,
        ),
        Commands::Lead(args) => {
            print_json(&record_lead(workspace, args.project, args.email, args.name).await?)
        }
        Commands::TestRun { action } => print_json(&run_test_run_action(workspace, action).await?),
        Commands::Settings { action } => match action {
            SettingsAction::Show => print_json(&get_settings(workspace).await?),
            SettingsAction::Set { json } => {
                let incoming: serde_json::Value = serde_json::from_str(&json)
                    .map_err(|e| format!("INVALID_INPUT: settings must be JSON: {e}"))?;
                print_json(&save_settings(workspace, incoming).await?)
            }
        },
        Commands::Contrast(args) => {
            let pixels = std::fs::read(&args.rgba)
                .map_err(|e| format!("Failed to read {}: {e}", args.rgba.display()))?;
            print_json(&suggest_text_tone(workspace, pixels, args.width, args.height, args.region).await?)
        }
    }
}

async fn run_test_run_action(
    workspace: String,
    action: TestRunAction,
) -> Result<serde_json::Value, String> {
    match action {
        TestRunAction::Create { project, fields } => {
            let run = TestRun {
                id: String::new(),
                project_id: project,
                ad_spend_cents: fields.spend_cents,
                impressions: fields.impressions,
                clicks: fields.clicks,
                notes: fields.notes,
                created_at: 0,
                updated_at: 0,
            };
            test_run_crud(workspace, "create".to_string(), Some(run), None, None).await
        }
        TestRunAction::Update { id, fields } => {
            let existing = test_run_crud(workspace.clone(), "read".to_string(), None, Some(id.clone()), None)
                .await?;
            let mut run: TestRun = serde_json::from_value::<Option<TestRun>>(existing)
                .map_err(|e| format!("Read error: {e}"))?
                .ok_or_else(|| format!("NOT_FOUND: test run {id}"))?;

            if fields.spend_cents.is_some() {
                run.ad_spend_cents = fields.spend_cents;
            }
            if fields.impressions.is_some() {
                run.impressions = fields.impressions;
            }
            if fields.clicks.is_some() {
                run.clicks = fields.clicks;
            }
            if fields.notes.is_some() {
                run.notes = fields.notes;
            }
            test_run_crud(workspace, "update".to_string(), Some(run), None, None).await
        }
        TestRunAction::Read { id } => {
            test_run_crud(workspace, "read".to_string(), None, Some(id), None).await
        }
        TestRunAction::Latest { project } => {
            test_run_crud(workspace, "latest".to_string(), None, None, Some(project)).await
        }
        TestRunAction::List { project } => {
            test_run_crud(workspace, "list".to_string(), None, None, project).await
        }
        TestRunAction::Delete { id } => {
            test_run_crud(workspace, "delete".to_string(), None, Some(id), None).await
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize output: {e}"))?;
    println!("{raw}");
    Ok(())
}
