use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use practice_judge::catalog::{sort_problems, Catalog, ProblemFilter, SortOrder};
use practice_judge::config::init_config;
use practice_judge::core::{
    AdhocOutcome, AdhocStatus, CaseVerdict, Difficulty, GradingOutcome, GradingStatus, Problem,
};
use practice_judge::parse_arguments;
use practice_judge::report::build_markdown;
use practice_judge::runner::{GuardedRunner, InlineRunner, RunReport, Runner};

#[derive(Parser)]
#[command(name = "practice-judge")]
#[command(about = "Practice Judge - grade coding exercise solutions locally", long_about = None)]
struct Cli {
    /// Problem catalog (defaults to catalog_path from the configuration)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List problems in the catalog
    List {
        /// Only problems in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only problems of this difficulty (Easy, Medium, Hard)
        #[arg(short, long)]
        difficulty: Option<Difficulty>,

        /// Only problems carrying this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Case-insensitive text searched in titles and summaries
        #[arg(short, long)]
        query: Option<String>,

        /// default, difficulty-asc, difficulty-desc, title-asc or title-desc
        #[arg(long, default_value = "default")]
        sort: SortOrder,

        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Grade a solution against a problem's test cases
    Test {
        /// Problem id
        #[arg(short, long)]
        problem: String,

        /// Solution source file
        #[arg(short, long)]
        source: PathBuf,

        /// Print the outcome as JSON
        #[arg(long, default_value = "false")]
        json: bool,

        /// Stop the run after time_limit_ms
        #[arg(long, default_value = "false")]
        guarded: bool,
    },

    /// Call a solution once with custom arguments
    Run {
        /// Problem id
        #[arg(short, long)]
        problem: String,

        /// Solution source file
        #[arg(short, long)]
        source: PathBuf,

        /// Arguments as a JSON array, e.g. '["sample", 42]'
        #[arg(short, long, default_value = "[]")]
        args: String,

        /// Print the outcome as JSON
        #[arg(long, default_value = "false")]
        json: bool,

        /// Stop the run after time_limit_ms
        #[arg(long, default_value = "false")]
        guarded: bool,
    },

    /// Build a markdown review request from a problem, a solution and its results
    Export {
        /// Problem id
        #[arg(short, long)]
        problem: String,

        /// Solution source file
        #[arg(short, long)]
        source: PathBuf,

        /// Leave the test results out
        #[arg(long, default_value = "false")]
        no_run: bool,

        /// Write the markdown to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("practice_judge=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = init_config()?;
    let catalog_path = cli
        .catalog
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.catalog_path));
    let catalog = Catalog::load(&catalog_path)?;

    match cli.command {
        Commands::List {
            category,
            difficulty,
            tag,
            query,
            sort,
            json,
        } => {
            let filter = ProblemFilter {
                category,
                difficulty,
                tag,
                query,
            };
            let mut problems = catalog.filter(&filter);
            sort_problems(&mut problems, sort);
            if json {
                println!("{}", serde_json::to_string_pretty(&problems)?);
            } else {
                print_problem_list(&problems);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Test {
            problem,
            source,
            json,
            guarded,
        } => {
            let problem = find_problem(&catalog, &problem)?;
            let code = read_source(&source).await?;
            let runner = select_runner(guarded);
            match runner.run_tests(problem, &code).await? {
                RunReport::Completed(outcome) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&outcome)?);
                    } else {
                        print_grading_outcome(&outcome);
                    }
                    Ok(exit_code(outcome.summary.status == GradingStatus::Pass))
                }
                report @ RunReport::TimedOut { .. } => print_timeout(&report, json),
            }
        }
        Commands::Run {
            problem,
            source,
            args,
            json,
            guarded,
        } => {
            let problem = find_problem(&catalog, &problem)?;
            let code = read_source(&source).await?;
            let args = parse_arguments(&args)?;
            let runner = select_runner(guarded);
            match runner.run_custom(problem, &code, &args).await? {
                RunReport::Completed(outcome) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&outcome)?);
                    } else {
                        print_adhoc_outcome(&outcome);
                    }
                    Ok(exit_code(outcome.status == AdhocStatus::Success))
                }
                report @ RunReport::TimedOut { .. } => print_timeout(&report, json),
            }
        }
        Commands::Export {
            problem,
            source,
            no_run,
            output,
        } => {
            let problem = find_problem(&catalog, &problem)?;
            let code = read_source(&source).await?;
            let outcome = if no_run {
                None
            } else {
                InlineRunner::from_config()
                    .run_tests(problem, &code)
                    .await?
                    .completed()
            };
            let markdown = build_markdown(problem, &code, outcome.as_ref());
            match output {
                Some(path) => {
                    tokio::fs::write(&path, format!("{}\n", markdown))
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Review request written to {}", path.display());
                }
                None => println!("{}", markdown),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn find_problem<'a>(catalog: &'a Catalog, id: &str) -> Result<&'a Problem> {
    catalog
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("Unknown problem: {}", id))
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read solution: {}", path.display()))
}

fn select_runner(guarded: bool) -> Box<dyn Runner> {
    if guarded {
        Box::new(GuardedRunner::from_config())
    } else {
        Box::new(InlineRunner::from_config())
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_timeout<T: serde::Serialize>(report: &RunReport<T>, json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else if let RunReport::TimedOut { limit_ms } = report {
        println!("timed-out: stopped after {}ms", limit_ms);
    }
    Ok(ExitCode::FAILURE)
}

fn print_problem_list(problems: &[&Problem]) {
    for problem in problems {
        let difficulty = problem
            .difficulty
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<7} {:<12} {}",
            problem.id,
            difficulty,
            problem.category.as_deref().unwrap_or("-"),
            problem.title
        );
    }
    println!("{} problem(s)", problems.len());
}

fn print_grading_outcome(outcome: &GradingOutcome) {
    let summary = &outcome.summary;
    println!(
        "{}: {} ({}ms)",
        summary.status, summary.message, summary.duration_ms
    );
    for (index, item) in outcome.items.iter().enumerate() {
        println!(
            "  #{} [{}] {} ({})",
            index + 1,
            item.outcome,
            item.description,
            item.args.join(", ")
        );
        match item.outcome {
            CaseVerdict::Error => {
                println!("      error: {}", item.error.as_deref().unwrap_or_default());
            }
            CaseVerdict::Fail => {
                println!("      expected: {}", item.expected.as_deref().unwrap_or_default());
                println!("      received: {}", item.received.as_deref().unwrap_or_default());
            }
            CaseVerdict::Pass => {}
        }
    }
}

fn print_adhoc_outcome(outcome: &AdhocOutcome) {
    println!("{} ({}ms)", outcome.status, outcome.duration_ms);
    if let Some(formatted) = &outcome.formatted {
        println!("{}", formatted);
    }
    if let Some(message) = &outcome.message {
        println!("{}", message);
    }
    if let Some(stack) = outcome.stack.as_deref().filter(|s| !s.is_empty()) {
        println!("{}", stack);
    }
}
