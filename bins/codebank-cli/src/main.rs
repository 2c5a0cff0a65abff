mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "codebank-cli")]
#[command(about = "Codebank CLI - Run code, grade solutions and manage the problem bank", long_about = None)]
struct Cli {
    /// Redis connection URL (defaults to REDIS_URL)
    #[arg(long, global = true)]
    redis_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new codebank project
    Init {
        /// Project path
        #[arg(short, long, default_value = ".")]
        path: String,
    },

    /// List configured language runtimes
    ListLangs,

    /// Run a program once against a custom input
    Run {
        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Language tag (e.g., javascript, js)
        #[arg(short, long, default_value = "javascript")]
        language: String,

        /// Input passed to the program
        #[arg(short, long, conflicts_with = "input_file")]
        input: Option<String>,

        /// Read the program input from a file
        #[arg(long)]
        input_file: Option<PathBuf>,
    },

    /// Grade a program against a problem file without touching the store
    Grade {
        /// Problem definition (JSON)
        #[arg(short, long)]
        problem_file: PathBuf,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "javascript")]
        language: String,
    },

    /// Manage stored problems
    Problem {
        #[command(subcommand)]
        action: ProblemAction,
    },

    /// Grade and record a solution for a stored problem
    Submit {
        /// Problem ID
        #[arg(short, long)]
        problem: Uuid,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, default_value = "javascript")]
        language: String,
    },
}

#[derive(Subcommand)]
enum ProblemAction {
    /// Create a problem from a JSON definition
    Add {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List problems
    List {
        /// Filter by difficulty (easy, medium, hard)
        #[arg(short, long)]
        difficulty: Option<String>,

        /// Sort order (newest, points)
        #[arg(short, long, default_value = "newest")]
        sort: String,
    },

    /// Show a problem with its test cases
    Show {
        #[arg(short, long)]
        id: Uuid,
    },

    /// Delete a problem and its test cases
    Delete {
        #[arg(short, long)]
        id: Uuid,

        /// Skip confirmation prompt
        #[arg(short, long, default_value = "false")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let redis_url = cli.redis_url;

    match cli.command {
        Commands::Init { path } => {
            commands::init_project(&path).await?;
        }
        Commands::ListLangs => {
            commands::list_languages()?;
        }
        Commands::Run {
            file,
            language,
            input,
            input_file,
        } => {
            commands::run_code(&file, &language, input.as_deref(), input_file.as_deref()).await?;
        }
        Commands::Grade {
            problem_file,
            file,
            language,
        } => {
            commands::grade_file(&problem_file, &file, &language).await?;
        }
        Commands::Problem { action } => match action {
            ProblemAction::Add { file } => {
                commands::add_problem(redis_url.as_deref(), &file).await?;
            }
            ProblemAction::List { difficulty, sort } => {
                commands::list_problems(redis_url.as_deref(), difficulty.as_deref(), &sort).await?;
            }
            ProblemAction::Show { id } => {
                commands::show_problem(redis_url.as_deref(), id).await?;
            }
            ProblemAction::Delete { id, yes } => {
                commands::delete_problem(redis_url.as_deref(), id, yes).await?;
            }
        },
        Commands::Submit {
            problem,
            file,
            language,
        } => {
            commands::submit_solution(redis_url.as_deref(), problem, &file, &language).await?;
        }
    }

    Ok(())
}
