// CLI commands for running, grading and managing problems
use anyhow::{bail, Context, Result};
use codebank_common::catalog::{ProblemCatalog, ProblemFilter, SortOrder};
use codebank_common::config::{Config, DEFAULT_LANGUAGES_CONFIG};
use codebank_common::error::{BankError, BankResult};
use codebank_common::redis::RedisStore;
use codebank_common::store::{InMemoryStore, ProblemStore};
use codebank_common::types::{Difficulty, GradingResult, Language};
use codebank_common::validation::ProblemDraft;
use codebank_judge::config::LanguageConfigManager;
use codebank_judge::{CodeExecutor, GradedSubmission, Grader, ProcessEngine};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

const ENV_TEMPLATE: &str = "\
# Codebank environment
SERVER_HOST=0.0.0.0
SERVER_PORT=3000
# Leave unset to keep problems in memory
# REDIS_URL=redis://127.0.0.1:6379
LANGUAGES_CONFIG=config/languages.json
# 0 disables the per-execution limit
EXECUTION_TIMEOUT_MS=10000
# lenient | strict
RUNTIME_ERROR_POLICY=lenient
RUST_LOG=info
";

fn load_config() -> Result<Config> {
    Config::from_env().context("Failed to read configuration from environment")
}

fn build_engine(config: &Config) -> Result<Arc<dyn CodeExecutor>> {
    let engine = ProcessEngine::from_config(config)?;
    Ok(Arc::new(engine))
}

/// Connect to the Redis store named by `--redis-url` or REDIS_URL
async fn open_store(redis_url: Option<&str>, config: &Config) -> Result<Arc<dyn ProblemStore>> {
    let Some(url) = redis_url.or(config.redis_url.as_deref()) else {
        bail!("No store configured: pass --redis-url or set REDIS_URL");
    };
    let store = RedisStore::connect(url)
        .await
        .with_context(|| format!("Failed to connect to Redis at {}", url))?;
    Ok(Arc::new(store))
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_problem_file(path: &Path) -> Result<ProblemDraft> {
    let content = read_file(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse problem definition {}", path.display()))
}

/// Program input from `--input`, `--input-file`, or empty
fn resolve_input(input: Option<&str>, input_file: Option<&Path>) -> Result<String> {
    match (input, input_file) {
        (Some(_), Some(_)) => bail!("Use either --input or --input-file, not both"),
        (Some(input), None) => Ok(input.to_string()),
        (None, Some(path)) => read_file(path),
        (None, None) => Ok(String::new()),
    }
}

fn parse_filter(difficulty: Option<&str>, sort: &str) -> Result<ProblemFilter> {
    let difficulty = difficulty.map(str::parse::<Difficulty>).transpose()?;
    let sort = match sort.trim().to_lowercase().as_str() {
        "newest" => SortOrder::Newest,
        "points" => SortOrder::Points,
        other => bail!("Unknown sort order '{}' (expected newest or points)", other),
    };
    Ok(ProblemFilter { difficulty, sort })
}

/// Grade against a throwaway in-memory copy of the problem
pub async fn grade_offline(
    draft: ProblemDraft,
    code: &str,
    language: &str,
    engine: Arc<dyn CodeExecutor>,
) -> BankResult<GradedSubmission> {
    let store: Arc<dyn ProblemStore> = Arc::new(InMemoryStore::new());
    let catalog = ProblemCatalog::new(Arc::clone(&store));
    let problem = catalog.create(draft).await?;
    Grader::new(engine, store)
        .submit(problem.problem.id, code, language)
        .await
}

fn print_grading(result: &GradingResult) {
    println!("\n📊 Results:\n");
    println!("{:<6} {:<8} {:<10} {}", "CASE", "STATUS", "POINTS", "OUTPUT");
    println!("{}", "─".repeat(60));
    for (idx, case) in result.per_case.iter().enumerate() {
        let status = if case.passed { "✅ pass" } else { "❌ fail" };
        let actual = case.actual.trim().replace('\n', "⏎");
        println!(
            "{:<6} {:<8} {:<10} {}",
            idx + 1,
            status,
            format!("{:.2}", case.points_awarded),
            actual
        );
        if !case.passed {
            println!("{:<6} {:<8} {:<10} expected: {}", "", "", "", case.expected.trim());
        }
    }
    println!(
        "\n🏁 Passed {}/{} - score {:.2}/{:.2}",
        result.passed_count, result.total_count, result.score_awarded, result.max_score
    );
}

/// Initialize a new codebank project
pub async fn init_project(path: &str) -> Result<()> {
    println!("🚀 Initializing codebank project at: {}", path);

    let project_path = Path::new(path);
    let config_dir = project_path.join("config");
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create directory: {}", config_dir.display()))?;
    println!("  ✅ Created: config");

    let languages_json_path = project_path.join(DEFAULT_LANGUAGES_CONFIG);
    if languages_json_path.exists() {
        println!("  ⏭️  Kept existing: {}", DEFAULT_LANGUAGES_CONFIG);
    } else {
        let json_content = serde_json::to_string_pretty(&LanguageConfigManager::builtin_json())?;
        fs::write(&languages_json_path, json_content)
            .context("Failed to write languages.json")?;
        println!("  ✅ Created: {}", DEFAULT_LANGUAGES_CONFIG);
    }

    let env_path = project_path.join(".env.example");
    if !env_path.exists() {
        fs::write(&env_path, ENV_TEMPLATE).context("Failed to write .env.example")?;
        println!("  ✅ Created: .env.example");
    }

    println!("✅ Project initialized successfully!");
    println!("\n📋 Next steps:");
    println!("  1. Make sure `node` is on PATH");
    println!("  2. Try it: codebank-cli run --file solution.js --input \"2 3\"");
    println!("  3. Set REDIS_URL and start codebank-api");

    Ok(())
}

/// List configured language runtimes
pub fn list_languages() -> Result<()> {
    let config = load_config()?;
    let manager = LanguageConfigManager::load_or_builtin(&config.languages_config)?;

    println!("📋 Configured Languages:\n");
    println!("{:<12} {:<10} {:<30}", "NAME", "VERSION", "COMMAND");
    println!("{}", "─".repeat(54));
    for name in manager.list_languages() {
        let language: Language = name.parse()?;
        if let Some(runtime) = manager.get_config(&language) {
            let command = std::iter::once(runtime.command.as_str())
                .chain(runtime.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{:<12} {:<10} {:<30}", runtime.name, runtime.version, command);
        }
    }
    println!("\n✅ Total: {} language(s)", manager.list_languages().len());

    Ok(())
}

/// Run a program once against a custom input
pub async fn run_code(
    file: &Path,
    language: &str,
    input: Option<&str>,
    input_file: Option<&Path>,
) -> Result<()> {
    let config = load_config()?;
    let code = read_file(file)?;
    let input = resolve_input(input, input_file)?;

    let grader = Grader::new(build_engine(&config)?, Arc::new(InMemoryStore::new()));
    println!("▶️  Running {} ({})...", file.display(), language);

    match grader.run(&code, language, &input).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(BankError::Execution(message)) => {
            println!("❌ Execution failed:\n{}", message);
            bail!("execution failed")
        }
        Err(e) => Err(e.into()),
    }
}

/// Grade a program against a problem file without any store
pub async fn grade_file(problem_file: &Path, file: &Path, language: &str) -> Result<()> {
    let config = load_config()?;
    let draft = read_problem_file(problem_file)?;
    let code = read_file(file)?;

    println!("🧪 Grading {} against {}...", file.display(), draft.title);
    let graded = grade_offline(draft, &code, language, build_engine(&config)?).await?;
    print_grading(&graded.result);

    Ok(())
}

/// Create a stored problem from a JSON definition
pub async fn add_problem(redis_url: Option<&str>, file: &Path) -> Result<()> {
    let config = load_config()?;
    let catalog = ProblemCatalog::new(open_store(redis_url, &config).await?);
    let draft = read_problem_file(file)?;

    let problem = catalog.create(draft).await?;
    println!("✅ Problem '{}' created", problem.problem.title);
    println!("   ID: {}", problem.problem.id);
    println!(
        "   {} test case(s), {:.2} points",
        problem.test_cases.len(),
        problem.problem.total_points
    );

    Ok(())
}

pub async fn list_problems(redis_url: Option<&str>, difficulty: Option<&str>, sort: &str) -> Result<()> {
    let config = load_config()?;
    let catalog = ProblemCatalog::new(open_store(redis_url, &config).await?);
    let filter = parse_filter(difficulty, sort)?;

    let problems = catalog.list(&filter).await?;
    if problems.is_empty() {
        println!("No problems found.");
        println!("\n💡 Add one with: codebank-cli problem add --file problem.json");
        return Ok(());
    }

    println!("📋 Problems:\n");
    println!("{:<38} {:<30} {:<8} {:<8} {:<6}", "ID", "TITLE", "LEVEL", "POINTS", "CASES");
    println!("{}", "─".repeat(94));
    for detail in &problems {
        let problem = &detail.problem;
        println!(
            "{:<38} {:<30} {:<8} {:<8} {:<6}",
            problem.id,
            problem.title.chars().take(30).collect::<String>(),
            problem.difficulty,
            format!("{:.2}", problem.total_points),
            detail.test_cases.len()
        );
    }
    println!("\n✅ Total: {} problem(s)", problems.len());

    Ok(())
}

pub async fn show_problem(redis_url: Option<&str>, id: Uuid) -> Result<()> {
    let config = load_config()?;
    let catalog = ProblemCatalog::new(open_store(redis_url, &config).await?);

    let detail = catalog.get(id).await?;
    println!("{}", serde_json::to_string_pretty(&detail)?);

    Ok(())
}

/// Delete a stored problem and its test cases
pub async fn delete_problem(redis_url: Option<&str>, id: Uuid, yes: bool) -> Result<()> {
    let config = load_config()?;
    let catalog = ProblemCatalog::new(open_store(redis_url, &config).await?);
    let detail = catalog.get(id).await?;

    println!("🗑️  Removing problem: {}", detail.problem.title);

    // Confirm deletion
    if !yes {
        println!("⚠️  This will remove the problem and its {} test case(s)", detail.test_cases.len());
        print!("\nContinue? (y/N): ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("❌ Aborted");
            return Ok(());
        }
    }

    catalog.delete(id).await?;
    println!("✅ Problem '{}' removed successfully!", detail.problem.title);

    Ok(())
}

/// Grade a solution against a stored problem and record the submission
pub async fn submit_solution(
    redis_url: Option<&str>,
    problem_id: Uuid,
    file: &Path,
    language: &str,
) -> Result<()> {
    let config = load_config()?;
    let store = open_store(redis_url, &config).await?;
    let grader = Grader::new(build_engine(&config)?, store);
    let code = read_file(file)?;

    println!("📤 Submitting {} to problem {}...", file.display(), problem_id);
    match grader.submit(problem_id, &code, language).await {
        Ok(graded) => {
            print_grading(&graded.result);
            println!("📝 Submission ID: {}", graded.submission.id);
            Ok(())
        }
        Err(BankError::Persistence { result, source }) => {
            print_grading(&result);
            println!("\n⚠️  Graded but not recorded: {}", source);
            bail!("submission was not recorded")
        }
        Err(e) => Err(e.into()),
    }
}
