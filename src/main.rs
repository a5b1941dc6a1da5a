use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use knowtree::api::{ApiError, HttpClient, MemoryApi, NodeId, QuizSubmission, TreeApi};
use knowtree::app::{App, AppEvent};
use knowtree::config::Config;
use knowtree::progress::{format_evaluation, format_summaries, run_quiz, summarize};
use knowtree::ui;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Get the config directory path (~/.config/knowtree/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("knowtree"))
}

/// Create the config directory with user-only permissions.
fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }
    Ok(())
}

/// Send tracing output to a log file; the TUI owns the terminal.
fn init_logging(config_dir: &Path) -> Result<()> {
    let log_path = config_dir.join("knowtree.log");
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file '{}'", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "knowtree", about = "Terminal client for a knowledge-tree learning service")]
struct Args {
    /// Base URL of the knowledge-tree service (overrides the config file)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Browse a built-in sample tree instead of a server
    #[arg(long, conflicts_with = "api_url")]
    demo: bool,

    /// Open the tree at this node id
    #[arg(long, value_name = "ID", conflicts_with = "search")]
    node: Option<i64>,

    /// Search for a topic on startup and open the first match
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Config file to use instead of ~/.config/knowtree/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the service a question and print the answer
    Ask { question: String },
    /// Print quiz progress per topic
    History {
        /// Only show results for this topic
        #[arg(long)]
        topic: Option<String>,
    },
    /// Take a multiple-choice quiz on a topic
    Quiz { topic: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    ensure_config_dir(&config_dir)?;
    init_logging(&config_dir)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;

    let base_url = args
        .api_url
        .clone()
        .unwrap_or_else(|| config.api_base_url.clone());

    if let Some(command) = args.command {
        if args.demo {
            anyhow::bail!("Subcommands need a server; drop --demo");
        }
        let client = HttpClient::new(&base_url, &config).context("Invalid API URL")?;
        return run_command(&client, command).await;
    }

    let (api, learning): (Arc<dyn TreeApi>, Option<Arc<HttpClient>>) = if args.demo {
        tracing::info!("Starting in demo mode");
        (Arc::new(MemoryApi::demo()), None)
    } else {
        let client = Arc::new(HttpClient::new(&base_url, &config).context("Invalid API URL")?);
        (client.clone(), Some(client))
    };

    let mut app = App::new(api, learning, &config);
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(64);

    // The deep link reveals its own path, so it goes after the roots load
    ui::spawn_roots_load(&app, &event_tx);
    if let Some(id) = args.node {
        ui::spawn_restore(&mut app, NodeId(id), &event_tx);
    } else if let Some(query) = args.search.as_deref() {
        app.search_input = query.to_string();
        ui::spawn_search(&mut app, query, &event_tx);
    }

    ui::run(&mut app, event_tx, event_rx).await?;
    Ok(())
}

async fn run_command(client: &HttpClient, command: Command) -> Result<()> {
    match command {
        Command::Ask { question } => {
            let answer = client.ask(&question).await.map_err(describe)?;
            println!("{}", answer);
        }
        Command::History { topic } => {
            let history = match topic.as_deref() {
                Some(topic) => client.history_for(topic).await,
                None => client.history().await,
            }
            .map_err(describe)?;
            println!("{}", format_summaries(&summarize(&history)));
        }
        Command::Quiz { topic } => {
            println!("Generating a quiz on {}...", topic);
            let quiz = client.generate_quiz(&topic).await.map_err(describe)?;
            if quiz.questions.is_empty() {
                anyhow::bail!("The service returned no questions for '{}'", topic);
            }

            let stdin = io::stdin();
            let answers = run_quiz(&quiz, stdin.lock(), io::stdout()).context("Failed to read answers")?;
            if answers.is_empty() {
                println!("\nNo answers given, nothing submitted.");
                return Ok(());
            }

            let submission = QuizSubmission {
                topic,
                questions: quiz.questions,
                user_answers: answers,
            };
            let evaluation = client.submit_quiz(&submission).await.map_err(describe)?;
            println!("\n{}", format_evaluation(&evaluation));
        }
    }
    Ok(())
}

/// Attach the short summary so CLI errors read like the status bar.
fn describe(e: ApiError) -> anyhow::Error {
    let summary = e.summary();
    anyhow::Error::new(e).context(summary)
}
