mod agent;
mod executor;
mod observer;
mod policy;
mod provider;
mod sanitizer;
mod session;

use agent::{Agent, AgentConfig};
use executor::{Executor, ExecutorConfig};
use observer::{ConsoleObserver, Observer};
use policy::{PolicyGate, StdinConfirmer};
use provider::{Provider, ProviderConfig, RoleResolver};
use session::{SessionConfig, SessionSink, SessionStore};

use clap::Parser;
use rustyline::history::FileHistory;
use rustyline::Editor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::fmt;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "coqui")]
#[command(about = "Terminal agent for PHP project workspaces")]
struct Args {
    /// Workspace directory the agent operates in
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Resume a specific session by id
    #[arg(short, long)]
    session: Option<String>,

    /// Resume the most recent session
    #[arg(short, long)]
    resume: bool,

    /// Override the primary model
    #[arg(short, long)]
    model: Option<String>,

    /// History file path
    #[arg(long)]
    history_file: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with the REPL.
    fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_target(args.verbose)
        .with_writer(std::io::stderr)
        .init();

    let workspace = args.workspace.canonicalize().map_err(|e| {
        format!("workspace {} not accessible: {}", args.workspace.display(), e)
    })?;

    // Provider
    let mut provider_config = ProviderConfig::from_env()?;
    if let Some(model) = &args.model {
        provider_config.model = model.clone();
    }
    let provider = Provider::new(provider_config)?;
    let roles = RoleResolver::from_env(provider.model());
    info!(model = %provider.model(), "provider initialized");

    // Session: explicit id, else latest on --resume, else a fresh one.
    let session_config = SessionConfig::default();
    let (store, resumed) = match (&args.session, args.resume) {
        (Some(id), _) => (SessionStore::open(&session_config, id)?, true),
        (None, true) => match SessionStore::latest(&session_config) {
            Some(id) => (SessionStore::open(&session_config, &id)?, true),
            None => (SessionStore::create(&session_config)?, false),
        },
        (None, false) => (SessionStore::create(&session_config)?, false),
    };
    let session: Arc<dyn SessionSink> = Arc::new(store.clone());
    info!(session_id = %store.id(), resumed = resumed, "session ready");

    // Executor
    let mut executor_config = ExecutorConfig::with_workspace(&workspace);
    executor_config.tools_toml_path = workspace.join("tools.toml");
    let agent_config = AgentConfig::from_env();
    let console: Arc<dyn Observer> = Arc::new(ConsoleObserver);
    let executor = Executor::orchestrator(
        &executor_config,
        provider.clone(),
        roles,
        agent_config.clone(),
        Some(session.clone()),
        Some(console.clone()),
    )?;
    info!(tools = executor.tool_names().len(), "executor initialized");

    // Gate
    let gate = PolicyGate::new(PolicyGate::default_rules(), Box::new(StdinConfirmer));

    let agent = Agent::new(
        provider,
        executor,
        Arc::new(gate),
        agent_config,
        Some(session),
        Some(console),
    );

    if resumed {
        let records = store.load_messages()?;
        agent.preload(&records).await;
        println!("Resumed session {} ({} messages)", store.id(), records.len());
    }

    run_repl(&agent, &store, args.history_file).await
}

async fn run_repl(
    agent: &Agent<Executor>,
    store: &SessionStore,
    history_file: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let history_file = history_file.unwrap_or_else(|| {
        dirs::home_dir()
            .map(|p| p.join(".coqui_history"))
            .unwrap_or_else(|| PathBuf::from(".coqui_history"))
    });

    let mut rl: Editor<(), FileHistory> = Editor::new()?;
    if history_file.exists()
        && let Err(e) = rl.load_history(&history_file)
    {
        eprintln!("[warning] Failed to load history: {}", e);
    }

    println!("coqui v{}", env!("CARGO_PKG_VERSION"));
    println!("Session: {}", store.id());
    println!("Type your request and press Enter. Ctrl+D to quit.");
    println!();

    loop {
        match rl.readline("coqui> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input);

                match agent.handle(input).await {
                    Ok(output) => {
                        println!("\n{}", output.text);
                        if let Some(usage) = &output.usage {
                            info!(
                                iterations = output.iterations,
                                tokens = usage.total(),
                                "run finished"
                            );
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "run failed");
                        println!("\n[error] {}", e);
                    }
                }
                println!();
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("[error] Readline error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_file) {
        eprintln!("[warning] Failed to save history: {}", e);
    }

    println!("\nGoodbye!");
    Ok(())
}
