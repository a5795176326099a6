use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use tennis_torch::answer_client::AnswerClient;
use tennis_torch::config::AppConfig;
use tennis_torch::location::{QueryLocation, SharedLocation};
use tennis_torch::render::{render_history, render_session, render_suggestions, RenderOptions};
use tennis_torch::session::{QuerySession, SubmitOutcome, QUERY_PARAM};
use tennis_torch::storage::FileStore;
use tennis_torch::suggestions::Category;

#[derive(Parser, Debug)]
#[command(name = "torch")]
#[command(about = "Ask questions about tennis history from the terminal")]
struct Cli {
    /// Answer service base URL (overrides TENNIS_TORCH_API_URL)
    #[arg(long)]
    api_url: Option<String>,
    /// Directory holding the query history (overrides TENNIS_TORCH_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    no_color: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a question
    Ask {
        #[arg(required = true)]
        query: Vec<String>,
        /// Highlight a citation in the answer
        #[arg(long)]
        cite: Option<usize>,
    },
    /// List recent queries
    History,
    /// Re-run a recent query by its position in `history`
    Rerun {
        position: usize,
        #[arg(long)]
        cite: Option<usize>,
    },
    /// Open a shared link (its `q` parameter is asked)
    Open {
        url: String,
        #[arg(long)]
        cite: Option<usize>,
    },
    /// Print the shareable link of the most recent query
    Link,
    /// Show suggested questions
    Suggest { category: Option<String> },
    /// Check that the answer service is up
    Health,
    /// Interactive session
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_base_url = api_url;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let opts = if cli.no_color || !std::io::stdout().is_terminal() {
        RenderOptions::plain()
    } else {
        RenderOptions::colored()
    };

    match cli.command {
        Command::Ask { query, cite } => {
            let location = Arc::new(SharedLocation::parse(&config.public_url)?);
            let session = build_session(&config, location)?;
            let outcome = session.submit_query(&query.join(" ")).await;
            show_outcome(&session, outcome, cite, opts)
        }
        Command::History => {
            let location = Arc::new(SharedLocation::parse(&config.public_url)?);
            let session = build_session(&config, location)?;
            print!("{}", render_history(session.history().entries()));
            Ok(())
        }
        Command::Rerun { position, cite } => {
            let location = Arc::new(SharedLocation::parse(&config.public_url)?);
            let session = build_session(&config, location)?;
            let history = session.history();
            let Some(entry) = history.get(position) else {
                anyhow::bail!(
                    "no history entry at position {} ({} stored)",
                    position,
                    history.len()
                );
            };
            let outcome = session.select_history_entry(entry).await;
            show_outcome(&session, outcome, cite, opts)
        }
        Command::Open { url, cite } => {
            let location = Arc::new(SharedLocation::parse(&url)?);
            let session = build_session(&config, location)?;
            let Some(outcome) = session.load_from_url().await else {
                anyhow::bail!("link has no `{}` parameter: {}", QUERY_PARAM, url);
            };
            show_outcome(&session, outcome, cite, opts)
        }
        Command::Link => {
            let location = Arc::new(SharedLocation::parse(&config.public_url)?);
            let session = build_session(&config, location.clone())?;
            let history = session.history();
            let Some(latest) = history.get(1) else {
                anyhow::bail!("no queries yet");
            };
            location.set_param(QUERY_PARAM, latest);
            println!("{}", location.href());
            Ok(())
        }
        Command::Suggest { category } => {
            let categories = match category.as_deref() {
                Some(name) => match Category::parse(name) {
                    Some(category) => vec![category],
                    None => anyhow::bail!("unknown category: {}", name),
                },
                None => Category::ALL.to_vec(),
            };
            print!("{}", render_suggestions(&categories));
            Ok(())
        }
        Command::Health => {
            let client = AnswerClient::new(config.api_base_url.clone(), config.request_timeout)?;
            let status = client.health().await?;
            println!("{} {}", client.base_url(), status);
            Ok(())
        }
        Command::Repl => {
            let location = Arc::new(SharedLocation::parse(&config.public_url)?);
            let session = build_session(&config, location.clone())?;
            repl(&session, &location, opts).await
        }
    }
}

fn build_session(config: &AppConfig, location: Arc<SharedLocation>) -> Result<QuerySession> {
    let store = FileStore::open(config.store_path())?;
    let client = AnswerClient::new(config.api_base_url.clone(), config.request_timeout)?;
    Ok(QuerySession::new(
        Arc::new(client),
        Arc::new(store),
        location,
    ))
}

fn show_outcome(
    session: &QuerySession,
    outcome: SubmitOutcome,
    cite: Option<usize>,
    opts: RenderOptions,
) -> Result<()> {
    if outcome == SubmitOutcome::Rejected {
        anyhow::bail!("empty question");
    }

    if let Some(n) = cite {
        let focus = session.toggle_citation(n);
        if focus.scroll_to.is_none() {
            eprintln!("citation [{}] has no match record", n);
        }
    }

    print!(
        "{}",
        render_session(&session.snapshot(), &session.narrative(), opts)
    );

    if outcome == SubmitOutcome::Failed {
        anyhow::bail!("query failed");
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Query(String),
    Cite(usize),
    Pick(usize),
    History,
    Link,
    Suggest,
    Help,
    Quit,
    Invalid(String),
    Empty,
}

fn parse_repl_command(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Empty;
    }

    let Some(command) = trimmed.strip_prefix(':') else {
        return ReplCommand::Query(trimmed.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    let number = |what: &str| match arg.map(str::parse::<usize>) {
        Some(Ok(n)) => Ok(n),
        _ => Err(ReplCommand::Invalid(format!("usage: :{} <number>", what))),
    };

    match name {
        "cite" | "c" => number("cite").map_or_else(|e| e, ReplCommand::Cite),
        "pick" | "p" => number("pick").map_or_else(|e| e, ReplCommand::Pick),
        "history" | "h" => ReplCommand::History,
        "link" | "l" => ReplCommand::Link,
        "suggest" | "s" => ReplCommand::Suggest,
        "help" | "?" => ReplCommand::Help,
        "quit" | "q" | "exit" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("unknown command :{} (try :help)", other)),
    }
}

const REPL_HELP: &str = "\
Type a question to ask it.
  :cite N     highlight citation N (again to clear)
  :history    list recent queries
  :pick N     re-run recent query N
  :link       shareable link for the current query
  :suggest    suggested questions
  :quit       leave";

async fn repl(
    session: &QuerySession,
    location: &SharedLocation,
    opts: RenderOptions,
) -> Result<()> {
    println!("Tennis Torch. Ask about tennis history (:help for commands).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("torch> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_repl_command(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Query(text) => {
                session.submit_query(&text).await;
                print!(
                    "{}",
                    render_session(&session.snapshot(), &session.narrative(), opts)
                );
            }
            ReplCommand::Cite(n) => {
                let focus = session.toggle_citation(n);
                print!(
                    "{}",
                    render_session(&session.snapshot(), &session.narrative(), opts)
                );
                if focus.active.is_some() && focus.scroll_to.is_none() {
                    println!("(citation [{}] has no match record)", n);
                }
            }
            ReplCommand::Pick(position) => {
                let history = session.history();
                match history.get(position) {
                    Some(entry) => {
                        session.select_history_entry(entry).await;
                        print!(
                            "{}",
                            render_session(&session.snapshot(), &session.narrative(), opts)
                        );
                    }
                    None => println!("no history entry at position {}", position),
                }
            }
            ReplCommand::History => print!("{}", render_history(session.history().entries())),
            ReplCommand::Link => {
                if location.get_param(QUERY_PARAM).is_some() {
                    println!("{}", location.href());
                } else {
                    println!("nothing asked yet");
                }
            }
            ReplCommand::Suggest => print!("{}", render_suggestions(&Category::ALL)),
            ReplCommand::Help => println!("{}", REPL_HELP),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(message) => println!("{}", message),
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
