use cx_router::client::RequestSource;
use cx_router::{Assistant, Catalog, Environment, Route, RouterConfig};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cx-router")]
#[command(about = "Route natural-language questions to CX Assistant catalog questions")]
#[command(version)]
struct Args {
    /// Catalog file (or set CX_CATALOG_PATH)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Target environment: production or stage
    #[arg(short, long, global = true, default_value = "production")]
    environment: Environment,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question routed to the best-matching catalog entry
    Ask {
        message: String,
    },
    /// Ask the free-form assistant
    Open {
        message: String,
    },
    /// Show how a message would be routed, without any network calls
    Route {
        message: String,
    },
    /// Search customers by name, CAV BU ID or SAV ID
    SearchCustomers {
        search_text: String,
    },
    /// Rate the last response
    Feedback {
        /// up or down
        #[arg(value_parser = ["up", "down"])]
        rating: String,

        #[arg(long)]
        comment: Option<String>,

        /// structured or open (defaults to the last request's surface)
        #[arg(long)]
        source: Option<String>,
    },
    /// List the follow-up suggestions of a catalog question
    Followups {
        question_id: String,
    },
    /// Interactive session that keeps the conversation thread between questions
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = RouterConfig::from_env()?;
    if let Some(path) = args.catalog {
        config.catalog_path = path;
    }
    let environment = args.environment;

    match args.command {
        Commands::Route { message } => {
            let catalog = Catalog::load(&config.catalog_path)?;
            print_route(&catalog, &config, &message);
            Ok(())
        }
        Commands::Followups { question_id } => {
            let catalog = Catalog::load(&config.catalog_path)?;
            let question = catalog
                .get(&question_id)
                .ok_or_else(|| anyhow::anyhow!("Unknown question id '{}'", question_id))?;
            for f in catalog.followups(question) {
                println!("{}\t{}", f.id, f.label);
            }
            Ok(())
        }
        Commands::Ask { message } => {
            let assistant = connect(&config, environment)?;
            println!("{}", assistant.ask_structured(environment, &message).await?);
            Ok(())
        }
        Commands::Open { message } => {
            let assistant = connect(&config, environment)?;
            println!("{}", assistant.ask_open(environment, &message).await?);
            Ok(())
        }
        Commands::SearchCustomers { search_text } => {
            let assistant = connect(&config, environment)?;
            println!("{}", assistant.search_customers(environment, &search_text).await?);
            Ok(())
        }
        Commands::Feedback {
            rating,
            comment,
            source,
        } => {
            let source = source.as_deref().map(parse_source).transpose()?;
            let assistant = connect(&config, environment)?;
            let output = assistant
                .give_feedback(environment, &rating, comment, source)
                .await?;
            println!("{}", output);
            Ok(())
        }
        Commands::Chat => {
            let assistant = connect(&config, environment)?;
            chat(&assistant, environment).await
        }
    }
}

/// Read questions from stdin. `/open`, `/customers`, `/feedback` and
/// `/quit` select the other operations.
async fn chat(assistant: &Assistant, environment: Environment) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = split_command(line);
        let reply = match command {
            "/quit" | "/exit" => return Ok(()),
            "/open" => assistant.ask_open(environment, rest).await,
            "/customers" => assistant.search_customers(environment, rest).await,
            "/feedback" => {
                let (rating, comment) = rest.split_once(' ').unwrap_or((rest, ""));
                assistant
                    .give_feedback(environment, rating, Some(comment.to_string()), None)
                    .await
            }
            "" => assistant.ask_structured(environment, rest).await,
            other => Ok(format!("Unknown command {}", other)),
        };
        match reply {
            Ok(text) => println!("{}\n", text),
            Err(e) => error!("{}", e),
        }
    }
}

/// Split a chat line into its `/command` (empty for a plain question) and
/// the rest of the line.
fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(' ') {
        Some((command, rest)) if command.starts_with('/') => (command, rest.trim()),
        _ if line.starts_with('/') => (line, ""),
        _ => ("", line),
    }
}

fn connect(config: &RouterConfig, environment: Environment) -> Result<Assistant> {
    let assistant = Assistant::from_config(config)?;
    info!(
        "Using {} environment at {}",
        environment,
        config.host(environment)
    );
    Ok(assistant)
}

fn parse_source(raw: &str) -> Result<RequestSource> {
    match raw {
        "structured" => Ok(RequestSource::Structured),
        "open" => Ok(RequestSource::Open),
        other => Err(anyhow::anyhow!(
            "Unknown source '{}' (expected 'structured' or 'open')",
            other
        )),
    }
}

fn print_route(catalog: &Catalog, config: &RouterConfig, message: &str) {
    let matcher = cx_router::QuestionMatcher::new(catalog);
    match cx_router::routing::route(&matcher, message, config.match_threshold) {
        Route::NoMatch => println!("No catalog question matches (threshold {})", config.match_threshold),
        Route::Incomplete { question, missing } => {
            println!("{}", cx_router::build_routing_error(question, &missing))
        }
        Route::Ready {
            question,
            score,
            extracted,
        } => {
            println!("Question: {} ({}) score {:.1}", question.label, question.id, score);
            println!("Agent: {}", question.agent);
            for (name, extraction) in extracted.iter() {
                println!("  {}: {:?}", name, extraction);
            }
        }
    }
}
