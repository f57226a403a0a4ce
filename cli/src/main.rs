//! Intelview CLI: browse entity lists, profiles and suggestions
//!
//! Drives one `EntityOrchestrator` per invocation against the REST API (or a
//! graph database when only a graph URL is configured) and prints the state
//! it settles on.

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use intelview::{
    AppConfig, Backend, EntityKind, EntityOrchestrator, EntitySummary, GraphBackend, GraphConfig,
    ImageResolver, ListStatus, OrchestratorError, OrchestratorView, RestBackend, SharedContext,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "intelview", version, about = "Entity profile browser")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// REST API base URL
    #[arg(long, global = true, env = "INTELVIEW_API_URL")]
    api_url: Option<String>,

    /// Graph database HTTP URL, used when no API URL is set
    #[arg(long, global = true, env = "INTELVIEW_GRAPH_URL")]
    graph_url: Option<String>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List entities of one kind
    List {
        /// Entity kind (see `kinds`)
        kind: String,

        /// Filter as key=value[,value...]; repeatable
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, Vec<String>)>,
    },
    /// Show one entity profile
    Profile {
        kind: String,
        id: String,
    },
    /// Show suggestions for a search text
    Suggest {
        kind: String,
        text: String,
    },
    /// List known countries
    Countries,
    /// List the entity kinds
    Kinds,
    /// Start an interactive session for one kind
    Shell {
        kind: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult {
    if let Commands::Kinds = cli.command {
        for name in EntityKind::preset_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let context = Arc::new(SharedContext::with_config(load_config(&cli)?));
    if !context.is_ready() {
        return Err(OrchestratorError::Config(
            "no API or graph URL configured (use --api-url or --graph-url)".to_string(),
        )
        .into());
    }
    let backend = backend_for(&context);

    match cli.command {
        Commands::List { kind, filters } => {
            let orchestrator = open(&kind, &context, &backend)?;
            run_list(&orchestrator, filters, &cli.format).await
        }
        Commands::Profile { kind, id } => {
            let orchestrator = open(&kind, &context, &backend)?;
            run_profile(&orchestrator, &context, &id, &cli.format).await
        }
        Commands::Suggest { kind, text } => {
            let orchestrator = open(&kind, &context, &backend)?;
            run_suggest(&orchestrator, &text, &cli.format).await
        }
        Commands::Countries => run_countries(&context, backend.as_ref(), &cli.format).await,
        Commands::Shell { kind } => {
            let orchestrator = open(&kind, &context, &backend)?;
            run_shell(&orchestrator, &context, &cli.format).await
        }
        Commands::Kinds => Ok(()),
    }
}

/// File, then environment, then command-line flags
fn load_config(cli: &Cli) -> Result<AppConfig, OrchestratorError> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    }
    .apply_env();

    if let Some(url) = &cli.api_url {
        config.api_base_url = Some(url.clone());
    }
    if let Some(url) = &cli.graph_url {
        config.graph.get_or_insert_with(|| GraphConfig::with_url("")).url = url.clone();
    }
    Ok(config.normalized())
}

fn backend_for(context: &Arc<SharedContext>) -> Arc<dyn Backend> {
    if context.api_base_url().is_none() && context.graph().is_some() {
        Arc::new(GraphBackend::new(Arc::clone(context)))
    } else {
        Arc::new(RestBackend::new(Arc::clone(context)))
    }
}

fn open(
    kind: &str,
    context: &Arc<SharedContext>,
    backend: &Arc<dyn Backend>,
) -> Result<EntityOrchestrator, OrchestratorError> {
    Ok(EntityOrchestrator::new(
        EntityKind::by_name(kind)?,
        Arc::clone(context),
        Arc::clone(backend),
    ))
}

fn parse_filter(arg: &str) -> Result<(String, Vec<String>), String> {
    let (key, values) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value[,value...], got '{}'", arg))?;
    let values = values
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    Ok((key.trim().to_string(), values))
}

async fn run_list(
    orchestrator: &EntityOrchestrator,
    filters: Vec<(String, Vec<String>)>,
    format: &OutputFormat,
) -> CliResult {
    for (key, values) in filters {
        orchestrator.set_filter(&key, values)?;
    }
    if orchestrator.view().list.status == ListStatus::Uninitialized {
        orchestrator.refresh_list();
    }

    let view = orchestrator.settled().await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view.list)?),
        OutputFormat::Table => print_summaries(orchestrator.kind(), &view.list.items),
    }
    Ok(())
}

async fn run_profile(
    orchestrator: &EntityOrchestrator,
    context: &Arc<SharedContext>,
    id: &str,
    format: &OutputFormat,
) -> CliResult {
    orchestrator.select_by_id(id);
    let view = orchestrator.settled().await;
    if let Some(error) = view.profile_error() {
        return Err(error.into());
    }
    print_profile(orchestrator.kind(), context, &view, format)
}

async fn run_suggest(orchestrator: &EntityOrchestrator, text: &str, format: &OutputFormat) -> CliResult {
    // Short queries show the default list, which needs the list loaded
    orchestrator.start();
    orchestrator.settled().await;
    orchestrator.search(text);
    let view = orchestrator.settled().await;
    print_search(orchestrator.kind(), &view, format)
}

async fn run_countries(context: &SharedContext, backend: &dyn Backend, format: &OutputFormat) -> CliResult {
    let countries = context.load_countries(backend).await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&countries)?),
        OutputFormat::Table => {
            for country in &countries {
                println!("{}", country);
            }
            println!("{} country(ies)", countries.len());
        }
    }
    Ok(())
}

async fn run_shell(
    orchestrator: &EntityOrchestrator,
    context: &Arc<SharedContext>,
    format: &OutputFormat,
) -> CliResult {
    let kind = orchestrator.kind().name.clone();
    println!("Intelview Interactive Shell ({})", kind);
    println!("Type to search, or :help for commands. :quit to exit.\n");

    orchestrator.start();
    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        eprint!("{}> ", kind);

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (command, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
        let rest = rest.trim();
        let outcome = match command {
            ":quit" | ":exit" | ":q" => break,
            ":help" | ":h" => {
                println!("Commands:");
                println!("  :list                 Show the entity list");
                println!("  :select <id>          Load and show a profile");
                println!("  :filter <key> <a,b>   Set a filter (no values removes it)");
                println!("  :filters              Show active filters");
                println!("  :clear                Clear selection and search");
                println!("  :quit                 Exit shell");
                println!("  <text>                Search suggestions");
                Ok(())
            }
            ":list" => {
                let view = orchestrator.settled().await;
                print_summaries(orchestrator.kind(), &view.list.items);
                Ok(())
            }
            ":select" => {
                orchestrator.select_by_id(rest);
                let view = orchestrator.settled().await;
                match view.profile_error() {
                    Some(error) => Err(error.into()),
                    None => print_profile(orchestrator.kind(), context, &view, format),
                }
            }
            ":filter" => {
                let (key, values) = rest.split_once(' ').unwrap_or((rest, ""));
                let values = values
                    .split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                match orchestrator.set_filter(key, values) {
                    Ok(_) => {
                        let view = orchestrator.settled().await;
                        println!("{} entit(ies)", view.list.items.len());
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                }
            }
            ":filters" => {
                let view = orchestrator.view();
                for (key, values) in &view.list.filters {
                    println!("  {} = {}", key, values.join(", "));
                }
                Ok(())
            }
            ":clear" => {
                orchestrator.clear();
                Ok(())
            }
            _ => {
                orchestrator.search(trimmed);
                let view = orchestrator.settled().await;
                print_search(orchestrator.kind(), &view, format)
            }
        };

        if let Err(e) = outcome {
            eprintln!("Error: {}", e);
        }
    }

    orchestrator.shutdown();
    println!("Bye!");
    Ok(())
}

fn print_summaries(kind: &EntityKind, items: &[EntitySummary]) {
    if items.is_empty() {
        println!("(no results)");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "id",
        kind.label_field.as_str(),
        kind.secondary_field.as_deref().unwrap_or("detail"),
    ]);
    for item in items {
        table.add_row(vec![
            item.entity_id.clone(),
            item.label.clone(),
            item.secondary_label.clone().unwrap_or_default(),
        ]);
    }

    println!("{}", table);
    println!("{} row(s)", items.len());
}

fn print_search(kind: &EntityKind, view: &OrchestratorView, format: &OutputFormat) -> CliResult {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view.search)?),
        OutputFormat::Table => print_summaries(kind, &view.search.candidates),
    }
    Ok(())
}

fn print_profile(
    kind: &EntityKind,
    context: &Arc<SharedContext>,
    view: &OrchestratorView,
    format: &OutputFormat,
) -> CliResult {
    let Some(profile) = view.profile() else {
        println!("(no profile)");
        return Ok(());
    };
    let images = ImageResolver::new(Arc::clone(context)).profile_images(kind, profile);

    if let OutputFormat::Json = format {
        let mut value = serde_json::to_value(profile)?;
        value["images"] = serde_json::json!(images);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} ({})", profile.display_name(), profile.entity_id);

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["property", "value"]);
    for (key, value) in &profile.properties {
        table.add_row(vec![key.clone(), format_table_value(value)]);
    }
    println!("{}", table);

    for relation in &kind.relation_kinds {
        let related: Vec<&str> = if kind.is_singular(relation) {
            profile.head(relation).map(|s| s.label.as_str()).into_iter().collect()
        } else {
            profile.relation(relation).iter().map(|s| s.label.as_str()).collect()
        };
        if !related.is_empty() {
            println!("{}: {}", relation, related.join(", "));
        }
    }
    for url in images {
        println!("image: {}", url);
    }
    Ok(())
}

fn format_table_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(format_table_value)
            .collect::<Vec<_>>()
            .join(", "),
        serde_json::Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}
