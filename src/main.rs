use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use adams_mcp::config::{load_config, LogFormat, LoggingConfig};
use adams_mcp::mcp::{parse_search_args, McpServer, ToolContext};
use adams_mcp::models::{AccessionNumber, Document, SearchOutcome};
use adams_mcp::utils::extract_text_blocking;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ADAMS MCP - Search, download and read NRC ADAMS documents
#[derive(Parser, Debug)]
#[command(name = "adams-mcp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search, download and read NRC ADAMS documents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table if stdout is a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server
    Serve {
        /// Serve streamable HTTP instead of stdio
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Search ADAMS (and optionally nrc.gov via Google)
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        /// Number of ADAMS result pages to fetch (1-10)
        #[arg(long, default_value_t = 1)]
        max_pages: i64,

        /// Maximum number of results (1-50)
        #[arg(long, short = 'n', default_value_t = 5)]
        top_n: i64,

        /// Skip the Google secondary search
        #[arg(long)]
        no_google: bool,

        /// Exact document type
        #[arg(long)]
        document_type: Option<String>,

        /// Docket number prefix
        #[arg(long)]
        docket: Option<String>,

        /// Earliest document date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest document date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Added to ADAMS: today, this_week or this_month
        #[arg(long)]
        added_period: Option<String>,

        /// Added to ADAMS in the last N days
        #[arg(long)]
        days_back: Option<i64>,
    },

    /// Download a document's PDF
    #[command(alias = "d")]
    Download {
        /// Accession number (e.g. ML24001A001)
        accession_number: String,

        /// Directory to save into (default: downloads.directory)
        #[arg(long, short)]
        directory: Option<PathBuf>,
    },

    /// Show metadata for one document
    Get {
        /// Accession number (e.g. ML24001A001)
        accession_number: String,
    },

    /// Extract leading text from a local PDF
    Summarize {
        /// Path to the PDF
        path: PathBuf,

        /// Maximum characters to extract (100-10000)
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Print the effective configuration with secrets redacted
    Config,
}

fn init_tracing(config: &LoggingConfig, verbose: u8, quiet: bool) -> Result<WorkerGuard> {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => config.level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("adams_mcp={}", level)));

    // stdout carries MCP stdio traffic, so logs go to stderr or a file
    let (writer, guard) = match &config.file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("logging.file has no file name: {}", path.display()))?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(config.file.is_none() && std::io::stderr().is_terminal());

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry().with(filter).with(layer).init(),
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let _guard = init_tracing(&config.logging, cli.verbose, cli.quiet)?;
    let output = cli.output.resolve();

    if let Commands::Config = cli.command {
        print!("{}", toml::to_string_pretty(&config.redacted())?);
        return Ok(());
    }

    let context = Arc::new(ToolContext::from_config(&config)?);

    match cli.command {
        Commands::Serve { http, port, host } => {
            let server = McpServer::new(context)?;

            if http {
                let addr = format!("{}:{}", host, port);
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                handle
                    .await
                    .map_err(|e| anyhow!("Server task failed: {}", e))?;
            } else {
                server.run().await?;
            }
        }

        Commands::Search {
            query,
            max_pages,
            top_n,
            no_google,
            document_type,
            docket,
            from,
            to,
            added_period,
            days_back,
        } => {
            let request = parse_search_args(&json!({
                "query": query,
                "max_pages": max_pages,
                "top_n": top_n,
                "use_google": !no_google,
                "document_type": document_type,
                "docket_number": docket,
                "date_from": from,
                "date_to": to,
                "added_period": added_period,
                "days_back": days_back,
            }))?;

            let outcome = context.hybrid().search(request).await?;
            print_outcome(&outcome, output)?;
        }

        Commands::Download {
            accession_number,
            directory,
        } => {
            let accession = AccessionNumber::parse(&accession_number)?;
            let directory = directory.unwrap_or_else(|| config.downloads.directory.clone());
            let result = context.adams().download_accession(&accession, &directory).await?;

            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                _ => println!(
                    "Saved {} ({} bytes) to {}",
                    result.accession_number, result.size_bytes, result.path
                ),
            }
        }

        Commands::Get { accession_number } => {
            let accession = AccessionNumber::parse(&accession_number)?;
            let document = context
                .adams()
                .get_document(&accession)
                .await?
                .ok_or_else(|| anyhow!("Document {} not found in ADAMS", accession))?;

            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
                _ => print_document(&document),
            }
        }

        Commands::Summarize { path, max_chars } => {
            let max_chars = max_chars.unwrap_or(config.pdf.default_max_chars);
            let summary = extract_text_blocking(path, max_chars).await?;

            match output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                _ => {
                    println!(
                        "{} ({} pages, {} of {} characters)\n",
                        summary.path, summary.total_pages, summary.extracted_chars, summary.total_chars
                    );
                    println!("{}", summary.text);
                }
            }
        }

        Commands::Config => {}
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let prefix: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", prefix)
    } else {
        text.to_string()
    }
}

fn print_outcome(outcome: &SearchOutcome, output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    use comfy_table::{Attribute, Cell, Table};
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Accession", "Date", "Type", "Title", "Source"]);

    for document in &outcome.results {
        table.add_row(vec![
            Cell::new(
                document
                    .accession_number
                    .as_ref()
                    .map(|a| a.to_string())
                    .unwrap_or_default(),
            )
            .add_attribute(Attribute::Bold),
            Cell::new(
                document
                    .document_date
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
            ),
            Cell::new(truncate(document.document_type.as_deref().unwrap_or(""), 25)),
            Cell::new(truncate(&document.title, 60)),
            Cell::new(document.source.name()),
        ]);
    }
    println!("{table}");

    println!(
        "{} results ({} ADAMS, {} Google)",
        outcome.returned, outcome.primary_count, outcome.secondary_count
    );
    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(())
}

fn print_document(document: &Document) {
    println!("{}", document.title);
    let fields = [
        ("Accession", document.accession_number.as_ref().map(|a| a.to_string())),
        ("Date", document.document_date.map(|d| d.to_string())),
        ("Type", document.document_type.clone()),
        ("Docket", document.docket_number.clone()),
        ("Author", document.author_name.clone()),
        ("Added", document.added_date.clone()),
        ("Pages", document.page_count.map(|p| p.to_string())),
        ("URL", document.download_url.clone()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {:<10} {}", label, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_serve_defaults_to_stdio() {
        let cli = Cli::parse_from(["adams-mcp", "serve"]);
        match cli.command {
            Commands::Serve { http, port, host } => {
                assert!(!http);
                assert_eq!(port, 3000);
                assert_eq!(host, "127.0.0.1");
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_serve_http() {
        let cli = Cli::parse_from(["adams-mcp", "serve", "--http", "--port", "8080"]);
        assert!(matches!(
            cli.command,
            Commands::Serve {
                http: true,
                port: 8080,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_search_with_options() {
        let cli = Cli::parse_from([
            "adams-mcp",
            "search",
            "steam generator",
            "--top-n",
            "10",
            "--no-google",
            "--from",
            "2020-01-01",
        ]);
        match cli.command {
            Commands::Search {
                query,
                top_n,
                no_google,
                from,
                max_pages,
                ..
            } => {
                assert_eq!(query, "steam generator");
                assert_eq!(top_n, 10);
                assert!(no_google);
                assert_eq!(from.as_deref(), Some("2020-01-01"));
                assert_eq!(max_pages, 1);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "adams-mcp",
            "get",
            "ML24001A001",
            "-vv",
            "--config",
            "custom.toml",
            "--output",
            "json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }
}
