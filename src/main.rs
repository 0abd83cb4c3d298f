use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use finops_backoffice::{cli, settings::Settings};
use owo_colors::OwoColorize;
use std::net::SocketAddr;
use std::path::PathBuf;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Finance back-office service: CRUD and bulk ingest for vendors, brands, projects, payout accounts and income tables
#[derive(Parser)]
#[command(name = "finops", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source settings from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (overrides FINOPS_BIND)
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Keep records in memory instead of the configured store
        #[arg(long)]
        memory: bool,
    },

    /// Test the connection and key for the configured store
    Ping,

    /// List the collections in the catalog
    Collections,

    /// Write the built-in catalog to a YAML file for editing
    Init {
        /// The catalog file to generate
        #[arg(default_value = "collections.yml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Bulk insert records from a JSON or NDJSON file
    Import {
        /// Collection to insert into
        collection: String,

        /// A JSON array, {"records": [...]} object, or NDJSON file
        file: PathBuf,
    },

    /// Write every row of a collection to an NDJSON file
    Export {
        /// Collection to read
        collection: String,

        /// Output file, defaults to <collection>.ndjson
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = dotenvy::from_filename(&cli.env) {
        if !e.not_found() {
            return Err(e.into());
        }
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Serve { bind, memory } => {
            cli::serve(&settings, bind, memory).await?;
        }
        Commands::Ping => {
            log::info!("Testing connection to the store");
            let state = cli::load_state(&settings, false)?;
            cli::ping(&state).await?;
        }
        Commands::Collections => {
            cli::print_collections(&settings.catalog()?);
        }
        Commands::Init { path, force } => {
            log::info!("Writing catalog to {}", path.display().bright_black());
            cli::init_catalog(&path, force)?;
        }
        Commands::Import { collection, file } => {
            let state = cli::load_state(&settings, false)?;
            let result = cli::import(&state, &collection, &file).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Export { collection, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.ndjson", collection)));
            let state = cli::load_state(&settings, false)?;
            cli::export(&state, &collection, &output).await?;
        }
    }

    Ok(())
}
