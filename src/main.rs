use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wicket::cli::{self, AdminCommands, EndpointCommands, ProjectCommands, UserCommands};
use wicket::config::ServerConfig;
use wicket::server::{AppState, create_router};
use wicket::store::SqliteStore;

#[derive(Parser)]
#[command(name = "wicket")]
#[command(about = "Portal link delegation server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file. Flags given on the command line take precedence.
        #[arg(long, short)]
        config: Option<String>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<String>,

        /// Public base URL for portal links (e.g., "https://dashboard.example.com").
        /// If not set, URLs are derived from request headers.
        #[arg(long)]
        public_base_url: Option<String>,
    },
}

fn run_admin(command: AdminCommands) -> anyhow::Result<()> {
    match command {
        AdminCommands::Init { data_dir } => cli::run_init(data_dir),
        AdminCommands::Project { command } => match command {
            ProjectCommands::Add { data_dir, name } => cli::run_project_add(data_dir, name),
        },
        AdminCommands::Endpoint { command } => match command {
            EndpointCommands::Add {
                data_dir,
                project_id,
                name,
                url,
                owner_id,
            } => cli::run_endpoint_add(data_dir, project_id, name, url, owner_id),
        },
        AdminCommands::User { command } => match command {
            UserCommands::Add { data_dir, name } => cli::run_user_add(data_dir, name),
        },
        AdminCommands::Grant {
            data_dir,
            user_id,
            project_id,
            allow,
            deny,
        } => cli::run_grant(data_dir, user_id, project_id, allow, deny),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wicket=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => run_admin(command)?,
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            public_base_url,
        } => {
            let mut config = match config {
                Some(path) => ServerConfig::from_file(path)?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir.into();
            }
            if public_base_url.is_some() {
                config.public_base_url = public_base_url;
            }

            let db_path = config.db_path();
            if !db_path.exists() {
                bail!("Server not initialized. Run 'wicket admin init' first.");
            }
            let store = SqliteStore::new(&db_path)?;
            let state = Arc::new(AppState::new(
                Arc::new(store),
                config.public_base_url.clone(),
            ));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
