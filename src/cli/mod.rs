mod admin;
mod commands;

pub use admin::{run_endpoint_add, run_grant, run_init, run_project_add, run_user_add};
pub use commands::{AdminCommands, EndpointCommands, ProjectCommands, UserCommands};

use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::store::SqliteStore;

/// Open the store in a data directory, checking it has been initialized.
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let config = ServerConfig {
        data_dir: PathBuf::from(data_dir),
        ..ServerConfig::default()
    };
    let db_path = config.db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'wicket admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
