use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::TokenGenerator;
use crate::config::ServerConfig;
use crate::store::{AccessStore, EndpointStore, ProjectStore, SqliteStore, Store};
use crate::types::{Endpoint, Permission, Project, ProjectGrant, Token, User};

use super::init_store;

pub fn run_init(data_dir: String) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: PathBuf::from(data_dir),
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let db_path = config.db_path();
    if db_path.exists() {
        anyhow::bail!("Server already initialized at {}", db_path.display());
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Initialized database at {}", db_path.display());
    Ok(())
}

pub fn run_project_add(data_dir: String, name: String) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Project name cannot be empty");
    }

    let project = Project {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        created_at: Utc::now(),
    };
    store.create_project(&project)?;

    println!("{}", project.id);
    Ok(())
}

pub fn run_endpoint_add(
    data_dir: String,
    project_id: String,
    name: String,
    url: String,
    owner_id: Option<String>,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    if store.get_project(&project_id)?.is_none() {
        anyhow::bail!("Project '{project_id}' not found");
    }

    let now = Utc::now();
    let endpoint = Endpoint {
        id: Uuid::new_v4().to_string(),
        project_id,
        name,
        url,
        owner_id: owner_id.filter(|o| !o.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };
    store.create_endpoint(&endpoint)?;

    println!("{}", endpoint.id);
    Ok(())
}

/// Prints the user id on the first line and the raw API token on the second.
/// The token is not recoverable afterwards.
pub fn run_user_add(data_dir: String, name: String) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let generator = TokenGenerator::new();

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    let (raw_token, lookup, hash) = generator.generate()?;
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id: user.id.clone(),
        created_at: now,
        expires_at: None,
        last_used_at: None,
    };
    store.create_token(&token)?;

    println!("{}", user.id);
    println!("{raw_token}");
    Ok(())
}

pub fn run_grant(
    data_dir: String,
    user_id: String,
    project_id: String,
    allow: String,
    deny: String,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let allow_bits = Permission::parse_list(&allow)
        .ok_or_else(|| anyhow::anyhow!("Invalid permission list: '{allow}'"))?;
    let deny_bits = Permission::parse_list(&deny)
        .ok_or_else(|| anyhow::anyhow!("Invalid permission list: '{deny}'"))?;

    if store.get_user(&user_id)?.is_none() {
        anyhow::bail!("User '{user_id}' not found");
    }
    if store.get_project(&project_id)?.is_none() {
        anyhow::bail!("Project '{project_id}' not found");
    }

    let now = Utc::now();
    store.upsert_project_grant(&ProjectGrant {
        user_id: user_id.clone(),
        project_id: project_id.clone(),
        allow_bits,
        deny_bits,
        created_at: now,
        updated_at: now,
    })?;

    println!(
        "Granted [{}] denied [{}] on project {project_id} to user {user_id}",
        allow_bits.to_strings().join(","),
        deny_bits.to_strings().join(",")
    );
    Ok(())
}
