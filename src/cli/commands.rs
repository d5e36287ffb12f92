use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the data directory and database
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Manage endpoints
    Endpoint {
        #[command(subcommand)]
        command: EndpointCommands,
    },

    /// Manage dashboard users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Grant or deny project permissions to a user
    Grant {
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[arg(long)]
        user_id: String,

        #[arg(long)]
        project_id: String,

        /// Permissions to allow (e.g., "project:read,project:manage")
        #[arg(long, default_value = "")]
        allow: String,

        /// Permissions to deny
        #[arg(long, default_value = "")]
        deny: String,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project and print its id
    Add {
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum EndpointCommands {
    /// Register an endpoint in a project and print its id
    Add {
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[arg(long)]
        project_id: String,

        #[arg(long)]
        name: String,

        /// Delivery URL of the endpoint
        #[arg(long)]
        url: String,

        /// Tenant that owns the endpoint
        #[arg(long)]
        owner_id: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user and an API token for it
    Add {
        #[arg(long, default_value = "./data")]
        data_dir: String,

        #[arg(long)]
        name: String,
    },
}
