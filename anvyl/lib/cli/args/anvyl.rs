use clap::Parser;
use tracing::Level;

use crate::cli::styles;

//-------------------------------------------------------------------------------------------------
// Types
//-------------------------------------------------------------------------------------------------

/// Anvyl CLI - manage Docker containers and system state on a single node
#[derive(Debug, Parser)]
#[command(name = "anvyl", author, about, version, styles=styles::styles())]
pub struct AnvylArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: Option<AnvylSubcommand>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Debug, Parser)]
pub enum AnvylSubcommand {
    /// Start all services (infra, mcp, agent)
    Up,

    /// Stop all services
    Down,

    /// Restart all services
    Restart,

    /// Show status of all services
    Status,

    /// Manage the infrastructure service
    Infra {
        /// The operation to run
        #[command(subcommand)]
        subcommand: ServiceSubcommand,
    },

    /// Manage the MCP server
    Mcp {
        /// The operation to run
        #[command(subcommand)]
        subcommand: ServiceSubcommand,
    },

    /// Manage the agent service
    Agent {
        /// The operation to run
        #[command(subcommand)]
        subcommand: AgentSubcommand,
    },

    /// Manage the host inventory
    Host {
        /// The operation to run
        #[command(subcommand)]
        subcommand: HostSubcommand,
    },

    /// Manage containers
    Container {
        /// The operation to run
        #[command(subcommand)]
        subcommand: ContainerSubcommand,
    },
}

/// Lifecycle operations shared by all services
#[derive(Debug, Parser)]
pub enum ServiceSubcommand {
    /// Start the service
    Up,

    /// Stop the service
    Down,

    /// Show service status
    Status,

    /// Show service logs
    Logs {
        /// Number of lines to show from the end
        #[arg(short = 'n', long)]
        tail: Option<usize>,

        /// Follow the logs
        #[arg(short, long)]
        follow: bool,
    },
}

/// Operations on the agent service
#[derive(Debug, Parser)]
pub enum AgentSubcommand {
    /// Start the service
    Up,

    /// Stop the service
    Down,

    /// Show service status
    Status,

    /// Show service logs
    Logs {
        /// Number of lines to show from the end
        #[arg(short = 'n', long)]
        tail: Option<usize>,

        /// Follow the logs
        #[arg(short, long)]
        follow: bool,
    },

    /// Send a natural-language query to the agent
    Query {
        /// The instruction to run
        #[arg(required = true)]
        text: String,

        /// Target host id
        #[arg(long)]
        host_id: Option<String>,
    },
}

/// Operations on the host inventory
#[derive(Debug, Parser)]
pub enum HostSubcommand {
    /// List registered hosts
    List,

    /// Register a host
    Add {
        /// Host name
        #[arg(short, long)]
        name: String,

        /// Host IP address
        #[arg(short, long)]
        ip: String,

        /// Operating system
        #[arg(long)]
        os: Option<String>,

        /// Tags, repeatable
        #[arg(long = "tag", name = "TAG")]
        tags: Vec<String>,
    },

    /// Show metrics for a host
    Metrics {
        /// Host id
        #[arg(required = true)]
        id: String,
    },

    /// Execute a command on a host (local host only)
    Exec {
        /// Host id
        #[arg(required = true)]
        id: String,

        /// Working directory
        #[arg(long)]
        workdir: Option<String>,

        /// Environment variables, format: <key>=<value>
        #[arg(long = "env", name = "ENV")]
        envs: Vec<String>,

        /// Seconds before the run is abandoned
        #[arg(long)]
        timeout: Option<u64>,

        /// Command to run, after `--`
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

/// Operations on containers
#[derive(Debug, Parser)]
pub enum ContainerSubcommand {
    /// List containers
    List {
        /// Narrow to one host
        #[arg(long)]
        host_id: Option<String>,

        /// Include stopped containers
        #[arg(short, long)]
        all: bool,
    },

    /// Create and start a container
    Create {
        /// Container name
        #[arg(required = true)]
        name: String,

        /// Image reference
        #[arg(required = true)]
        image: String,

        /// Port mappings, format: <host_port>:<container_port>
        #[arg(long = "port", name = "PORT")]
        ports: Vec<String>,

        /// Volume mappings, format: <host_path>:<container_path>
        #[arg(long = "volume", name = "VOLUME")]
        volumes: Vec<String>,

        /// Environment variables, format: <key>=<value>
        #[arg(long = "env", name = "ENV")]
        envs: Vec<String>,

        /// Command to run, after `--`
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Stop a container
    Stop {
        /// Container id
        #[arg(required = true)]
        id: String,

        /// Seconds to wait before SIGKILL
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Stop and remove a container
    Remove {
        /// Container id
        #[arg(required = true)]
        id: String,

        /// Force-remove a running container
        #[arg(short, long)]
        force: bool,
    },

    /// Show container logs
    Logs {
        /// Container id
        #[arg(required = true)]
        id: String,

        /// Number of lines to show from the end
        #[arg(short = 'n', long)]
        tail: Option<u32>,
    },

    /// Execute a command inside a container
    Exec {
        /// Container id
        #[arg(required = true)]
        id: String,

        /// Allocate a TTY
        #[arg(long)]
        tty: bool,

        /// Command to run, after `--`
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

//-------------------------------------------------------------------------------------------------
// Methods
//-------------------------------------------------------------------------------------------------

impl AnvylArgs {
    /// Initialize logging system with INFO or DEBUG level based on verbose flag
    pub fn init_logging(&self) {
        let level = if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
    }
}
