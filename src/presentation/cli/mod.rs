pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "orch")]
#[command(version = "0.1.0")]
#[command(about = "Cluster workload orchestrator", long_about = None)]
pub struct Cli {
    /// etcd endpoints backing the cluster state, comma-separated
    #[arg(long, global = true, value_delimiter = ',', default_value = "http://localhost:2379")]
    pub etcd: Vec<String>,

    /// Scheduling namespace
    #[arg(long, global = true, default_value = "default")]
    pub namespace: String,

    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Run a node agent that hosts scheduled jobs")]
    Agent {
        /// Routable host:port to listen on; doubles as the advertised node endpoint
        #[arg(short, long, default_value = "127.0.0.1:10004")]
        bind: String,

        /// Node name, unique within the namespace
        #[arg(short, long)]
        name: String,

        /// CPU shares available to the scheduler
        #[arg(long, default_value_t = 4000)]
        cpu: i64,

        /// Block IO shares available to the scheduler
        #[arg(long, default_value_t = 4000)]
        io: i64,

        /// Memory megabytes available to the scheduler
        #[arg(long, default_value_t = 4000)]
        memory: i64,
    },

    #[command(about = "Store a job definition in the cluster")]
    Create {
        /// Unique name of the job
        #[arg(short, long)]
        name: String,

        /// Service unit file describing the job
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },

    #[command(about = "Remove a job definition from the cluster")]
    Destroy {
        #[arg(short, long)]
        name: String,
    },

    #[command(about = "List jobs, or show one job's placement")]
    List {
        #[arg(short, long)]
        name: Option<String>,
    },

    #[command(about = "Show fleet capacity and assignments")]
    Status,

    #[command(about = "Schedule a job onto a node")]
    Start {
        #[arg(short, long)]
        name: String,
    },

    #[command(about = "Unschedule a running job")]
    Stop {
        #[arg(short, long)]
        name: String,
    },

    #[command(about = "Fetch recent log lines from the node running a job")]
    Tail {
        #[arg(short, long)]
        name: String,

        /// Number of lines to display
        #[arg(short, long, default_value_t = 20)]
        count: usize,
    },
}
