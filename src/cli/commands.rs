use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "remote-memory")]
#[command(author, version, about = "Read and write conversation memory on a remote memory service", long_about = None)]
pub struct Cli {
    /// Directory of the file-backed resource store (default: store.root setting)
    #[arg(long, global = true)]
    pub store: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct MemoryTarget {
    /// Name of the memory resource
    #[arg(short = 'n', long)]
    pub name: String,

    #[arg(long, default_value = "default")]
    pub namespace: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Append messages from a JSON array file ("-" reads stdin)
    Add {
        #[command(flatten)]
        target: MemoryTarget,

        /// Session ID (default: the memory's uid)
        #[arg(short = 's', long)]
        session: Option<String>,

        #[arg(short = 'f', long)]
        file: String,
    },

    /// Print the message history of a session
    Get {
        #[command(flatten)]
        target: MemoryTarget,

        #[arg(short = 's', long)]
        session: Option<String>,

        /// Print raw JSON instead of a transcript
        #[arg(long)]
        json: bool,
    },

    /// Show the memory resource and its status
    Show {
        #[command(flatten)]
        target: MemoryTarget,
    },

    /// Create or replace a memory resource with a literal address
    Register {
        #[command(flatten)]
        target: MemoryTarget,

        /// Backend address, e.g. http://localhost:8080
        #[arg(short = 'a', long)]
        address: String,
    },
}
