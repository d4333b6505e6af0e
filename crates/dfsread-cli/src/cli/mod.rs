//! CLI for the dfsread client.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dfsread_core::client::DfsClient;
use dfsread_core::config;

use commands::{run_cat, run_stat};

/// Top-level CLI for the dfsread read client.
#[derive(Debug, Parser)]
#[command(name = "dfsread")]
#[command(about = "dfsread: resumable streaming reads from WebHDFS-style filesystems", long_about = None)]
pub struct Cli {
    /// Name-node base URL.
    #[arg(long, global = true, default_value = "http://127.0.0.1:9870")]
    pub namenode: String,

    /// User to issue requests as (`user.name` parameter).
    #[arg(long, global = true, default_value = "hdfs")]
    pub user: String,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Stream a file (or a byte range of it) to stdout.
    Cat {
        /// Absolute file path on the filesystem.
        path: String,

        /// Byte offset to start reading from.
        #[arg(long, default_value = "0")]
        offset: u64,

        /// Maximum number of bytes to read (default: to end of file).
        #[arg(long)]
        length: Option<u64>,

        /// Opaque read-mode string forwarded to the backend.
        #[arg(long)]
        read_param: Option<String>,
    },

    /// Print file metadata from the name node.
    Stat {
        /// Absolute file path on the filesystem.
        path: String,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let client = DfsClient::with_user(&cli.namenode, cfg, &cli.user)?;

        match cli.command {
            CliCommand::Cat {
                path,
                offset,
                length,
                read_param,
            } => run_cat(&client, &path, offset, length, read_param.as_deref())?,
            CliCommand::Stat { path } => run_stat(&client, &path)?,
        }

        Ok(())
    }
}
