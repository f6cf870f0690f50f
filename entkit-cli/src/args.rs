use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "entkit")]
#[command(about = "Inspect entities, fields and revisions in an entkit store")]
pub struct Cli {
    /// Path to the TOML schema/config file
    #[arg(short, long, default_value = "entkit.toml")]
    pub config: PathBuf,

    /// SQLite database, overriding `[database] path`
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print an entity's keys, version identity and decoded fields
    Show {
        entity_type: String,
        id: u64,
        /// Fields to decode (default: every field of the bundle)
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },
    /// Check whether an entity exists, by id or uuid
    Exists { entity_type: String, identifier: String },
    /// Print the latest revision, optionally switching to another one
    Revisions {
        entity_type: String,
        id: u64,
        /// Revision id or revision uuid to switch to
        #[arg(short, long)]
        switch: Option<String>,
    },
}
