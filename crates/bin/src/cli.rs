//! CLI argument definitions for the Viewsync binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Load JSON records and print the synchronized view over them
#[derive(Parser, Debug)]
#[command(name = "viewsync")]
#[command(about = "Viewsync: sorted, filtered and hierarchical views over JSON records")]
#[command(version)]
pub struct Cli {
    /// JSON config file with default view options
    #[arg(short, long, global = true, env = "VIEWSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show records as a sorted, filtered table
    Table(TableArgs),
    /// Show records as a page tree built from their paths
    Tree(TreeArgs),
}

/// Arguments for the table command
#[derive(clap::Args, Debug)]
pub struct TableArgs {
    /// JSON file holding an array of objects with a `key` or `path` field
    pub file: PathBuf,

    /// Field to sort rows by
    #[arg(short, long)]
    pub sort_field: Option<String>,

    /// Sort in descending order
    #[arg(short, long)]
    pub descending: bool,

    /// Only show records containing this text (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the tree command
#[derive(clap::Args, Debug)]
pub struct TreeArgs {
    /// JSON file holding an array of objects with a `path` field
    pub file: PathBuf,

    /// Numeric field summed into each page; pages count leaves without it
    #[arg(short = 'S', long)]
    pub sum_field: Option<String>,

    /// Field to sort the children of every page by
    #[arg(short, long)]
    pub sort_field: Option<String>,

    /// Sort in descending order
    #[arg(short, long)]
    pub descending: bool,

    /// Only show leaves whose path or fields contain this text
    #[arg(short, long)]
    pub filter: Option<String>,
}
