//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::domain::{CleanupMode, TraversalOrder};

/// Explore a tree of weakly referenced values and what happens when they expire
#[derive(Parser, Debug)]
#[command(name = "weaktree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log verbosity, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file, layered over the global one
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the sample tree, expire values, show the result
    Demo {
        /// Cleanup mode for every node (default: from config)
        #[arg(short, long)]
        mode: Option<CleanupMode>,

        /// Per-node mode override, e.g. `--node-mode 1=reparent`
        #[arg(long = "node-mode", value_parser = parse_node_mode)]
        node_modes: Vec<(String, CleanupMode)>,

        /// Labels whose value to drop, in order
        #[arg(short, long, value_delimiter = ',')]
        expire: Vec<String>,

        /// Leave expired nodes out of the rendering
        #[arg(long)]
        hide_expired: bool,
    },

    /// Print the labels a traversal of the sample tree emits
    Walk {
        /// Traversal order (default: from config)
        #[arg(short, long)]
        order: Option<TraversalOrder>,

        /// Label of the starting node (default: root)
        #[arg(short, long)]
        from: Option<String>,

        /// Cleanup mode for every node (default: from config)
        #[arg(short, long)]
        mode: Option<CleanupMode>,

        /// Labels whose value to drop before walking
        #[arg(short, long, value_delimiter = ',')]
        expire: Vec<String>,
    },

    /// Show each node's stored mode and the strategy its expiry would run
    Resolve {
        /// Cleanup mode for every node (default: from config)
        #[arg(short, long)]
        mode: Option<CleanupMode>,

        /// Per-node mode override, e.g. `--node-mode 1=reparent`
        #[arg(long = "node-mode", value_parser = parse_node_mode)]
        node_modes: Vec<(String, CleanupMode)>,
    },

    /// Print effective settings
    Config,

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Parses `label=mode`.
pub fn parse_node_mode(s: &str) -> Result<(String, CleanupMode), String> {
    let (label, mode) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=MODE, got '{}'", s))?;
    let mode = mode.parse::<CleanupMode>().map_err(|e| e.to_string())?;
    Ok((label.trim().to_string(), mode))
}
