//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - weights: show the current weight table of a pool
//! - draw: weighted draw from a pool, optionally recorded
//! - lottery: prize draw, optionally paired with a student draw
//! - preview: one uniform animation frame
//! - reset: clear an exclusion cycle or a whole pool history
//! - history: summarize a stored pool record

use clap::{Args, Parser, Subcommand, ValueEnum};
use fairdraw::domain::{PoolKey, PoolKind};
use std::path::PathBuf;

/// Fairdraw - fair roll-call and lottery picker
#[derive(Parser, Debug)]
#[command(name = "fairdraw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    RollCall,
    Lottery,
    GroupDraw,
}

impl From<KindArg> for PoolKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::RollCall => PoolKind::RollCall,
            KindArg::Lottery => PoolKind::Lottery,
            KindArg::GroupDraw => PoolKind::GroupDraw,
        }
    }
}

/// Which pool a command works on
#[derive(Args, Debug, Clone)]
pub struct PoolArgs {
    /// Pool kind
    #[arg(short, long, value_enum, default_value_t = KindArg::RollCall)]
    pub kind: KindArg,

    /// Class or prize pool name
    #[arg(short, long)]
    pub pool: String,
}

impl PoolArgs {
    pub fn key(&self) -> PoolKey {
        PoolKey::new(self.kind.into(), self.pool.clone())
    }
}

/// Group and gender restriction of a draw
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only draw from this group
    #[arg(short, long)]
    pub group: Option<String>,

    /// Only draw candidates of this gender
    #[arg(long)]
    pub gender: Option<String>,
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the weight of every candidate in a pool
    Weights {
        #[command(flatten)]
        pool: PoolArgs,

        /// Roster file (JSON or YAML list of candidates)
        #[arg(short, long)]
        roster: PathBuf,

        /// Only weigh history recorded under this subject
        #[arg(short, long)]
        subject: Option<String>,

        /// Show the factor breakdown
        #[arg(short, long)]
        detailed: bool,
    },

    /// Draw candidates from a pool
    Draw {
        #[command(flatten)]
        pool: PoolArgs,

        /// Roster file (JSON or YAML list of candidates)
        #[arg(short, long)]
        roster: PathBuf,

        /// How many to draw
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        #[command(flatten)]
        filter: FilterArgs,

        /// Repeat threshold: 0 repeat, 1 no repeat, n picks per cycle (default from config)
        #[arg(long)]
        repeat: Option<u32>,

        /// Subject or class period of this draw
        #[arg(short, long)]
        subject: Option<String>,

        /// Record the result in the pool history
        #[arg(long)]
        confirm: bool,
    },

    /// Draw prizes, optionally assigning each to a student
    Lottery {
        /// Prize pool name
        #[arg(short, long)]
        pool: String,

        /// Prize file (JSON or YAML list)
        #[arg(long)]
        prizes: PathBuf,

        /// How many prizes to draw
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Class to assign prizes to
        #[arg(long, requires = "students")]
        class: Option<String>,

        /// Class roster used for assignment
        #[arg(long, requires = "class")]
        students: Option<PathBuf>,

        /// Give each prize to a group of the class instead of a student
        #[arg(long, requires = "class")]
        by_group: bool,

        #[command(flatten)]
        filter: FilterArgs,

        /// Repeat threshold for both pools (default from config)
        #[arg(long)]
        repeat: Option<u32>,

        /// Display template index (default from config)
        #[arg(short, long)]
        template: Option<i64>,

        /// Record the result in both pool histories
        #[arg(long)]
        confirm: bool,
    },

    /// Show one uniform animation frame; nothing is recorded
    Preview {
        /// Roster file (JSON or YAML list of candidates)
        #[arg(short, long)]
        roster: PathBuf,

        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Clear an exclusion cycle, or the whole history of a pool
    Reset {
        #[command(flatten)]
        pool: PoolArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Wipe all fairness history of the pool instead of one exclusion cycle
        #[arg(long)]
        all_history: bool,
    },

    /// Summarize the stored history of a pool
    History {
        #[command(flatten)]
        pool: PoolArgs,

        /// Only show rounds recorded under this subject
        #[arg(short, long)]
        subject: Option<String>,
    },
}
