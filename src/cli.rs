use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "adsift")]
#[command(about = "Finds potential customers by matching a company list against scraped job-ad hits")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = crate::config::CONFIG_PATH)]
    pub config: String,

    /// Verbose logging (use -v for INFO, -vv for DEBUG)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the default configuration file
    Init,

    /// Scrape job-ad hits for the reference companies, chunk by chunk,
    /// merging each chunk into the durable accumulator
    Acquire {
        /// Companies per adapter invocation (overrides config)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Ignore the completed-chunk ledger and reprocess every chunk
        /// (re-running merged chunks duplicates their counts)
        #[arg(long)]
        no_ledger: bool,
    },

    /// Reconcile the reference list against the accumulated hits and export
    /// the scored candidate tables
    Reconcile {
        /// Output format override: 'csv' or 'json'
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Print the current accumulator contents
    Show,
}
