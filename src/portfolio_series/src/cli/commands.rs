use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::{account::OrderStatusFilter, period::Period};

use super::params::parse_order_status;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the config file (portfolio_series.toml)
    #[arg(short, long, default_value = "portfolio_series.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the performance chart and print its final state as JSON
    Chart {
        /// Chart window: 1D, 1W, 1M, 3M, 1Y or ALL (defaults to the config value)
        #[arg(long)]
        period: Option<Period>,

        /// Percent-return view instead of stacked dollars
        #[arg(long)]
        percent: bool,
    },

    /// Reconstruct the cash balance history
    CashHistory,

    /// Show identity-verification status
    KycStatus,

    /// List orders
    Orders {
        /// open, closed or all
        #[arg(long, default_value = "open", value_parser = parse_order_status)]
        status: OrderStatusFilter,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Latest quote for a symbol
    Quote {
        symbol: String,
    },
}
