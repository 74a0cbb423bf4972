//! Command-line front end. Every command prints one JSON document.

pub mod commands;
pub mod params;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde_json::{Value, json};

use crate::{
    config::ClientConfig,
    loader::{LoadOutcome, LoadRequest, PerformanceChart},
    models::account::OrdersQuery,
    providers::{BrokerageApi, brokerage_rest::RestProvider},
    series::{compose::ChartMode, ledger},
};

use commands::{Cli, Commands};

/// Runs one command and returns pretty-printed JSON.
pub async fn run(cli: Cli) -> Result<String> {
    let config = ClientConfig::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?
        .with_env_overrides()?;
    let provider = RestProvider::from_config(&config).context("failed to create provider")?;

    let value = execute(&provider, &config, cli.command).await?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Executes `command` against any provider.
pub async fn execute<P>(provider: &P, config: &ClientConfig, command: Commands) -> Result<Value>
where
    P: BrokerageApi + ?Sized,
{
    let value = match command {
        Commands::Chart { period, percent } => {
            let request = LoadRequest {
                period: period.unwrap_or(config.default_period),
                mode: if percent {
                    ChartMode::Percent
                } else {
                    ChartMode::Stacked
                },
            };
            let chart = PerformanceChart::from_config(config);
            match chart.load(provider, request).await {
                LoadOutcome::Committed(state) => serde_json::to_value(&state)?,
                LoadOutcome::Stale { generation } => {
                    bail!("load cycle {generation} was superseded")
                }
            }
        }
        Commands::CashHistory => {
            let (account, payload) =
                tokio::try_join!(provider.fetch_account(), provider.fetch_cash_history())?;
            let history = ledger::from_payload(payload, account.cash(), Utc::now().timestamp());
            serde_json::to_value(&history)?
        }
        Commands::KycStatus => {
            let review = provider.fetch_kyc_status().await?;
            json!({
                "status": review.status(),
                "reviewStatus": review.review_status.clone(),
                "rejectLabels": review.reject_labels(),
            })
        }
        Commands::Orders { status, limit } => {
            let orders = provider.fetch_orders(&OrdersQuery { status, limit }).await?;
            serde_json::to_value(&orders)?
        }
        Commands::Quote { symbol } => serde_json::to_value(provider.fetch_quote(&symbol).await?)?,
    };
    Ok(value)
}
