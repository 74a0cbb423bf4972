//! The load cycle behind one performance chart.
//!
//! A cycle is `Loading → Error | Empty | Ready`. Any change of period, mode or
//! account starts a new cycle via [`PerformanceChart::load`]; there is no
//! incremental update. Each cycle takes a generation number, and a result is
//! committed only while its generation is still the latest. Results from a
//! superseded cycle are dropped as [`LoadOutcome::Stale`].
//!
//! Fetches fan out in two phases: positions, account and cash history
//! together, then one history request per symbol. Composition waits for the
//! whole fan-out. Every fetch is bounded by the configured timeout.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use futures::future::join_all;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::ClientConfig,
    models::{bar::BarSeries, period::Period},
    providers::{BrokerageApi, ProviderError},
    series::{
        compose::{ChartMode, CompositionInput, SeriesDescriptor, compose},
        ledger,
    },
};

/// What to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadRequest {
    pub period: Period,
    pub mode: ChartMode,
}

/// Why a cycle finished without anything to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EmptyReason {
    NoPositions,
    NoHistory,
}

impl EmptyReason {
    pub fn message(self) -> &'static str {
        match self {
            EmptyReason::NoPositions => "No open positions",
            EmptyReason::NoHistory => "No price history available for the selected period",
        }
    }
}

/// Everything a renderer needs to know about the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ChartState {
    Idle,
    Loading {
        generation: u64,
    },
    Error {
        generation: u64,
        message: String,
    },
    Empty {
        generation: u64,
        reason: EmptyReason,
    },
    Ready {
        generation: u64,
        descriptor: Arc<SeriesDescriptor>,
    },
}

impl ChartState {
    pub fn generation(&self) -> Option<u64> {
        match self {
            ChartState::Idle => None,
            ChartState::Loading { generation }
            | ChartState::Error { generation, .. }
            | ChartState::Empty { generation, .. }
            | ChartState::Ready { generation, .. } => Some(*generation),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ChartState::Loading { .. })
    }
}

/// Result of one [`PerformanceChart::load`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The cycle's final state was committed.
    Committed(ChartState),
    /// A newer cycle started first; nothing from this one was applied.
    Stale { generation: u64 },
}

/// A single fetch that did not produce data.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch {what}: {source}")]
    Provider {
        what: String,
        #[source]
        source: ProviderError,
    },

    #[error("Timed out fetching {what} after {}ms", .after.as_millis())]
    Timeout { what: String, after: Duration },
}

async fn bounded<T, F>(limit: Duration, what: &str, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(FetchError::Provider {
            what: what.to_string(),
            source,
        }),
        Err(_) => Err(FetchError::Timeout {
            what: what.to_string(),
            after: limit,
        }),
    }
}

/// Owns the state of one chart and runs its load cycles.
#[derive(Debug)]
pub struct PerformanceChart {
    generation: AtomicU64,
    state: watch::Sender<ChartState>,
    fetch_timeout: Duration,
}

impl PerformanceChart {
    pub fn new(fetch_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ChartState::Idle);
        Self {
            generation: AtomicU64::new(0),
            state,
            fetch_timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.fetch_timeout())
    }

    /// Receives every committed state, latest wins.
    pub fn subscribe(&self) -> watch::Receiver<ChartState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ChartState {
        self.state.borrow().clone()
    }

    /// Generation of the most recently started cycle.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Supersedes any in-flight cycle and returns to `Idle`.
    pub fn cancel(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.commit(generation, ChartState::Idle);
        debug!(generation, "load cycle cancelled");
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Writes `next` if `generation` is still current. The check runs under
    /// the channel's write lock.
    fn commit(&self, generation: u64, next: ChartState) -> bool {
        self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = next;
            true
        })
    }

    fn finish(&self, generation: u64, next: ChartState) -> LoadOutcome {
        if self.commit(generation, next.clone()) {
            LoadOutcome::Committed(next)
        } else {
            self.stale(generation)
        }
    }

    fn stale(&self, generation: u64) -> LoadOutcome {
        info!(
            generation,
            latest = self.current_generation(),
            "discarding results of superseded load cycle"
        );
        LoadOutcome::Stale { generation }
    }

    /// Runs one full load cycle against `provider`.
    ///
    /// Switching accounts is a load with a different provider.
    #[instrument(skip(self, provider), fields(period = %request.period, mode = ?request.mode))]
    pub async fn load<P>(&self, provider: &P, request: LoadRequest) -> LoadOutcome
    where
        P: BrokerageApi + ?Sized,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.commit(generation, ChartState::Loading { generation });
        debug!(generation, "load cycle started");

        let limit = self.fetch_timeout;
        let (positions, account, cash) = tokio::join!(
            bounded(limit, "positions", provider.fetch_positions()),
            bounded(limit, "account", provider.fetch_account()),
            bounded(limit, "cash history", provider.fetch_cash_history()),
        );
        if !self.is_current(generation) {
            return self.stale(generation);
        }

        let positions = match positions {
            Ok(positions) => positions,
            Err(e) => {
                warn!(error = %e, "positions unavailable");
                return self.finish(
                    generation,
                    ChartState::Error {
                        generation,
                        message: e.to_string(),
                    },
                );
            }
        };
        let cash_balance = match account {
            Ok(account) => account.cash(),
            Err(e) => {
                warn!(error = %e, "account summary unavailable; assuming zero cash");
                0.0
            }
        };
        let cash = match cash {
            Ok(payload) => Some(ledger::from_payload(
                payload,
                cash_balance,
                Utc::now().timestamp(),
            )),
            Err(e) => {
                warn!(error = %e, "cash history unavailable; using flat balance");
                None
            }
        };

        if positions.is_empty() {
            return self.finish(
                generation,
                ChartState::Empty {
                    generation,
                    reason: EmptyReason::NoPositions,
                },
            );
        }

        let mut symbols: Vec<&str> = Vec::with_capacity(positions.len());
        for p in &positions {
            if !symbols.contains(&p.symbol.as_str()) {
                symbols.push(&p.symbol);
            }
        }
        let period = request.period;
        let results = join_all(symbols.iter().map(|&symbol| async move {
            let what = format!("history for {symbol}");
            let result = bounded(limit, &what, provider.fetch_history(symbol, period)).await;
            (symbol, result)
        }))
        .await;
        if !self.is_current(generation) {
            return self.stale(generation);
        }

        let histories: IndexMap<String, BarSeries> = results
            .into_iter()
            .map(|(symbol, result)| {
                let series = result.unwrap_or_else(|e| {
                    warn!(symbol, error = %e, "substituting empty history");
                    BarSeries::empty(symbol, period)
                });
                (symbol.to_string(), series)
            })
            .collect();

        if histories.values().all(BarSeries::is_empty) {
            return self.finish(
                generation,
                ChartState::Empty {
                    generation,
                    reason: EmptyReason::NoHistory,
                },
            );
        }

        let input = CompositionInput {
            positions,
            histories,
            cash,
            cash_balance,
        };
        let descriptor = compose(&input, request.mode);
        debug!(
            generation,
            points = descriptor.axis.len(),
            layers = descriptor.layers.len(),
            "composed chart"
        );
        self.finish(
            generation,
            ChartState::Ready {
                generation,
                descriptor: Arc::new(descriptor),
            },
        )
    }
}
