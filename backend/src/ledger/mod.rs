//! Collateral / debt accounting per user address.
//!
//! All transitions run under a single writer lock, so a deposit and a borrow
//! for the same address can never interleave between read and write.
//! Protocol aggregates are derived from positions and the journal on demand.

pub mod position;
pub mod store;
pub mod tokens;

pub use position::{
    liquidation_ltv, BorrowEntry, CollateralEntry, EntryKind, LedgerEntry, Position,
    PositionSummary,
};
pub use store::{InMemoryPositionRepository, PositionRepository, StoreError};
pub use tokens::{BorrowAsset, CollateralAsset, TokenRegistry};

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::validation::{address_key, is_positive};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Amount is out of range")]
    AmountOutOfRange,

    #[error("Unsupported collateral token: {0}")]
    UnsupportedCollateral(String),

    #[error("Unsupported borrow token: {0}")]
    UnsupportedBorrowToken(String),

    #[error("No collateral deposited")]
    NoCollateral,

    #[error("Insufficient collateral: borrow value {requested} exceeds borrowing capacity {capacity}")]
    InsufficientCollateral { requested: Decimal, capacity: Decimal },

    #[error("No user data found for {0}")]
    PositionNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of an applied transition.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub entry: LedgerEntry,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolStats {
    #[serde(rename = "totalTVL")]
    pub total_tvl: Decimal,
    pub total_debt: Decimal,
    pub utilization_rate: Decimal,
    pub total_users: usize,
    pub active_users: usize,
    pub total_transactions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub deposited: Decimal,
    pub deposited_value: Decimal,
    pub borrowed: Decimal,
    pub borrowed_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesMetric {
    TotalValueLocked,
    TotalDebt,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

pub struct Ledger {
    repository: Arc<dyn PositionRepository>,
    registry: TokenRegistry,
    writer: Mutex<()>,
}

impl Ledger {
    pub fn new(repository: Arc<dyn PositionRepository>, registry: TokenRegistry) -> Self {
        Self {
            repository,
            registry,
            writer: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryPositionRepository::new()),
            TokenRegistry::default(),
        )
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    pub async fn deposit(
        &self,
        address: &str,
        token: &str,
        amount: Decimal,
    ) -> Result<Receipt, LedgerError> {
        if !is_positive(amount) {
            return Err(LedgerError::InvalidAmount);
        }
        let asset = self
            .registry
            .collateral(token)
            .ok_or_else(|| LedgerError::UnsupportedCollateral(token.to_string()))?;

        let key = address_key(address);
        let _guard = self.writer.lock().await;
        let now = Utc::now();

        let mut position = match self.repository.find(&key).await? {
            Some(position) => position,
            None => Position::new(key.clone(), now),
        };
        let value = position
            .add_collateral(asset, amount)
            .ok_or(LedgerError::AmountOutOfRange)?;
        position.updated_at = now;

        let entry = journal_entry(&key, EntryKind::Deposit, &asset.symbol, amount, value, now);
        self.repository.commit(position.clone(), entry.clone()).await?;

        tracing::info!(
            address = %key,
            token = %asset.symbol,
            %amount,
            value_usd = %value,
            total_collateral = %position.total_collateral_value(),
            "collateral deposited"
        );
        Ok(Receipt { entry, position })
    }

    /// Borrows against existing collateral. The resulting total debt may not
    /// exceed the LTV-weighted collateral value.
    pub async fn borrow(
        &self,
        address: &str,
        token: &str,
        amount: Decimal,
    ) -> Result<Receipt, LedgerError> {
        if !is_positive(amount) {
            return Err(LedgerError::InvalidAmount);
        }
        let asset = self
            .registry
            .borrow_asset(token)
            .ok_or_else(|| LedgerError::UnsupportedBorrowToken(token.to_string()))?;

        let key = address_key(address);
        let _guard = self.writer.lock().await;
        let now = Utc::now();

        let mut position = self
            .repository
            .find(&key)
            .await?
            .filter(|position| !position.collaterals.is_empty())
            .ok_or(LedgerError::NoCollateral)?;

        let value = position
            .add_borrow(asset, amount)
            .ok_or(LedgerError::AmountOutOfRange)?;
        let requested = position.total_borrow_value();
        let capacity = position.borrowing_capacity();
        if requested > capacity {
            tracing::warn!(address = %key, %requested, %capacity, "borrow rejected by LTV gate");
            return Err(LedgerError::InsufficientCollateral {
                requested,
                capacity,
            });
        }
        position.updated_at = now;

        let entry = journal_entry(&key, EntryKind::Borrow, &asset.symbol, amount, value, now);
        self.repository.commit(position.clone(), entry.clone()).await?;

        tracing::info!(
            address = %key,
            token = %asset.symbol,
            %amount,
            health_factor = %position.health_factor(),
            "asset borrowed"
        );
        Ok(Receipt { entry, position })
    }

    /// Repays up to the outstanding debt in `token`. Repaying a token with no
    /// open borrow is a recorded no-op.
    pub async fn repay(
        &self,
        address: &str,
        token: &str,
        amount: Decimal,
    ) -> Result<Receipt, LedgerError> {
        if !is_positive(amount) {
            return Err(LedgerError::InvalidAmount);
        }

        let key = address_key(address);
        let _guard = self.writer.lock().await;
        let now = Utc::now();

        let mut position = self
            .repository
            .find(&key)
            .await?
            .ok_or_else(|| LedgerError::PositionNotFound(key.clone()))?;

        let (symbol, applied_value) = match self.registry.borrow_asset(token) {
            Some(asset) => {
                let (_, value) = position.repay(asset, amount);
                (asset.symbol.clone(), value)
            }
            None => (token.trim().to_string(), Decimal::ZERO),
        };
        if applied_value.is_zero() {
            tracing::debug!(address = %key, token = %symbol, "repay matched no open borrow");
        }
        position.updated_at = now;

        let entry = journal_entry(&key, EntryKind::Repay, &symbol, amount, applied_value, now);
        self.repository.commit(position.clone(), entry.clone()).await?;

        tracing::info!(
            address = %key,
            token = %symbol,
            %amount,
            repaid_usd = %applied_value,
            total_borrow = %position.total_borrow_value(),
            "debt repaid"
        );
        Ok(Receipt { entry, position })
    }

    pub async fn position(&self, address: &str) -> Result<Option<Position>, LedgerError> {
        Ok(self.repository.find(&address_key(address)).await?)
    }

    pub async fn positions(&self) -> Result<Vec<Position>, LedgerError> {
        Ok(self.repository.list().await?)
    }

    pub async fn history(
        &self,
        address: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let key = address.map(address_key);
        Ok(self.repository.history(key.as_deref(), limit).await?)
    }

    pub async fn stats(&self) -> Result<ProtocolStats, LedgerError> {
        let positions = self.repository.list().await?;
        let total_transactions = self.repository.entry_count().await?;

        let total_tvl = positions
            .iter()
            .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.total_collateral_value()));
        let total_debt = positions
            .iter()
            .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.total_borrow_value()));

        Ok(ProtocolStats {
            total_tvl,
            total_debt,
            utilization_rate: utilization(total_debt, total_tvl),
            total_users: positions.len(),
            active_users: positions.iter().filter(|p| p.is_active()).count(),
            total_transactions,
        })
    }

    /// Per-token deposited and borrowed totals across all positions.
    pub async fn token_stats(&self) -> Result<BTreeMap<String, TokenStats>, LedgerError> {
        let mut stats: BTreeMap<String, TokenStats> = self
            .registry
            .symbols()
            .into_iter()
            .map(|symbol| (symbol, TokenStats::default()))
            .collect();

        for position in self.repository.list().await? {
            for entry in &position.collaterals {
                let token = stats.entry(entry.token.clone()).or_default();
                token.deposited = token.deposited.saturating_add(entry.amount);
                token.deposited_value = token.deposited_value.saturating_add(entry.value);
            }
            for entry in &position.borrows {
                let token = stats.entry(entry.token.clone()).or_default();
                token.borrowed = token.borrowed.saturating_add(entry.amount);
                token.borrowed_value = token.borrowed_value.saturating_add(entry.value);
            }
        }
        Ok(stats)
    }

    /// End-of-day totals replayed from the journal.
    pub async fn daily_series(&self, metric: SeriesMetric) -> Result<Vec<SeriesPoint>, LedgerError> {
        let mut running = Decimal::ZERO;
        let mut by_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();

        for entry in self.repository.entries().await? {
            running = match (metric, entry.kind) {
                (SeriesMetric::TotalValueLocked, EntryKind::Deposit)
                | (SeriesMetric::TotalDebt, EntryKind::Borrow) => {
                    running.saturating_add(entry.value_usd)
                }
                (SeriesMetric::TotalDebt, EntryKind::Repay) => {
                    (running - entry.value_usd).max(Decimal::ZERO)
                }
                _ => running,
            };
            by_day.insert(entry.timestamp.date_naive(), running);
        }

        Ok(by_day
            .into_iter()
            .map(|(date, value)| SeriesPoint { date, value })
            .collect())
    }
}

fn journal_entry(
    address: &str,
    kind: EntryKind,
    token: &str,
    amount: Decimal,
    value_usd: Decimal,
    timestamp: DateTime<Utc>,
) -> LedgerEntry {
    LedgerEntry {
        id: Uuid::new_v4(),
        address: address.to_string(),
        kind,
        token: token.to_string(),
        amount,
        value_usd,
        timestamp,
    }
}

fn utilization(debt: Decimal, supplied: Decimal) -> Decimal {
    if supplied.is_zero() {
        return Decimal::ZERO;
    }
    debt.checked_div(supplied)
        .map(|ratio| ratio.round_dp(4))
        .unwrap_or(Decimal::ZERO)
}
