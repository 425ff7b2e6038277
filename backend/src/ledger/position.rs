use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::tokens::{BorrowAsset, CollateralAsset};

/// Share of collateral value counted against debt in the health factor.
pub fn liquidation_ltv() -> Decimal {
    Decimal::new(8, 1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralEntry {
    pub token: String,
    pub amount: Decimal,
    pub value: Decimal,
    pub ltv: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowEntry {
    pub token: String,
    pub amount: Decimal,
    pub value: Decimal,
    pub interest_rate: Decimal,
}

/// A user's lending position. Totals and health factor are always computed
/// from the entries, never stored alongside them.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub address: String,
    pub collaterals: Vec<CollateralEntry>,
    pub borrows: Vec<BorrowEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn new(address: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            collaterals: Vec::new(),
            borrows: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total_collateral_value(&self) -> Decimal {
        self.collaterals
            .iter()
            .fold(Decimal::ZERO, |acc, entry| acc.saturating_add(entry.value))
    }

    pub fn total_borrow_value(&self) -> Decimal {
        self.borrows
            .iter()
            .fold(Decimal::ZERO, |acc, entry| acc.saturating_add(entry.value))
    }

    /// Maximum total borrow value the collateral supports, weighted by each
    /// token's LTV.
    pub fn borrowing_capacity(&self) -> Decimal {
        self.collaterals.iter().fold(Decimal::ZERO, |acc, entry| {
            acc.saturating_add(entry.value.saturating_mul(entry.ltv))
        })
    }

    /// `(collateral * 0.8) / debt`, or zero when there is no debt.
    pub fn health_factor(&self) -> Decimal {
        let borrowed = self.total_borrow_value();
        if borrowed.is_zero() {
            return Decimal::ZERO;
        }
        self.total_collateral_value()
            .checked_mul(liquidation_ltv())
            .and_then(|weighted| weighted.checked_div(borrowed))
            .unwrap_or(Decimal::MAX)
    }

    pub fn is_active(&self) -> bool {
        !self.collaterals.is_empty() || !self.borrows.is_empty()
    }

    /// Adds collateral; `None` when the amounts overflow.
    pub fn add_collateral(&mut self, asset: &CollateralAsset, amount: Decimal) -> Option<Decimal> {
        let value = amount.checked_mul(asset.price_usd)?;
        match self
            .collaterals
            .iter_mut()
            .find(|entry| entry.token == asset.symbol)
        {
            Some(entry) => {
                entry.amount = entry.amount.checked_add(amount)?;
                entry.value = entry.value.checked_add(value)?;
            }
            None => self.collaterals.push(CollateralEntry {
                token: asset.symbol.clone(),
                amount,
                value,
                ltv: asset.ltv,
            }),
        }
        Some(value)
    }

    /// Adds debt; `None` when the amounts overflow.
    pub fn add_borrow(&mut self, asset: &BorrowAsset, amount: Decimal) -> Option<Decimal> {
        let value = amount.checked_mul(asset.price_usd)?;
        match self
            .borrows
            .iter_mut()
            .find(|entry| entry.token == asset.symbol)
        {
            Some(entry) => {
                entry.amount = entry.amount.checked_add(amount)?;
                entry.value = entry.value.checked_add(value)?;
            }
            None => self.borrows.push(BorrowEntry {
                token: asset.symbol.clone(),
                amount,
                value,
                interest_rate: asset.interest_rate,
            }),
        }
        Some(value)
    }

    /// Pays down the matching borrow entry by at most its outstanding amount.
    /// Returns the `(amount, value)` actually applied; zero when nothing is owed
    /// in that token. A fully repaid entry is removed.
    pub fn repay(&mut self, asset: &BorrowAsset, amount: Decimal) -> (Decimal, Decimal) {
        let Some(index) = self
            .borrows
            .iter()
            .position(|entry| entry.token == asset.symbol)
        else {
            return (Decimal::ZERO, Decimal::ZERO);
        };

        let entry = &mut self.borrows[index];
        let applied = amount.min(entry.amount);
        let value_before = entry.value;
        entry.amount -= applied;
        entry.value = entry.amount.saturating_mul(asset.price_usd).min(value_before);
        let applied_value = value_before - entry.value;

        if entry.amount.is_zero() {
            self.borrows.remove(index);
        }
        (applied, applied_value)
    }

    pub fn summary(&self) -> PositionSummary {
        PositionSummary {
            address: self.address.clone(),
            total_collateral_value: self.total_collateral_value(),
            total_borrow_value: self.total_borrow_value(),
            health_factor: self.health_factor().normalize(),
            borrowing_capacity: self.borrowing_capacity(),
            collaterals: self.collaterals.clone(),
            borrows: self.borrows.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Wire view of a [`Position`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSummary {
    pub address: String,
    pub total_collateral_value: Decimal,
    pub total_borrow_value: Decimal,
    pub health_factor: Decimal,
    pub borrowing_capacity: Decimal,
    pub collaterals: Vec<CollateralEntry>,
    pub borrows: Vec<BorrowEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Deposit,
    Borrow,
    Repay,
}

/// One applied ledger transition. `value_usd` is the value actually moved,
/// which is zero for a repayment against a token with no debt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub address: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub token: String,
    pub amount: Decimal,
    pub value_usd: Decimal,
    pub timestamp: DateTime<Utc>,
}
