//! Loan interest obligations and their settlement from LST staking yield.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::inflight::InFlightSet;
use crate::oneinch::{self, ChainId, OneInchClient, OneInchError, SwapQuoteOptions};
use crate::validation::address_key;

/// Days until the next payment falls due after a settlement.
const PAYMENT_PERIOD_DAYS: i64 = 30;

pub fn settlement_slippage() -> Decimal {
    Decimal::new(5, 1)
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("No obligations found for user")]
    NoObligations,

    #[error("Loan not found")]
    LoanNotFound,

    #[error("Insufficient LST interest to settle loan interest")]
    InsufficientInterest,

    #[error("No interest owed on loan")]
    NothingOwed,

    #[error("Settlement already in progress for loan {0}")]
    InFlight(String),

    #[error(transparent)]
    Swap(OneInchError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanRate {
    pub collateral_token: String,
    pub borrow_token: String,
    pub interest_rate: Decimal,
    pub ltv: Decimal,
    pub liquidation_threshold: Decimal,
}

pub fn loan_rates() -> HashMap<&'static str, LoanRate> {
    HashMap::from([
        (
            "stETH",
            LoanRate {
                collateral_token: "stETH".to_string(),
                borrow_token: "USDC".to_string(),
                interest_rate: Decimal::new(8, 2),
                ltv: Decimal::new(8, 1),
                liquidation_threshold: Decimal::new(85, 2),
            },
        ),
        (
            "rETH",
            LoanRate {
                collateral_token: "rETH".to_string(),
                borrow_token: "USDC".to_string(),
                interest_rate: Decimal::new(75, 3),
                ltv: Decimal::new(75, 2),
                liquidation_threshold: Decimal::new(8, 1),
            },
        ),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestObligation {
    pub loan_id: String,
    pub collateral_token: String,
    pub borrow_token: String,
    pub collateral_amount: Decimal,
    pub borrow_amount: Decimal,
    pub interest_owed: Decimal,
    pub last_interest_payment: DateTime<Utc>,
    pub next_payment_due: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserObligations {
    pub loans: Vec<InterestObligation>,
    pub lst_interest_earned: Decimal,
}

impl UserObligations {
    pub fn total_interest_owed(&self) -> Decimal {
        self.loans
            .iter()
            .fold(Decimal::ZERO, |acc, loan| acc.saturating_add(loan.interest_owed))
    }

    pub fn can_auto_settle(&self) -> bool {
        self.lst_interest_earned >= self.total_interest_owed()
    }

    pub fn view(&self) -> ObligationsView {
        ObligationsView {
            loans: self.loans.clone(),
            total_interest_owed: self.total_interest_owed(),
            total_lst_interest_earned: self.lst_interest_earned,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObligationsView {
    pub loans: Vec<InterestObligation>,
    pub total_interest_owed: Decimal,
    #[serde(rename = "totalLSTInterestEarned")]
    pub total_lst_interest_earned: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSettleStatus {
    pub address: String,
    pub auto_settle_enabled: bool,
    pub can_auto_settle: bool,
    pub total_interest_owed: Decimal,
    #[serde(rename = "totalLSTInterestEarned")]
    pub total_lst_interest_earned: Decimal,
    pub savings: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub loan_id: String,
    pub settled_amount: Decimal,
    #[serde(rename = "remainingLSTInterest")]
    pub remaining_lst_interest: Decimal,
    pub next_payment_due: DateTime<Utc>,
    pub transaction_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct InterestBook {
    client: Arc<OneInchClient>,
    obligations: RwLock<HashMap<String, UserObligations>>,
    in_flight: InFlightSet,
}

impl InterestBook {
    pub fn new(client: Arc<OneInchClient>) -> Self {
        Self {
            client,
            obligations: RwLock::new(HashMap::new()),
            in_flight: InFlightSet::new(),
        }
    }

    pub async fn insert(&self, address: &str, obligations: UserObligations) {
        self.obligations
            .write()
            .await
            .insert(address_key(address), obligations);
    }

    /// Obligations for `address`; an unknown user has none.
    pub async fn obligations(&self, address: &str) -> UserObligations {
        self.obligations
            .read()
            .await
            .get(&address_key(address))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn status(&self, address: &str) -> AutoSettleStatus {
        let guard = self.obligations.read().await;
        match guard.get(&address_key(address)) {
            Some(user) => {
                let owed = user.total_interest_owed();
                let can_auto_settle = user.can_auto_settle();
                AutoSettleStatus {
                    address: address.to_string(),
                    auto_settle_enabled: true,
                    can_auto_settle,
                    total_interest_owed: owed,
                    total_lst_interest_earned: user.lst_interest_earned,
                    savings: if can_auto_settle {
                        user.lst_interest_earned - owed
                    } else {
                        Decimal::ZERO
                    },
                }
            }
            None => AutoSettleStatus {
                address: address.to_string(),
                auto_settle_enabled: false,
                can_auto_settle: false,
                total_interest_owed: Decimal::ZERO,
                total_lst_interest_earned: Decimal::ZERO,
                savings: Decimal::ZERO,
            },
        }
    }

    /// Pays a loan's outstanding interest by swapping earned LST yield into
    /// the borrow token. State changes only after the swap succeeds.
    pub async fn auto_settle(
        &self,
        address: &str,
        loan_id: &str,
    ) -> Result<Settlement, SettlementError> {
        let key = address_key(address);
        let _settling = self
            .in_flight
            .acquire(&key)
            .ok_or_else(|| SettlementError::InFlight(loan_id.to_string()))?;

        let loan = {
            let guard = self.obligations.read().await;
            let user = guard.get(&key).ok_or(SettlementError::NoObligations)?;
            let loan = user
                .loans
                .iter()
                .find(|loan| loan.loan_id == loan_id)
                .ok_or(SettlementError::LoanNotFound)?;
            if loan.interest_owed.is_zero() {
                return Err(SettlementError::NothingOwed);
            }
            if user.lst_interest_earned < loan.interest_owed {
                return Err(SettlementError::InsufficientInterest);
            }
            loan.clone()
        };

        let amount = loan.interest_owed.normalize().to_string();
        let quote = self
            .client
            .get_swap_quote(
                &loan.collateral_token,
                &loan.borrow_token,
                &amount,
                ChainId::ETHEREUM,
                &SwapQuoteOptions::from_wallet(address, settlement_slippage()),
            )
            .await
            .map_err(SettlementError::Swap)?;
        let swap = self
            .client
            .execute_swap(
                &oneinch::swap_payload(quote, address, settlement_slippage()),
                ChainId::ETHEREUM,
            )
            .await
            .map_err(SettlementError::Swap)?;

        let now = Utc::now();
        let mut guard = self.obligations.write().await;
        let user = guard.get_mut(&key).ok_or(SettlementError::NoObligations)?;
        let entry = user
            .loans
            .iter_mut()
            .find(|entry| entry.loan_id == loan_id)
            .ok_or(SettlementError::LoanNotFound)?;

        let settled = entry.interest_owed;
        entry.interest_owed = Decimal::ZERO;
        entry.last_interest_payment = now;
        entry.next_payment_due = now + Duration::days(PAYMENT_PERIOD_DAYS);
        user.lst_interest_earned = (user.lst_interest_earned - settled).max(Decimal::ZERO);

        tracing::info!(address = %key, %loan_id, %settled, "loan interest settled from LST yield");

        Ok(Settlement {
            loan_id: loan_id.to_string(),
            settled_amount: settled,
            remaining_lst_interest: user.lst_interest_earned,
            next_payment_due: entry.next_payment_due,
            transaction_hash: oneinch::transaction_hash(&swap),
            timestamp: now,
        })
    }

    pub async fn seed_demo(&self, now: DateTime<Utc>) {
        let obligations = UserObligations {
            loans: vec![
                InterestObligation {
                    loan_id: DEMO_LOAN_IDS[0].to_string(),
                    collateral_token: "stETH".to_string(),
                    borrow_token: "USDC".to_string(),
                    collateral_amount: Decimal::new(10, 0),
                    borrow_amount: Decimal::new(15000, 0),
                    interest_owed: Decimal::new(120, 0),
                    last_interest_payment: now - Duration::days(1),
                    next_payment_due: now + Duration::days(1),
                },
                InterestObligation {
                    loan_id: DEMO_LOAN_IDS[1].to_string(),
                    collateral_token: "rETH".to_string(),
                    borrow_token: "USDC".to_string(),
                    collateral_amount: Decimal::new(5, 0),
                    borrow_amount: Decimal::new(8000, 0),
                    interest_owed: Decimal::new(60, 0),
                    last_interest_payment: now - Duration::days(2),
                    next_payment_due: now + Duration::days(2),
                },
            ],
            lst_interest_earned: Decimal::new(639, 3),
        };
        self.insert(DEMO_ADDRESS, obligations).await;
    }
}

pub const DEMO_ADDRESS: &str = "0x1234567890123456789012345678901234567890";

pub const DEMO_LOAN_IDS: [&str; 2] = [
    "0x1234567890123456789012345678901234567890123456789012345678901234",
    "0x5678901234567890123456789012345678901234567890123456789012345678",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn book() -> InterestBook {
        let client =
            OneInchClient::new("http://127.0.0.1:9", None, StdDuration::from_millis(200)).unwrap();
        InterestBook::new(Arc::new(client))
    }

    fn obligation(loan_id: &str, owed: i64) -> InterestObligation {
        let now = Utc::now();
        InterestObligation {
            loan_id: loan_id.to_string(),
            collateral_token: "stETH".to_string(),
            borrow_token: "USDC".to_string(),
            collateral_amount: Decimal::new(10, 0),
            borrow_amount: Decimal::new(15000, 0),
            interest_owed: Decimal::new(owed, 0),
            last_interest_payment: now,
            next_payment_due: now,
        }
    }

    #[test]
    fn can_auto_settle_compares_totals() {
        let user = UserObligations {
            loans: vec![obligation("a", 120), obligation("b", 60)],
            lst_interest_earned: Decimal::new(639, 3),
        };
        assert_eq!(user.total_interest_owed(), Decimal::new(180, 0));
        assert!(!user.can_auto_settle());
        assert!(UserObligations::default().can_auto_settle());
    }

    #[tokio::test]
    async fn unknown_user_has_empty_obligations_and_disabled_status() {
        let book = book();
        assert!(book.obligations(DEMO_ADDRESS).await.loans.is_empty());
        let status = book.status(DEMO_ADDRESS).await;
        assert!(!status.auto_settle_enabled);
        assert_eq!(status.savings, Decimal::ZERO);
    }

    #[tokio::test]
    async fn settlement_is_rejected_before_any_upstream_call() {
        let book = book();
        assert!(matches!(
            book.auto_settle(DEMO_ADDRESS, "a").await,
            Err(SettlementError::NoObligations)
        ));

        book.insert(
            DEMO_ADDRESS,
            UserObligations {
                loans: vec![obligation("a", 120)],
                lst_interest_earned: Decimal::ONE,
            },
        )
        .await;
        assert!(matches!(
            book.auto_settle(DEMO_ADDRESS, "missing").await,
            Err(SettlementError::LoanNotFound)
        ));
        assert!(matches!(
            book.auto_settle(DEMO_ADDRESS, "a").await,
            Err(SettlementError::InsufficientInterest)
        ));
    }

    #[tokio::test]
    async fn failed_swap_leaves_obligations_untouched() {
        let book = book();
        let before = UserObligations {
            loans: vec![obligation("a", 1)],
            lst_interest_earned: Decimal::new(5, 0),
        };
        book.insert(DEMO_ADDRESS, before.clone()).await;

        assert!(matches!(
            book.auto_settle(DEMO_ADDRESS, "a").await,
            Err(SettlementError::Swap(_))
        ));
        assert_eq!(book.obligations(DEMO_ADDRESS).await, before);
    }
}
