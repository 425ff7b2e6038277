//! Liquid staking token yield and repayment from earned LST interest.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::inflight::InFlightSet;
use crate::interest::{settlement_slippage, DEMO_ADDRESS};
use crate::oneinch::{self, ChainId, OneInchClient, OneInchError, SwapQuoteOptions};
use crate::validation::{address_key, is_positive};

/// Debt token that earned LST interest is swapped into.
const REPAYMENT_TOKEN: &str = "USDC";

#[derive(Debug, Error)]
pub enum AutoRepayError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("No LST earnings found for user")]
    NoEarnings,

    #[error("Insufficient LST interest to repay loan interest")]
    InsufficientInterest,

    #[error("Auto-repay already in progress for user")]
    InFlight,

    #[error(transparent)]
    Swap(OneInchError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldRate {
    pub symbol: &'static str,
    pub name: &'static str,
    pub yield_rate: Decimal,
    pub protocol: &'static str,
    pub last_update: DateTime<Utc>,
}

pub fn yield_rates(now: DateTime<Utc>) -> BTreeMap<&'static str, YieldRate> {
    BTreeMap::from([
        (
            "stETH",
            YieldRate {
                symbol: "stETH",
                name: "Liquid staked Ether",
                yield_rate: Decimal::new(42, 3),
                protocol: "Lido",
                last_update: now,
            },
        ),
        (
            "rETH",
            YieldRate {
                symbol: "rETH",
                name: "Rocket Pool ETH",
                yield_rate: Decimal::new(38, 3),
                protocol: "Rocket Pool",
                last_update: now,
            },
        ),
    ])
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LstProtocol {
    pub name: &'static str,
    pub symbol: &'static str,
    pub description: &'static str,
    pub website: &'static str,
    pub yield_rate: Decimal,
}

pub fn protocols() -> Vec<LstProtocol> {
    vec![
        LstProtocol {
            name: "Lido Finance",
            symbol: "stETH",
            description: "Liquid staking for Ethereum",
            website: "https://lido.fi",
            yield_rate: Decimal::new(42, 3),
        },
        LstProtocol {
            name: "Rocket Pool",
            symbol: "rETH",
            description: "Decentralized Ethereum staking",
            website: "https://rocketpool.net",
            yield_rate: Decimal::new(38, 3),
        },
    ]
}

pub fn is_lst(symbol: &str) -> bool {
    canonical_symbol(symbol).is_some()
}

fn canonical_symbol(symbol: &str) -> Option<&'static str> {
    let symbol = symbol.trim();
    ["stETH", "rETH"]
        .into_iter()
        .find(|known| known.eq_ignore_ascii_case(symbol))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LstEarning {
    pub balance: Decimal,
    pub earned_interest: Decimal,
    pub last_claimed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEarnings {
    pub address: String,
    pub earnings: BTreeMap<String, LstEarning>,
    pub total_earned_interest: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRepayment {
    pub loan_id: String,
    pub lst_token: String,
    pub repaid_amount: Decimal,
    pub remaining_interest: Decimal,
    pub transaction_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct LstDesk {
    client: Arc<OneInchClient>,
    earnings: RwLock<HashMap<String, BTreeMap<String, LstEarning>>>,
    in_flight: InFlightSet,
}

impl LstDesk {
    pub fn new(client: Arc<OneInchClient>) -> Self {
        Self {
            client,
            earnings: RwLock::new(HashMap::new()),
            in_flight: InFlightSet::new(),
        }
    }

    pub async fn insert(&self, address: &str, earnings: BTreeMap<String, LstEarning>) {
        self.earnings
            .write()
            .await
            .insert(address_key(address), earnings);
    }

    /// Per-token earnings; unknown users get a zero row for each LST.
    pub async fn user_earnings(&self, address: &str) -> UserEarnings {
        let earnings = self
            .earnings
            .read()
            .await
            .get(&address_key(address))
            .cloned()
            .unwrap_or_else(|| {
                ["stETH", "rETH"]
                    .into_iter()
                    .map(|symbol| (symbol.to_string(), LstEarning::default()))
                    .collect()
            });
        let total_earned_interest = earnings
            .values()
            .fold(Decimal::ZERO, |acc, entry| acc.saturating_add(entry.earned_interest));

        UserEarnings {
            address: address.to_string(),
            earnings,
            total_earned_interest,
        }
    }

    /// Swaps `amount` of earned LST interest into the debt token. Earnings are
    /// debited only after the swap is accepted upstream.
    pub async fn auto_repay(
        &self,
        address: &str,
        loan_id: &str,
        lst_token: &str,
        amount: Decimal,
    ) -> Result<AutoRepayment, AutoRepayError> {
        if !is_positive(amount) {
            return Err(AutoRepayError::InvalidAmount);
        }
        let token = canonical_symbol(lst_token).ok_or(AutoRepayError::NoEarnings)?;
        let key = address_key(address);
        let _repaying = self
            .in_flight
            .acquire(&key)
            .ok_or(AutoRepayError::InFlight)?;

        {
            let guard = self.earnings.read().await;
            let earned = guard
                .get(&key)
                .and_then(|tokens| tokens.get(token))
                .ok_or(AutoRepayError::NoEarnings)?
                .earned_interest;
            if earned < amount {
                return Err(AutoRepayError::InsufficientInterest);
            }
        }

        let quote = self
            .client
            .get_swap_quote(
                token,
                REPAYMENT_TOKEN,
                &amount.normalize().to_string(),
                ChainId::ETHEREUM,
                &SwapQuoteOptions::from_wallet(address, settlement_slippage()),
            )
            .await
            .map_err(AutoRepayError::Swap)?;
        let swap = self
            .client
            .execute_swap(
                &oneinch::swap_payload(quote, address, settlement_slippage()),
                ChainId::ETHEREUM,
            )
            .await
            .map_err(AutoRepayError::Swap)?;

        let now = Utc::now();
        let mut guard = self.earnings.write().await;
        let entry = guard
            .get_mut(&key)
            .and_then(|tokens| tokens.get_mut(token))
            .ok_or(AutoRepayError::NoEarnings)?;
        entry.earned_interest = (entry.earned_interest - amount).max(Decimal::ZERO);
        entry.last_claimed = Some(now);

        tracing::info!(address = %key, %loan_id, token, %amount, "loan repaid from LST interest");

        Ok(AutoRepayment {
            loan_id: loan_id.to_string(),
            lst_token: token.to_string(),
            repaid_amount: amount,
            remaining_interest: entry.earned_interest,
            transaction_hash: oneinch::transaction_hash(&swap),
            timestamp: now,
        })
    }

    pub async fn seed_demo(&self, now: DateTime<Utc>) {
        let earnings = BTreeMap::from([
            (
                "stETH".to_string(),
                LstEarning {
                    balance: Decimal::new(105, 1),
                    earned_interest: Decimal::new(441, 3),
                    last_claimed: Some(now - Duration::days(1)),
                },
            ),
            (
                "rETH".to_string(),
                LstEarning {
                    balance: Decimal::new(52, 1),
                    earned_interest: Decimal::new(198, 3),
                    last_claimed: Some(now - Duration::days(2)),
                },
            ),
        ]);
        self.insert(DEMO_ADDRESS, earnings).await;
    }
}
