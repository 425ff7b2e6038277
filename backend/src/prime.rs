//! Cross-chain loans: collateral on one chain, debt on another, bridged and
//! swapped through 1inch Fusion.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinError;

use crate::ids::{IdError, IdGenerator};
use crate::ledger::{liquidation_ltv, TokenRegistry};
use crate::oneinch::{self, ChainId, OneInchClient, OneInchError};
use crate::validation::{address_key, is_positive};

/// USD price assumed for fees quoted in ETH.
const ETH_PRICE_USD: i64 = 2000;

#[derive(Debug, Error)]
pub enum PrimeError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(ChainId),

    #[error("Source and destination chain must differ")]
    SameChain,

    #[error("Token {token} is not supported on chain {chain}")]
    UnsupportedToken { token: String, chain: ChainId },

    #[error("Insufficient collateral: borrow value {requested} exceeds borrowing capacity {capacity}")]
    InsufficientCollateral { requested: Decimal, capacity: Decimal },

    #[error("Loan not found")]
    LoanNotFound(String),

    #[error("Bridge transfer not found")]
    BridgeNotFound(String),

    #[error("Swap not found")]
    SwapNotFound(String),

    #[error("Loan is {status}; cannot {action}")]
    InvalidStatus {
        status: LoanStatus,
        action: &'static str,
    },

    #[error(transparent)]
    Swap(OneInchError),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error("swap task aborted: {0}")]
    Aborted(#[from] JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Bridging,
    Swapping,
    Active,
    Repaying,
    Completed,
    Liquidated,
    Failed,
}

impl LoanStatus {
    /// Loans that still hold collateral and debt.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Completed | Self::Liquidated | Self::Failed)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Bridging => "bridging",
            Self::Swapping => "swapping",
            Self::Active => "active",
            Self::Repaying => "repaying",
            Self::Completed => "completed",
            Self::Liquidated => "liquidated",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedChain {
    pub id: ChainId,
    pub name: &'static str,
    #[serde(skip)]
    pub tokens: &'static [&'static str],
}

pub static SUPPORTED_CHAINS: [SupportedChain; 4] = [
    SupportedChain {
        id: ChainId(1),
        name: "Ethereum",
        tokens: &["stETH", "rETH", "USDC"],
    },
    SupportedChain {
        id: ChainId(128123),
        name: "Etherlink",
        tokens: &["stETH", "rETH", "USDC"],
    },
    SupportedChain {
        id: ChainId(137),
        name: "Polygon",
        tokens: &["USDC", "USDT", "WETH"],
    },
    SupportedChain {
        id: ChainId(42161),
        name: "Arbitrum",
        tokens: &["USDC", "USDT", "WETH"],
    },
];

pub fn chain(id: ChainId) -> Option<&'static SupportedChain> {
    SUPPORTED_CHAINS.iter().find(|chain| chain.id == id)
}

/// Tokens per chain, keyed by lowercase chain name.
pub fn supported_tokens() -> BTreeMap<String, Vec<&'static str>> {
    SUPPORTED_CHAINS
        .iter()
        .map(|chain| (chain.name.to_ascii_lowercase(), chain.tokens.to_vec()))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainLoan {
    pub loan_id: String,
    pub bridge_id: String,
    pub swap_id: Option<String>,
    pub borrower: String,
    pub source_chain: ChainId,
    pub destination_chain: ChainId,
    pub collateral_token: String,
    pub borrow_token: String,
    pub collateral_amount: Decimal,
    pub borrow_amount: Decimal,
    pub repaid_amount: Decimal,
    pub health_factor: Decimal,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub last_update_time: DateTime<Utc>,
}

impl CrossChainLoan {
    pub fn outstanding(&self) -> Decimal {
        (self.borrow_amount - self.repaid_amount).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeTransfer {
    pub bridge_id: String,
    pub loan_id: String,
    pub sender: String,
    pub token: String,
    pub amount: Decimal,
    pub source_chain: ChainId,
    pub destination_chain: ChainId,
    pub status: TransferStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRecord {
    pub swap_id: String,
    pub loan_id: String,
    pub src_token: String,
    pub dst_token: String,
    pub src_amount: Decimal,
    pub src_chain_id: ChainId,
    pub dst_chain_id: ChainId,
    pub quote: Value,
    pub transaction_hash: Option<String>,
    pub status: TransferStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainStats {
    pub swaps_attempted: u64,
    pub swaps_succeeded: u64,
    pub swaps_failed: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimeOverview {
    #[serde(rename = "totalCrossChainTVL")]
    pub total_cross_chain_tvl: Decimal,
    pub total_cross_chain_debt: Decimal,
    pub active_loans: usize,
    pub total_bridges: usize,
    pub supported_chains: &'static [SupportedChain],
    pub supported_tokens: BTreeMap<String, Vec<&'static str>>,
    pub cross_chain_stats: CrossChainStats,
}

#[derive(Debug, Clone)]
pub struct LoanRequest {
    pub borrower: String,
    pub source_chain: ChainId,
    pub destination_chain: ChainId,
    pub collateral_token: String,
    pub borrow_token: String,
    pub collateral_amount: Decimal,
    pub borrow_amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub loan_id: String,
    pub src_token: String,
    pub dst_token: String,
    pub amount: Decimal,
    /// Defaults to the loan's source chain.
    pub src_chain_id: Option<ChainId>,
    /// Defaults to the loan's destination chain.
    pub dst_chain_id: Option<ChainId>,
    /// Defaults to the borrower.
    pub from: Option<String>,
}

/// A [`SwapRequest`] with its defaults filled in from the loan.
struct Route {
    src_token: String,
    dst_token: String,
    amount: Decimal,
    src_chain_id: ChainId,
    dst_chain_id: ChainId,
    from: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeFee {
    pub source_chain: ChainId,
    pub destination_chain: ChainId,
    pub token: String,
    pub amount: Decimal,
    pub fee: Decimal,
    #[serde(rename = "feeInUSD")]
    pub fee_in_usd: Decimal,
}

/// `(0.001 + amount * 0.0001) * multiplier`, where routes touching Ethereum
/// mainnet cost 2x and all others 1.5x. The fee is denominated in ETH.
pub fn bridge_fee(
    source_chain: ChainId,
    destination_chain: ChainId,
    token: &str,
    amount: Decimal,
) -> BridgeFee {
    let base = Decimal::new(1, 3);
    let proportional = amount.saturating_mul(Decimal::new(1, 4));
    let multiplier = if source_chain == ChainId::ETHEREUM || destination_chain == ChainId::ETHEREUM
    {
        Decimal::TWO
    } else {
        Decimal::new(15, 1)
    };
    let fee = base.saturating_add(proportional).saturating_mul(multiplier);

    BridgeFee {
        source_chain,
        destination_chain,
        token: token.to_string(),
        amount,
        fee: fee.normalize(),
        fee_in_usd: fee.saturating_mul(Decimal::new(ETH_PRICE_USD, 0)).normalize(),
    }
}

#[derive(Debug, Default)]
struct Desk {
    loans: HashMap<String, CrossChainLoan>,
    bridges: HashMap<String, BridgeTransfer>,
    swaps: HashMap<String, SwapRecord>,
    stats: CrossChainStats,
}

impl Desk {
    /// Applies a finished swap to its loan, bridge and the stats.
    fn record_swap(
        &mut self,
        loan_id: &str,
        swap_id: String,
        route: Route,
        outcome: Result<(Value, Value), OneInchError>,
    ) -> Result<(CrossChainLoan, SwapRecord), PrimeError> {
        let now = Utc::now();
        let loan = self
            .loans
            .get_mut(loan_id)
            .ok_or_else(|| PrimeError::LoanNotFound(loan_id.to_string()))?;
        let bridge_status = match &outcome {
            Ok(_) => TransferStatus::Completed,
            Err(_) => TransferStatus::Failed,
        };
        if let Some(bridge) = self.bridges.get_mut(&loan.bridge_id) {
            bridge.status = bridge_status;
            bridge.timestamp = now;
        }
        loan.last_update_time = now;

        match outcome {
            Ok((quote, result)) => {
                let record = SwapRecord {
                    swap_id: swap_id.clone(),
                    loan_id: loan.loan_id.clone(),
                    src_token: route.src_token,
                    dst_token: route.dst_token,
                    src_amount: route.amount,
                    src_chain_id: route.src_chain_id,
                    dst_chain_id: route.dst_chain_id,
                    quote,
                    transaction_hash: oneinch::transaction_hash(&result),
                    status: TransferStatus::Completed,
                    timestamp: now,
                };
                loan.status = LoanStatus::Active;
                loan.swap_id = Some(swap_id.clone());
                self.stats.swaps_succeeded += 1;
                self.swaps.insert(swap_id, record.clone());

                tracing::info!(loan_id = %loan.loan_id, swap_id = %record.swap_id, "cross-chain swap completed");
                Ok((loan.clone(), record))
            }
            Err(err) => {
                loan.status = LoanStatus::Failed;
                self.stats.swaps_failed += 1;
                tracing::warn!(loan_id = %loan.loan_id, error = %err, "cross-chain swap failed");
                Err(PrimeError::Swap(err))
            }
        }
    }
}

async fn run_swap(client: &OneInchClient, route: &Route) -> Result<(Value, Value), OneInchError> {
    let amount = route.amount.to_string();
    let quote = client
        .get_cross_chain_swap_quote(
            &route.src_token,
            &route.dst_token,
            &amount,
            route.src_chain_id,
            route.dst_chain_id,
        )
        .await?;
    let payload = json!({
        "quote": quote,
        "srcTokenAddress": route.src_token,
        "dstTokenAddress": route.dst_token,
        "amount": amount,
        "srcChainId": route.src_chain_id,
        "dstChainId": route.dst_chain_id,
        "walletAddress": route.from,
    });
    let result = client.execute_cross_chain_swap(&payload).await?;
    Ok((quote, result))
}

pub struct PrimeDesk {
    client: Arc<OneInchClient>,
    ids: IdGenerator,
    registry: TokenRegistry,
    desk: Arc<RwLock<Desk>>,
}

impl PrimeDesk {
    pub fn new(client: Arc<OneInchClient>, ids: IdGenerator, registry: TokenRegistry) -> Self {
        Self {
            client,
            ids,
            registry,
            desk: Arc::new(RwLock::new(Desk::default())),
        }
    }

    pub async fn overview(&self) -> PrimeOverview {
        let desk = self.desk.read().await;
        let open = desk.loans.values().filter(|loan| loan.status.is_open());

        let mut tvl = Decimal::ZERO;
        let mut debt = Decimal::ZERO;
        for loan in open {
            let collateral_price = self.registry.price_of(&loan.collateral_token).unwrap_or_default();
            let borrow_price = self.registry.price_of(&loan.borrow_token).unwrap_or_default();
            tvl = tvl.saturating_add(loan.collateral_amount.saturating_mul(collateral_price));
            debt = debt.saturating_add(loan.outstanding().saturating_mul(borrow_price));
        }

        PrimeOverview {
            total_cross_chain_tvl: tvl,
            total_cross_chain_debt: debt,
            active_loans: desk
                .loans
                .values()
                .filter(|loan| matches!(loan.status, LoanStatus::Active | LoanStatus::Repaying))
                .count(),
            total_bridges: desk.bridges.len(),
            supported_chains: &SUPPORTED_CHAINS,
            supported_tokens: supported_tokens(),
            cross_chain_stats: desk.stats,
        }
    }

    pub async fn initiate_loan(&self, request: LoanRequest) -> Result<CrossChainLoan, PrimeError> {
        if !is_positive(request.collateral_amount) || !is_positive(request.borrow_amount) {
            return Err(PrimeError::InvalidAmount);
        }
        let source = chain(request.source_chain)
            .ok_or(PrimeError::UnsupportedChain(request.source_chain))?;
        let destination = chain(request.destination_chain)
            .ok_or(PrimeError::UnsupportedChain(request.destination_chain))?;
        if source.id == destination.id {
            return Err(PrimeError::SameChain);
        }

        let collateral = self
            .registry
            .collateral(&request.collateral_token)
            .filter(|asset| source.tokens.contains(&asset.symbol.as_str()))
            .ok_or_else(|| PrimeError::UnsupportedToken {
                token: request.collateral_token.clone(),
                chain: source.id,
            })?;
        let borrow = self
            .registry
            .borrow_asset(&request.borrow_token)
            .filter(|asset| destination.tokens.contains(&asset.symbol.as_str()))
            .ok_or_else(|| PrimeError::UnsupportedToken {
                token: request.borrow_token.clone(),
                chain: destination.id,
            })?;

        let collateral_value = request.collateral_amount.saturating_mul(collateral.price_usd);
        let capacity = collateral_value.saturating_mul(collateral.ltv);
        let requested = request.borrow_amount.saturating_mul(borrow.price_usd);
        if requested > capacity {
            return Err(PrimeError::InsufficientCollateral {
                requested,
                capacity,
            });
        }
        let health_factor = collateral_value
            .saturating_mul(liquidation_ltv())
            .checked_div(requested)
            .unwrap_or(Decimal::ZERO)
            .round_dp(4);

        let now = Utc::now();
        let borrower = address_key(&request.borrower);
        let loan = CrossChainLoan {
            loan_id: self.ids.hex_id()?,
            bridge_id: self.ids.hex_id()?,
            swap_id: None,
            borrower: borrower.clone(),
            source_chain: source.id,
            destination_chain: destination.id,
            collateral_token: collateral.symbol.clone(),
            borrow_token: borrow.symbol.clone(),
            collateral_amount: request.collateral_amount,
            borrow_amount: request.borrow_amount,
            repaid_amount: Decimal::ZERO,
            health_factor,
            status: LoanStatus::Pending,
            created_at: now,
            last_update_time: now,
        };
        let bridge = BridgeTransfer {
            bridge_id: loan.bridge_id.clone(),
            loan_id: loan.loan_id.clone(),
            sender: borrower,
            token: loan.collateral_token.clone(),
            amount: loan.collateral_amount,
            source_chain: source.id,
            destination_chain: destination.id,
            status: TransferStatus::Pending,
            timestamp: now,
        };

        let mut desk = self.desk.write().await;
        desk.bridges.insert(bridge.bridge_id.clone(), bridge);
        desk.loans.insert(loan.loan_id.clone(), loan.clone());

        tracing::info!(
            loan_id = %loan.loan_id,
            borrower = %loan.borrower,
            source_chain = %loan.source_chain,
            destination_chain = %loan.destination_chain,
            "cross-chain loan initiated"
        );
        Ok(loan)
    }

    /// Bridges the borrowed funds through a Fusion swap. The loan is marked
    /// `Swapping` for the duration, which also rejects a concurrent execution.
    ///
    /// The upstream calls and the write-back run on their own task: once the
    /// loan is `Swapping`, the outcome is recorded even if the caller goes away.
    pub async fn execute_cross_chain_swap(
        &self,
        request: SwapRequest,
    ) -> Result<(CrossChainLoan, SwapRecord), PrimeError> {
        if !is_positive(request.amount) {
            return Err(PrimeError::InvalidAmount);
        }
        let swap_id = self.ids.hex_id()?;
        let route = {
            let mut desk = self.desk.write().await;
            let loan = desk
                .loans
                .get_mut(&request.loan_id)
                .ok_or_else(|| PrimeError::LoanNotFound(request.loan_id.clone()))?;
            if !matches!(loan.status, LoanStatus::Pending | LoanStatus::Bridging) {
                return Err(PrimeError::InvalidStatus {
                    status: loan.status,
                    action: "execute a cross-chain swap",
                });
            }
            loan.status = LoanStatus::Swapping;
            loan.last_update_time = Utc::now();
            let route = Route {
                src_token: request.src_token,
                dst_token: request.dst_token,
                amount: request.amount.normalize(),
                src_chain_id: request.src_chain_id.unwrap_or(loan.source_chain),
                dst_chain_id: request.dst_chain_id.unwrap_or(loan.destination_chain),
                from: request.from.unwrap_or_else(|| loan.borrower.clone()),
            };
            desk.stats.swaps_attempted += 1;
            route
        };

        let client = Arc::clone(&self.client);
        let desk = Arc::clone(&self.desk);
        let loan_id = request.loan_id;
        tokio::spawn(async move {
            let outcome = run_swap(&client, &route).await;
            let mut guard = desk.write().await;
            guard.record_swap(&loan_id, swap_id, route, outcome)
        })
        .await?
    }

    /// Applies a repayment, capped at the outstanding debt.
    pub async fn repay_loan(
        &self,
        loan_id: &str,
        amount: Decimal,
    ) -> Result<CrossChainLoan, PrimeError> {
        if !is_positive(amount) {
            return Err(PrimeError::InvalidAmount);
        }
        let mut desk = self.desk.write().await;
        let loan = desk
            .loans
            .get_mut(loan_id)
            .ok_or_else(|| PrimeError::LoanNotFound(loan_id.to_string()))?;
        if !matches!(loan.status, LoanStatus::Active | LoanStatus::Repaying) {
            return Err(PrimeError::InvalidStatus {
                status: loan.status,
                action: "repay",
            });
        }

        let applied = amount.min(loan.outstanding());
        loan.repaid_amount += applied;
        loan.status = if loan.outstanding().is_zero() {
            LoanStatus::Completed
        } else {
            LoanStatus::Repaying
        };
        loan.last_update_time = Utc::now();

        tracing::info!(%loan_id, %applied, status = %loan.status, "cross-chain loan repayment applied");
        Ok(loan.clone())
    }

    pub async fn loan(&self, loan_id: &str) -> Result<CrossChainLoan, PrimeError> {
        self.desk
            .read()
            .await
            .loans
            .get(loan_id)
            .cloned()
            .ok_or_else(|| PrimeError::LoanNotFound(loan_id.to_string()))
    }

    pub async fn user_loans(&self, address: &str) -> Vec<CrossChainLoan> {
        let key = address_key(address);
        let mut loans: Vec<CrossChainLoan> = self
            .desk
            .read()
            .await
            .loans
            .values()
            .filter(|loan| loan.borrower == key)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        loans
    }

    pub async fn bridge(&self, bridge_id: &str) -> Result<BridgeTransfer, PrimeError> {
        self.desk
            .read()
            .await
            .bridges
            .get(bridge_id)
            .cloned()
            .ok_or_else(|| PrimeError::BridgeNotFound(bridge_id.to_string()))
    }

    pub async fn swap(&self, swap_id: &str) -> Result<SwapRecord, PrimeError> {
        self.desk
            .read()
            .await
            .swaps
            .get(swap_id)
            .cloned()
            .ok_or_else(|| PrimeError::SwapNotFound(swap_id.to_string()))
    }
}
