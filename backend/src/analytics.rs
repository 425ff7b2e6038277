//! Protocol analytics computed from ledger state.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::ledger::{Ledger, LedgerEntry, LedgerError, ProtocolStats, TokenStats};

const RECENT_ACTIVITY: usize = 10;
const TOP_USERS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub protocol_stats: ProtocolStats,
    pub token_stats: BTreeMap<String, TokenStats>,
    pub recent_activity: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopUser {
    pub address: String,
    pub tvl: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: usize,
    pub active_users: usize,
    pub new_users_this_week: usize,
    pub top_users: Vec<TopUser>,
}

pub async fn overview(ledger: &Ledger) -> Result<Overview, LedgerError> {
    Ok(Overview {
        protocol_stats: ledger.stats().await?,
        token_stats: ledger.token_stats().await?,
        recent_activity: ledger.history(None, RECENT_ACTIVITY).await?,
    })
}

pub async fn user_stats(ledger: &Ledger, now: DateTime<Utc>) -> Result<UserStats, LedgerError> {
    let positions = ledger.positions().await?;
    let week_ago = now - Duration::days(7);

    let mut top_users: Vec<TopUser> = positions
        .iter()
        .filter(|position| !position.collaterals.is_empty())
        .map(|position| TopUser {
            address: position.address.clone(),
            tvl: position.total_collateral_value(),
        })
        .collect();
    top_users.sort_by(|a, b| b.tvl.cmp(&a.tvl));
    top_users.truncate(TOP_USERS);

    Ok(UserStats {
        total_users: positions.len(),
        active_users: positions.iter().filter(|p| p.is_active()).count(),
        new_users_this_week: positions.iter().filter(|p| p.created_at >= week_ago).count(),
        top_users,
    })
}
