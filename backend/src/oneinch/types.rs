use std::fmt;

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// EVM chain id. Accepts both `1` and `"1"` since query strings and JSON
/// bodies disagree on the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const ETHEREUM: ChainId = ChainId(1);
}

impl Default for ChainId {
    fn default() -> Self {
        Self::ETHEREUM
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(id) => Ok(ChainId(id)),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(ChainId)
                .map_err(|_| de::Error::custom(format!("invalid chain id `{text}`"))),
        }
    }
}

/// Optional knobs forwarded to the swap quote endpoint.
#[derive(Debug, Clone, Default)]
pub struct SwapQuoteOptions {
    pub from: Option<String>,
    pub slippage: Option<Decimal>,
}

impl SwapQuoteOptions {
    pub fn from_wallet(from: impl Into<String>, slippage: Decimal) -> Self {
        Self {
            from: Some(from.into()),
            slippage: Some(slippage),
        }
    }
}
