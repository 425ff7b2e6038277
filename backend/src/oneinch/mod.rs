//! Thin client for the 1inch developer REST API.
//!
//! Every call returns the upstream JSON untouched. Failures are surfaced as
//! [`OneInchError`]; callers never substitute fabricated data for a failed call.

mod types;

pub use types::{ChainId, SwapQuoteOptions, ZERO_ADDRESS};

use std::time::Duration;

use reqwest::{header::ACCEPT, RequestBuilder, Url};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum OneInchError {
    #[error("invalid 1inch base url `{0}`")]
    InvalidBaseUrl(String),

    #[error("1inch request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("1inch API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("1inch API returned an unreadable body: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct OneInchClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl OneInchClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OneInchError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|_| OneInchError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(OneInchError::InvalidBaseUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, OneInchError> {
        Self::new(
            &config.oneinch_base_url,
            config.oneinch_api_key.clone(),
            config.oneinch_timeout(),
        )
    }

    // ─── Swap ────────────────────────────────────────

    pub async fn get_swap_quote(
        &self,
        src_token: &str,
        dst_token: &str,
        amount: &str,
        chain_id: ChainId,
        options: &SwapQuoteOptions,
    ) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        let mut query = vec![
            ("src", src_token.to_string()),
            ("dst", dst_token.to_string()),
            ("amount", amount.to_string()),
            (
                "from",
                options
                    .from
                    .clone()
                    .unwrap_or_else(|| ZERO_ADDRESS.to_string()),
            ),
        ];
        if let Some(slippage) = options.slippage {
            query.push(("slippage", slippage.normalize().to_string()));
        }
        self.get(&["swap", "v6.0", &chain, "quote"], &query).await
    }

    /// Submits a swap. There is no idempotency key: retrying after a timeout may
    /// submit the same swap twice.
    pub async fn execute_swap(
        &self,
        swap_data: &Value,
        chain_id: ChainId,
    ) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.post(&["swap", "v6.0", &chain, "swap"], swap_data).await
    }

    pub async fn get_limit_order_quote(
        &self,
        src_token: &str,
        dst_token: &str,
        amount: &str,
        chain_id: ChainId,
    ) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        let query = [
            ("src", src_token.to_string()),
            ("dst", dst_token.to_string()),
            ("amount", amount.to_string()),
        ];
        self.get(&["limit-order", "v3.0", &chain, "quote"], &query)
            .await
    }

    pub async fn create_limit_order(
        &self,
        order: &Value,
        chain_id: ChainId,
    ) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.post(&["limit-order", "v3.0", &chain, "order"], order)
            .await
    }

    // ─── Data ────────────────────────────────────────

    pub async fn get_token_price(
        &self,
        token_address: &str,
        chain_id: ChainId,
    ) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.get(&["price", "v1.1", &chain, token_address], &[]).await
    }

    pub async fn get_wallet_balances(
        &self,
        wallet_address: &str,
        chain_id: ChainId,
    ) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.get(&["balance", "v1.2", &chain, "balances", wallet_address], &[])
            .await
    }

    pub async fn get_token_metadata(
        &self,
        token_address: &str,
        chain_id: ChainId,
    ) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.get(&["token", "v1.2", &chain, "metadata", token_address], &[])
            .await
    }

    pub async fn get_supported_tokens(&self, chain_id: ChainId) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.get(&["token", "v1.2", &chain, "tokens"], &[]).await
    }

    pub async fn get_token_list(&self, chain_id: ChainId) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.get(&["token", "v1.2", &chain, "token-list"], &[]).await
    }

    // ─── Web3 ────────────────────────────────────────

    pub async fn get_transaction_status(
        &self,
        tx_hash: &str,
        chain_id: ChainId,
    ) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.get(&["web3", "v1.0", &chain, "transaction", tx_hash], &[])
            .await
    }

    pub async fn get_block_info(
        &self,
        block_hash: &str,
        chain_id: ChainId,
    ) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.get(&["web3", "v1.0", &chain, "block", block_hash], &[])
            .await
    }

    pub async fn get_gas_price(&self, chain_id: ChainId) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.get(&["web3", "v1.0", &chain, "gas-price"], &[]).await
    }

    pub async fn validate_transaction(
        &self,
        tx_data: &Value,
        chain_id: ChainId,
    ) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.post(&["web3", "v1.0", &chain, "validate"], tx_data)
            .await
    }

    // ─── Cross-chain (Fusion+) ───────────────────────

    pub async fn get_cross_chain_swap_quote(
        &self,
        src_token: &str,
        dst_token: &str,
        amount: &str,
        src_chain_id: ChainId,
        dst_chain_id: ChainId,
    ) -> Result<Value, OneInchError> {
        let query = [
            ("src", src_token.to_string()),
            ("dst", dst_token.to_string()),
            ("amount", amount.to_string()),
            ("srcChainId", src_chain_id.to_string()),
            ("dstChainId", dst_chain_id.to_string()),
        ];
        self.get(&["fusion", "v1.0", "quote"], &query).await
    }

    pub async fn execute_cross_chain_swap(&self, swap_data: &Value) -> Result<Value, OneInchError> {
        self.post(&["fusion", "v1.0", "swap"], swap_data).await
    }

    // ─── Utility ─────────────────────────────────────

    pub async fn get_supported_chains(&self) -> Result<Value, OneInchError> {
        self.get(&["chain", "v1.0", "chains"], &[]).await
    }

    pub async fn get_protocols(&self, chain_id: ChainId) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.get(&["swap", "v6.0", &chain, "protocols"], &[]).await
    }

    pub async fn get_liquidity_sources(&self, chain_id: ChainId) -> Result<Value, OneInchError> {
        let chain = chain_id.to_string();
        self.get(&["swap", "v6.0", &chain, "liquidity-sources"], &[])
            .await
    }

    // ─── Plumbing ────────────────────────────────────

    fn endpoint(&self, segments: &[&str]) -> Result<Url, OneInchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OneInchError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Value, OneInchError> {
        let url = self.endpoint(segments)?;
        let request = self.http.get(url.clone()).query(query);
        self.send(request, &url).await
    }

    async fn post(&self, segments: &[&str], body: &Value) -> Result<Value, OneInchError> {
        let url = self.endpoint(segments)?;
        let request = self.http.post(url.clone()).json(body);
        self.send(request, &url).await
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Value, OneInchError> {
        let mut request = request.header(ACCEPT, "application/json");
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|err| {
            tracing::error!(path = url.path(), error = %err, "1inch request failed");
            OneInchError::Transport(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(path = url.path(), status = status.as_u16(), %body, "1inch API rejected request");
            return Err(OneInchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(path = url.path(), status = status.as_u16(), "1inch request succeeded");
        response.json::<Value>().await.map_err(OneInchError::Decode)
    }
}

/// Builds a swap submission from a quote, pinning the sender and slippage.
pub fn swap_payload(quote: Value, from: &str, slippage: rust_decimal::Decimal) -> Value {
    let mut payload = match quote {
        Value::Object(fields) => fields,
        other => {
            let mut fields = serde_json::Map::new();
            fields.insert("quote".to_string(), other);
            fields
        }
    };
    payload.insert("from".to_string(), Value::String(from.to_string()));
    payload.insert(
        "slippage".to_string(),
        Value::String(slippage.normalize().to_string()),
    );
    Value::Object(payload)
}

/// Transaction hash reported by a swap submission, if any.
pub fn transaction_hash(result: &Value) -> Option<String> {
    ["txHash", "transactionHash", "orderHash"]
        .iter()
        .find_map(|key| result.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
