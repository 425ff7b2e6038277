use rust_decimal::Decimal;
use serde::Serialize;

/// Token accepted as collateral, with its fixed USD price and risk parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralAsset {
    pub symbol: String,
    pub name: String,
    pub price_usd: Decimal,
    pub ltv: Decimal,
    pub liquidation_threshold: Decimal,
    #[serde(rename = "isLST")]
    pub is_lst: bool,
}

/// Token that can be borrowed against collateral.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowAsset {
    pub symbol: String,
    pub name: String,
    pub price_usd: Decimal,
    pub interest_rate: Decimal,
    pub decimals: u8,
}

/// Fixed price and parameter table. Prices are constants, not oracle reads.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRegistry {
    collateral: Vec<CollateralAsset>,
    borrow: Vec<BorrowAsset>,
}

impl TokenRegistry {
    pub fn new(collateral: Vec<CollateralAsset>, borrow: Vec<BorrowAsset>) -> Self {
        Self { collateral, borrow }
    }

    pub fn collateral(&self, symbol: &str) -> Option<&CollateralAsset> {
        let symbol = symbol.trim();
        self.collateral
            .iter()
            .find(|asset| asset.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn borrow_asset(&self, symbol: &str) -> Option<&BorrowAsset> {
        let symbol = symbol.trim();
        self.borrow
            .iter()
            .find(|asset| asset.symbol.eq_ignore_ascii_case(symbol))
    }

    /// USD price of any known token, collateral or borrowable.
    pub fn price_of(&self, symbol: &str) -> Option<Decimal> {
        self.collateral(symbol)
            .map(|asset| asset.price_usd)
            .or_else(|| self.borrow_asset(symbol).map(|asset| asset.price_usd))
    }

    pub fn collateral_assets(&self) -> &[CollateralAsset] {
        &self.collateral
    }

    pub fn borrow_assets(&self) -> &[BorrowAsset] {
        &self.borrow
    }

    pub fn symbols(&self) -> Vec<String> {
        self.collateral
            .iter()
            .map(|asset| asset.symbol.clone())
            .chain(self.borrow.iter().map(|asset| asset.symbol.clone()))
            .collect()
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new(
            vec![
                CollateralAsset {
                    symbol: "stETH".to_string(),
                    name: "Liquid staked Ether".to_string(),
                    price_usd: Decimal::new(2000, 0),
                    ltv: Decimal::new(8, 1),
                    liquidation_threshold: Decimal::new(85, 2),
                    is_lst: true,
                },
                CollateralAsset {
                    symbol: "rETH".to_string(),
                    name: "Rocket Pool ETH".to_string(),
                    price_usd: Decimal::new(1800, 0),
                    ltv: Decimal::new(75, 2),
                    liquidation_threshold: Decimal::new(8, 1),
                    is_lst: true,
                },
            ],
            vec![BorrowAsset {
                symbol: "USDC".to_string(),
                name: "USD Coin".to_string(),
                price_usd: Decimal::ONE,
                interest_rate: Decimal::new(8, 2),
                decimals: 6,
            }],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case_and_whitespace() {
        let registry = TokenRegistry::default();
        assert_eq!(registry.collateral(" steth ").unwrap().symbol, "stETH");
        assert_eq!(registry.borrow_asset("usdc").unwrap().symbol, "USDC");
        assert!(registry.collateral("USDC").is_none());
        assert!(registry.borrow_asset("stETH").is_none());
    }

    #[test]
    fn prices_cover_both_sides() {
        let registry = TokenRegistry::default();
        assert_eq!(registry.price_of("stETH"), Some(Decimal::new(2000, 0)));
        assert_eq!(registry.price_of("rETH"), Some(Decimal::new(1800, 0)));
        assert_eq!(registry.price_of("USDC"), Some(Decimal::ONE));
        assert_eq!(registry.price_of("DOGE"), None);
        assert_eq!(registry.symbols(), vec!["stETH", "rETH", "USDC"]);
    }
}
