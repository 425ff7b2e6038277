use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

fn evm_address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("static regex"))
}

pub fn is_evm_address(candidate: &str) -> bool {
    evm_address_pattern().is_match(candidate.trim())
}

/// Addresses are keyed case-insensitively (checksummed and lowercase forms
/// name the same account).
pub fn address_key(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Treats absent, empty and whitespace-only strings alike.
pub fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn is_positive(amount: Decimal) -> bool {
    amount > Decimal::ZERO
}
