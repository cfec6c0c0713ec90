// Exact conversion between raw integer balances and decimal display strings.
// Everything goes through decimal digit strings; no f64 anywhere.

use crate::error::{BridgeError, BridgeResult};
use alloy_primitives::U256;

/// Native decimals: 1 SOL = 10^9 lamports.
pub const SOLANA_NATIVE_DECIMALS: u8 = 9;
/// Native decimals: 1 ETH = 10^18 wei.
pub const EVM_NATIVE_DECIMALS: u8 = 18;

/// Format `raw / 10^decimals` as a decimal string with trailing zeros stripped.
///
/// `format_units(1_500_000, 6) == "1.5"`, `format_units(123, 6) == "0.000123"`.
pub fn format_units(raw: U256, decimals: u8) -> String {
    let mut digits = raw.to_string();
    let dec = decimals as usize;
    if dec == 0 {
        return digits;
    }

    if digits.len() <= dec {
        digits = format!("{:0>width$}", digits, width = dec + 1);
    }

    let (int_part, frac_part) = digits.split_at(digits.len() - dec);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Inverse of [`format_units`]: "1.5" with 6 decimals is 1_500_000.
pub fn parse_units(text: &str, decimals: u8) -> BridgeResult<U256> {
    let text = text.trim();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(BridgeError::Validation("empty amount".to_string()));
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return Err(BridgeError::Validation(format!("invalid amount: {}", text)));
    }
    if frac_part.len() > decimals as usize {
        return Err(BridgeError::Validation(format!(
            "too many decimal places in {} (max {})",
            text, decimals
        )));
    }

    let padded = format!("{}{:0<width$}", int_part, frac_part, width = decimals as usize);
    let trimmed = padded.trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(trimmed, 10)
        .map_err(|e| BridgeError::Validation(format!("amount out of range: {}: {}", text, e)))
}

/// Parse a JSON-RPC hex quantity ("0x1bc16d674ec80000") into a U256.
pub fn parse_hex_quantity(text: &str) -> BridgeResult<U256> {
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| BridgeError::NetworkError(format!("expected hex quantity, got {}", text)))?;
    if hex.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(hex, 16)
        .map_err(|e| BridgeError::NetworkError(format!("invalid hex quantity {}: {}", text, e)))
}
