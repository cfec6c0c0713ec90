// Purchase planning for the scheduled buyer: how many trending tokens a
// stablecoin balance covers at a fixed increment, and whether the owner
// should hear about a low balance.

use crate::amount::format_units;
use crate::error::{BridgeError, BridgeResult};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LowBalance {
    None,
    /// Balance cannot cover a single increment
    BeforePurchase,
    /// Purchases were planned but what remains covers no further increment
    AfterPurchase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchasePlan {
    pub selected: Vec<String>,
    pub purchase_count: usize,
    pub increment: U256,
    pub initial_balance: U256,
    pub total_spend: U256,
    pub remaining_balance: U256,
    pub low_balance: LowBalance,
}

impl PurchasePlan {
    pub fn is_empty(&self) -> bool {
        self.purchase_count == 0
    }

    /// One-line human summary, amounts formatted with `decimals`.
    pub fn summary(&self, decimals: u8) -> String {
        format!(
            "{} purchase(s) of {} each, spending {} of {}, {} remaining",
            self.purchase_count,
            format_units(self.increment, decimals),
            format_units(self.total_spend, decimals),
            format_units(self.initial_balance, decimals),
            format_units(self.remaining_balance, decimals),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPrefs {
    pub email_notifications: bool,
    pub low_balance_notified: bool,
}

pub fn plan_purchases(
    balance: U256,
    increment: U256,
    max_tokens_per_run: usize,
    trending: &[String],
) -> BridgeResult<PurchasePlan> {
    if increment.is_zero() {
        return Err(BridgeError::Validation("purchase increment must be greater than zero".to_string()));
    }

    let affordable = balance / increment;
    let cap = trending.len().min(max_tokens_per_run);
    // cap fits in usize, so the min does too
    let count = if affordable < U256::from(cap) { affordable.to::<usize>() } else { cap };

    let total_spend = increment * U256::from(count);
    let remaining_balance = balance - total_spend;

    let low_balance = if balance < increment {
        LowBalance::BeforePurchase
    } else if count > 0 && remaining_balance < increment {
        LowBalance::AfterPurchase
    } else {
        LowBalance::None
    };

    Ok(PurchasePlan {
        selected: trending[..count].to_vec(),
        purchase_count: count,
        increment,
        initial_balance: balance,
        total_spend,
        remaining_balance,
        low_balance,
    })
}

/// A low-balance notice goes out once, and only to owners who opted in.
pub fn should_notify(plan: &PurchasePlan, prefs: &NotificationPrefs) -> bool {
    plan.low_balance != LowBalance::None && prefs.email_notifications && !prefs.low_balance_notified
}
