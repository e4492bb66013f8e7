use crate::domain::money::{Amount, round_money, round_percentage};
use crate::error::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// What a traditional remittance provider charges (7%).
pub const TRADITIONAL_FEE_RATE: Decimal = dec!(0.07);
/// The network-level fee (0.5%). Informational only, never charged.
pub const INTERLEDGER_FEE_RATE: Decimal = dec!(0.005);
/// Our fee, network fee plus margin (0.8%).
pub const OUR_FEE_RATE: Decimal = dec!(0.008);

/// Cost breakdown for one transfer amount.
///
/// All monetary fields are rounded half-up to 2 decimal places;
/// `savings_percentage` to 1. Field names follow the simulated wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub amount: Decimal,
    pub traditional_fee: Decimal,
    pub interledger_fee: Decimal,
    pub our_fee: Decimal,
    pub savings: Decimal,
    pub savings_percentage: Decimal,
    pub recipient_receives: Decimal,
}

/// Deterministic fee calculator.
///
/// Stateless and side-effect free, so it is safe to call from any number of
/// concurrent sessions without synchronization.
pub struct FeeEngine;

impl FeeEngine {
    /// Computes the cost breakdown for `amount`.
    ///
    /// Fails with `InvalidAmount` when `amount <= 0`. Rounding happens only
    /// here, at the boundary; intermediate products stay exact.
    pub fn compute(amount: Decimal) -> Result<FeeBreakdown> {
        let amount = Amount::new(amount)?.value();

        let traditional = amount * TRADITIONAL_FEE_RATE;
        let interledger = amount * INTERLEDGER_FEE_RATE;
        let ours = amount * OUR_FEE_RATE;
        let savings = traditional - ours;
        // traditional == 0 implies amount == 0, which was rejected above.
        let percentage = if traditional.is_zero() {
            Decimal::ZERO
        } else {
            savings / traditional * Decimal::ONE_HUNDRED
        };

        Ok(FeeBreakdown {
            amount,
            traditional_fee: round_money(traditional),
            interledger_fee: round_money(interledger),
            our_fee: round_money(ours),
            savings: round_money(savings),
            savings_percentage: round_percentage(percentage),
            recipient_receives: round_money(amount - ours),
        })
    }
}
