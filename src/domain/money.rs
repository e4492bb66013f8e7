use crate::error::TransferError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// The only asset this simulation speaks.
pub const ASSET_CODE: &str = "USD";
/// Minor-unit exponent for USD (cents).
pub const ASSET_SCALE: u32 = 2;

/// A positive monetary amount in major units.
///
/// Wrapper around `rust_decimal::Decimal` so that invalid (zero or negative)
/// amounts are rejected at construction time rather than deep inside the
/// payment flow.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, TransferError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(TransferError::InvalidAmount(format!(
                "amount must be positive, got {value}"
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = TransferError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Rounds a monetary value to 2 decimal places, half-up.
///
/// Applied only at output boundaries; intermediate fee arithmetic stays
/// unrounded so repeated computations are deterministic.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a percentage to 1 decimal place, half-up.
pub fn round_percentage(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// An amount expressed in minor units, as carried on the wire by the
/// protocol objects (`{ value, assetCode, assetScale }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAmount {
    pub value: i64,
    pub asset_code: String,
    pub asset_scale: u32,
}

impl AssetAmount {
    /// Converts a major-unit USD amount into minor units (cents).
    pub fn usd(amount: Decimal) -> Self {
        let factor = Decimal::from(10i64.pow(ASSET_SCALE));
        let minor = (amount * factor).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Self {
            value: minor.to_i64().unwrap_or(0),
            asset_code: ASSET_CODE.to_string(),
            asset_scale: ASSET_SCALE,
        }
    }

    pub fn zero() -> Self {
        Self {
            value: 0,
            asset_code: ASSET_CODE.to_string(),
            asset_scale: ASSET_SCALE,
        }
    }
}
