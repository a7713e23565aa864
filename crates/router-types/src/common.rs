//! Common types used throughout the router.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy_primitives::{Address, Bytes, U256};
pub use rust_decimal::Decimal;

/// Token amount in base units.
///
/// Amounts are kept as decimals so that interpolated and penalty-adjusted
/// values keep their fractional part until an order is materialized.
pub type Amount = Decimal;

/// Direction of a market operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
	/// Sell a fixed amount of the taker token, maximizing proceeds.
	Sell,
	/// Buy a fixed amount of the maker token, minimizing cost.
	Buy,
}

impl Side {
	/// Applies a cost to an output amount: proceeds shrink on a sell, the
	/// amount paid grows on a buy.
	pub fn apply_penalty(&self, output: Amount, penalty: Amount) -> Amount {
		match self {
			Side::Sell => output - penalty,
			Side::Buy => output + penalty,
		}
	}
}

impl fmt::Display for Side {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Side::Sell => write!(f, "sell"),
			Side::Buy => write!(f, "buy"),
		}
	}
}

impl std::str::FromStr for Side {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"sell" => Ok(Side::Sell),
			"buy" => Ok(Side::Buy),
			other => Err(format!("Unknown side: {}", other)),
		}
	}
}

/// Rounding applied when converting a decimal amount to an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
	Down,
	Up,
}

/// Converts an on-chain integer amount to a decimal amount.
///
/// Returns `None` when the value does not fit the decimal range.
pub fn to_amount(value: U256) -> Option<Amount> {
	u128::try_from(value).ok().and_then(Decimal::from_u128)
}

/// Converts a decimal amount to an on-chain integer amount.
///
/// Negative amounts clamp to zero.
pub fn to_u256(amount: Amount, rounding: Rounding) -> U256 {
	let rounded = match rounding {
		Rounding::Down => amount.floor(),
		Rounding::Up => amount.ceil(),
	};
	if rounded.is_sign_negative() {
		return U256::ZERO;
	}
	rounded.to_u128().map(U256::from).unwrap_or(U256::MAX)
}

/// Scales a base-unit amount down to whole token units.
pub fn to_unit_amount(amount: Amount, decimals: u8) -> Amount {
	let mut scaled = amount;
	for _ in 0..decimals {
		scaled /= Decimal::TEN;
	}
	scaled
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_penalties_follow_side() {
		assert_eq!(
			Side::Sell.apply_penalty(Decimal::from(10), Decimal::ONE),
			Decimal::from(9)
		);
		assert_eq!(
			Side::Buy.apply_penalty(Decimal::from(10), Decimal::ONE),
			Decimal::from(11)
		);
	}

	#[test]
	fn test_u256_conversions() {
		let value = U256::from(100_000_000_000_000_000_000u128);
		let amount = to_amount(value).unwrap();
		assert_eq!(to_u256(amount, Rounding::Down), value);

		let fractional = Decimal::new(15, 1);
		assert_eq!(to_u256(fractional, Rounding::Down), U256::from(1));
		assert_eq!(to_u256(fractional, Rounding::Up), U256::from(2));
		assert_eq!(to_u256(-fractional, Rounding::Down), U256::ZERO);
		assert!(to_amount(U256::MAX).is_none());
	}

	#[test]
	fn test_unit_amount() {
		let amount = Decimal::from(320_000_000u64);
		assert_eq!(to_unit_amount(amount, 6), Decimal::from(320));
	}
}
