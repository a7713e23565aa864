//! Bilateral quotes from off-venue counterparties.

use crate::{Address, Amount, NativeOrder, SignedOrder, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteKind {
	/// A non-binding price used to decide whether re-optimizing is worthwhile.
	Indicative,
	/// A signed, fillable order.
	Firm,
}

impl fmt::Display for QuoteKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			QuoteKind::Indicative => write!(f, "indicative"),
			QuoteKind::Firm => write!(f, "firm"),
		}
	}
}

/// A price offered by a counterparty for a requested amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
	/// Name of the counterparty that produced the quote.
	pub counterparty: String,
	pub kind: QuoteKind,
	/// The offered order. Indicative quotes carry an unsigned order.
	pub order: SignedOrder,
	#[serde(default)]
	pub expiry: Option<DateTime<Utc>>,
}

impl Quote {
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.expiry.is_some_and(|expiry| expiry <= now)
	}

	/// The quote as a resting order, assumed fully fillable.
	pub fn to_native_order(&self) -> NativeOrder {
		NativeOrder::fully_fillable(self.order.clone())
	}
}

/// What is being asked of the counterparties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
	pub maker_token: Address,
	pub taker_token: Address,
	pub amount: Amount,
	pub side: Side,
	pub taker_address: Address,
	/// Maker units per taker unit the router can already get elsewhere.
	#[serde(default)]
	pub comparison_price: Option<Amount>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Bytes, U256};
	use chrono::Duration;

	fn order() -> SignedOrder {
		SignedOrder {
			chain_id: 1,
			exchange_address: Address::ZERO,
			maker_address: Address::repeat_byte(0x11),
			taker_address: Address::ZERO,
			fee_recipient_address: Address::ZERO,
			sender_address: Address::ZERO,
			maker_asset_amount: U256::from(300),
			taker_asset_amount: U256::from(100),
			maker_fee: U256::ZERO,
			taker_fee: U256::ZERO,
			expiration_time_seconds: U256::ZERO,
			salt: U256::ZERO,
			maker_asset_data: Bytes::new(),
			taker_asset_data: Bytes::new(),
			maker_fee_asset_data: Bytes::new(),
			taker_fee_asset_data: Bytes::new(),
			signature: Bytes::new(),
		}
	}

	#[test]
	fn test_expiry() {
		let now = Utc::now();
		let mut quote = Quote {
			counterparty: "mm".to_string(),
			kind: QuoteKind::Firm,
			order: order(),
			expiry: None,
		};
		assert!(!quote.is_expired(now));
		quote.expiry = Some(now - Duration::seconds(1));
		assert!(quote.is_expired(now));
		quote.expiry = Some(now + Duration::seconds(30));
		assert!(!quote.is_expired(now));
	}

	#[test]
	fn test_quote_is_fully_fillable() {
		let quote = Quote {
			counterparty: "mm".to_string(),
			kind: QuoteKind::Firm,
			order: order(),
			expiry: None,
		};
		let native = quote.to_native_order();
		assert_eq!(native.fillable_maker_amount, U256::from(300));
		assert_eq!(native.fillable_taker_amount, U256::from(100));
	}
}
