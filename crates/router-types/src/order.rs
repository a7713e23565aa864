//! Resting orders and materialized output orders.

use crate::{to_amount, Address, Amount, Bytes, Fill, Side, Source, U256};
use serde::{Deserialize, Serialize};

/// A signed limit order in the exchange wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrder {
	pub chain_id: u64,
	pub exchange_address: Address,
	pub maker_address: Address,
	pub taker_address: Address,
	pub fee_recipient_address: Address,
	pub sender_address: Address,
	pub maker_asset_amount: U256,
	pub taker_asset_amount: U256,
	pub maker_fee: U256,
	pub taker_fee: U256,
	pub expiration_time_seconds: U256,
	pub salt: U256,
	pub maker_asset_data: Bytes,
	pub taker_asset_data: Bytes,
	pub maker_fee_asset_data: Bytes,
	pub taker_fee_asset_data: Bytes,
	pub signature: Bytes,
}

/// A resting order paired with how much of it can still be filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeOrder {
	pub order: SignedOrder,
	pub fillable_maker_amount: U256,
	pub fillable_taker_amount: U256,
}

impl NativeOrder {
	/// Wraps an order that is fillable in full.
	pub fn fully_fillable(order: SignedOrder) -> Self {
		Self {
			fillable_maker_amount: order.maker_asset_amount,
			fillable_taker_amount: order.taker_asset_amount,
			order,
		}
	}

	/// Wraps an order given its fillable taker amount, scaling the maker side
	/// proportionally.
	pub fn with_fillable_taker_amount(order: SignedOrder, fillable_taker_amount: U256) -> Self {
		let fillable_maker_amount = if order.taker_asset_amount.is_zero() {
			U256::ZERO
		} else {
			order.maker_asset_amount * fillable_taker_amount / order.taker_asset_amount
		};
		Self {
			order,
			fillable_maker_amount,
			fillable_taker_amount,
		}
	}

	/// Fillable amount on the side the target applies to.
	pub fn fillable_input(&self, side: Side) -> Amount {
		let value = match side {
			Side::Sell => self.fillable_taker_amount,
			Side::Buy => self.fillable_maker_amount,
		};
		to_amount(value).unwrap_or_default()
	}

	/// Fillable amount on the opposite side.
	pub fn fillable_output(&self, side: Side) -> Amount {
		let value = match side {
			Side::Sell => self.fillable_maker_amount,
			Side::Buy => self.fillable_taker_amount,
		};
		to_amount(value).unwrap_or_default()
	}
}

/// An order emitted by the materializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// The order to submit. Bridge orders use the bridge contract as maker.
	pub order: SignedOrder,
	/// Amounts of `order` the path actually consumes.
	pub fillable_maker_amount: U256,
	pub fillable_taker_amount: U256,
	/// Source the order draws from.
	pub source: Source,
	/// Fills the order was built from.
	pub fills: Vec<Fill>,
}
