//! Materializer that settles non-native liquidity through bridge contracts.

use crate::asset_data::{encode_bridge_asset_data, encode_erc20_asset_data, encode_two_hop_data};
use crate::{OrderContext, OrderError, OrderInterface};
use router_types::{
	to_u256, Address, Amount, Bytes, ConfigSchema, Field, FieldType, Fill, FillData, Order, Path,
	Rounding, Schema, Side, SignedOrder, Source, ValidationError, U256,
};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

/// Expiry stamped on bridge orders, which are never posted anywhere.
pub const INFINITE_TIMESTAMP_SEC: u64 = 2_524_604_400;

/// Signature type byte of a contract-validated (wallet) signature.
const WALLET_SIGNATURE: u8 = 0x04;

pub struct BridgeOrderMaterializer {
	bridges: HashMap<Source, Address>,
	chain_id: u64,
	exchange_address: Address,
}

impl BridgeOrderMaterializer {
	pub fn new(bridges: HashMap<Source, Address>, chain_id: u64, exchange_address: Address) -> Self {
		Self {
			bridges,
			chain_id,
			exchange_address,
		}
	}

	/// The bridge a fill settles through. Liquidity provider fills name their
	/// own pool.
	fn bridge_for(&self, fill: &Fill) -> Result<Address, OrderError> {
		if fill.source == Source::LiquidityProvider {
			if let Some(pool) = fill.fill_data.pool() {
				return Ok(pool);
			}
		}
		self.bridges
			.get(&fill.source)
			.copied()
			.ok_or(OrderError::MissingBridge(fill.source))
	}

	fn native_order(&self, side: Side, fill: &Fill) -> Result<Order, OrderError> {
		let native = fill.fill_data.native_order().ok_or_else(|| {
			OrderError::InvalidFill("native fill without its order".to_string())
		})?;
		let order = &native.order;
		let consumed = to_u256(fill.input, Rounding::Down);

		let (maker, taker) = match side {
			Side::Sell => {
				let taker = consumed.min(native.fillable_taker_amount);
				let maker = mul_div(order.maker_asset_amount, taker, order.taker_asset_amount, Rounding::Down);
				(maker.min(native.fillable_maker_amount), taker)
			}
			Side::Buy => {
				let maker = consumed.min(native.fillable_maker_amount);
				let taker = mul_div(order.taker_asset_amount, maker, order.maker_asset_amount, Rounding::Up);
				(maker, taker.min(native.fillable_taker_amount))
			}
		};

		Ok(Order {
			order: order.clone(),
			fillable_maker_amount: maker,
			fillable_taker_amount: taker,
			source: Source::Native,
			fills: vec![fill.clone()],
		})
	}

	fn bridge_order(&self, context: &OrderContext, fills: Vec<Fill>) -> Result<Order, OrderError> {
		let Some(first) = fills.first() else {
			return Err(OrderError::InvalidFill("empty bridge order".to_string()));
		};
		let source = first.source;
		let bridge = self.bridge_for(first)?;
		let bridge_data = bridge_data(&first.fill_data);

		let input: Amount = fills.iter().map(|f| f.input).sum();
		let output: Amount = fills.iter().map(|f| f.output).sum();
		// Proceeds round down and costs round up.
		let (maker, taker) = match context.side {
			Side::Sell => (to_u256(output, Rounding::Down), to_u256(input, Rounding::Down)),
			Side::Buy => (to_u256(input, Rounding::Down), to_u256(output, Rounding::Up)),
		};

		let order = SignedOrder {
			chain_id: self.chain_id,
			exchange_address: self.exchange_address,
			maker_address: bridge,
			taker_address: Address::ZERO,
			fee_recipient_address: Address::ZERO,
			sender_address: Address::ZERO,
			maker_asset_amount: maker,
			taker_asset_amount: taker,
			maker_fee: U256::ZERO,
			taker_fee: U256::ZERO,
			expiration_time_seconds: U256::from(INFINITE_TIMESTAMP_SEC),
			salt: generate_salt(),
			maker_asset_data: encode_bridge_asset_data(context.maker_token, bridge, bridge_data),
			taker_asset_data: encode_erc20_asset_data(context.taker_token),
			maker_fee_asset_data: Bytes::new(),
			taker_fee_asset_data: Bytes::new(),
			signature: Bytes::from(vec![WALLET_SIGNATURE]),
		};
		debug!(source = %source, bridge = %bridge, fills = fills.len(), "Built bridge order");

		Ok(Order {
			order,
			fillable_maker_amount: maker,
			fillable_taker_amount: taker,
			source,
			fills,
		})
	}
}

impl OrderInterface for BridgeOrderMaterializer {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(BridgeMaterializerSchema)
	}

	fn materialize(&self, path: &Path, context: &OrderContext) -> Result<Vec<Order>, OrderError> {
		let mut orders = Vec::new();
		let mut pending: Vec<Fill> = Vec::new();

		for fill in &path.fills {
			let joins_pending = pending.last().is_some_and(|last| {
				!fill.is_native()
					&& last.source == fill.source
					&& last.fill_data.pool() == fill.fill_data.pool()
			});
			if !joins_pending && !pending.is_empty() {
				orders.push(self.bridge_order(context, std::mem::take(&mut pending))?);
			}
			if fill.is_native() {
				orders.push(self.native_order(context.side, fill)?);
			} else {
				pending.push(fill.clone());
			}
		}
		if !pending.is_empty() {
			orders.push(self.bridge_order(context, pending)?);
		}
		Ok(orders)
	}
}

/// Calldata handed to the bridge.
fn bridge_data(fill_data: &FillData) -> Bytes {
	match fill_data {
		FillData::Bridge { data, .. } => data.clone(),
		FillData::MultiHop(hops) => encode_two_hop_data(
			hops.intermediate_token,
			bridge_data(&hops.first_hop_data),
			bridge_data(&hops.second_hop_data),
		),
		FillData::Empty | FillData::Native { .. } => Bytes::new(),
	}
}

fn mul_div(value: U256, numerator: U256, denominator: U256, rounding: Rounding) -> U256 {
	if denominator.is_zero() {
		return U256::ZERO;
	}
	let product = value.saturating_mul(numerator);
	let quotient = product / denominator;
	match rounding {
		Rounding::Up if !(product % denominator).is_zero() => quotient + U256::from(1),
		_ => quotient,
	}
}

fn generate_salt() -> U256 {
	U256::from(uuid::Uuid::new_v4().as_u128())
}

/// Configuration schema for the bridge materializer.
pub struct BridgeMaterializerSchema;

impl ConfigSchema for BridgeMaterializerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new("exchange_address", FieldType::Address),
				Field::new("bridges", FieldType::Table(Schema::new(vec![], vec![]))),
			],
		);
		schema.validate(config)?;

		let Some(bridges) = config.get("bridges").and_then(|b| b.as_table()) else {
			return Ok(());
		};
		for (name, address) in bridges {
			Source::from_str(name).map_err(|message| ValidationError::InvalidValue {
				field: format!("bridges.{}", name),
				message,
			})?;
			let valid = address.as_str().is_some_and(|s| Address::from_str(s).is_ok());
			if !valid {
				return Err(ValidationError::InvalidValue {
					field: format!("bridges.{}", name),
					message: format!("invalid bridge address {}", address),
				});
			}
		}
		Ok(())
	}
}

/// Factory function to create the bridge materializer from configuration.
///
/// Configuration parameters:
/// - `chain_id`: chain of the emitted orders (default: 1)
/// - `exchange_address`: exchange the orders settle on (default: zero address)
/// - `bridges`: table of source name to bridge contract address
pub fn create_materializer(config: &toml::Value) -> Result<Box<dyn OrderInterface>, OrderError> {
	BridgeMaterializerSchema
		.validate(config)
		.map_err(|e| OrderError::InvalidConfig(e.to_string()))?;

	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.unwrap_or(1) as u64;
	let exchange_address = config
		.get("exchange_address")
		.and_then(|v| v.as_str())
		.and_then(|s| Address::from_str(s).ok())
		.unwrap_or(Address::ZERO);

	let mut bridges = HashMap::new();
	if let Some(table) = config.get("bridges").and_then(|b| b.as_table()) {
		for (name, address) in table {
			let source = Source::from_str(name).map_err(OrderError::InvalidConfig)?;
			let address = address
				.as_str()
				.and_then(|s| Address::from_str(s).ok())
				.ok_or_else(|| OrderError::InvalidConfig(format!("invalid bridge for {}", name)))?;
			bridges.insert(source, address);
		}
	}

	Ok(Box::new(BridgeOrderMaterializer::new(
		bridges,
		chain_id,
		exchange_address,
	)))
}
