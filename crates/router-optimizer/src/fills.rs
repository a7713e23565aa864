//! Turns samples and resting orders into per-source fill sequences.

use router_types::{
	Amount, CostQuery, CostSchedule, Fill, FillData, NativeOrder, Sample, Side, Source,
};
use rust_decimal::Decimal;

/// Prices used to attach penalties to fills.
#[derive(Debug, Clone)]
pub struct FillCosts<'a> {
	/// Output-token base units per wei.
	pub eth_to_output_rate: Amount,
	/// Gas price in wei.
	pub gas_price: Amount,
	/// Gas units charged as protocol fee per native fill, multiplied by the
	/// gas price.
	pub protocol_fee_multiplier: Amount,
	pub fee_schedule: &'a CostSchedule,
	pub gas_schedule: &'a CostSchedule,
}

impl FillCosts<'_> {
	fn price(&self, query: &CostQuery<'_>, extra_fee: Amount) -> FillCost {
		let gas = self.gas_schedule.cost(query);
		let fee = self.fee_schedule.cost(query) + extra_fee;
		FillCost {
			gas,
			fee,
			penalty: (gas * self.gas_price + fee) * self.eth_to_output_rate,
		}
	}

	fn protocol_fee(&self) -> Amount {
		self.protocol_fee_multiplier * self.gas_price
	}
}

struct FillCost {
	gas: Amount,
	fee: Amount,
	penalty: Amount,
}

/// Builds one fill sequence per source.
///
/// Native orders form a single sequence sorted by adjusted rate, best first.
/// Each DEX series becomes a sequence of increments between consecutive
/// samples, with the source's fixed cost on the first fill only. Every
/// two-hop sample becomes a sequence of its own.
pub fn build_fills(
	side: Side,
	native_orders: &[NativeOrder],
	dex_quotes: &[Vec<Sample>],
	two_hop_quotes: &[Sample],
	target_input: Amount,
	costs: &FillCosts<'_>,
) -> Vec<Vec<Fill>> {
	let mut fills = Vec::with_capacity(dex_quotes.len() + two_hop_quotes.len() + 1);

	let native = native_fills(side, native_orders, target_input, costs);
	if !native.is_empty() {
		fills.push(native);
	}

	for series in dex_quotes {
		let dex = dex_fills(series, costs);
		if !dex.is_empty() {
			fills.push(dex);
		}
	}

	for sample in two_hop_quotes {
		if let Some(fill) = two_hop_fill(sample, costs) {
			fills.push(vec![fill]);
		}
	}

	fills
}

fn native_fills(
	side: Side,
	orders: &[NativeOrder],
	target_input: Amount,
	costs: &FillCosts<'_>,
) -> Vec<Fill> {
	let mut fills: Vec<Fill> = orders
		.iter()
		.filter_map(|order| {
			let available = order.fillable_input(side);
			let output = order.fillable_output(side);
			if available.is_zero() || output.is_zero() {
				return None;
			}
			// Price the fill at the amount it can actually contribute.
			let input = available.min(target_input);
			let output = if input < available {
				output * (input / available)
			} else {
				output
			};
			let fill_data = FillData::Native {
				order: Box::new(order.clone()),
			};
			let cost = costs.price(
				&CostQuery {
					source: Source::Native,
					input,
					fill_data: &fill_data,
				},
				costs.protocol_fee(),
			);
			let fill = Fill {
				source: Source::Native,
				input,
				output,
				penalty: cost.penalty,
				gas_cost: cost.gas,
				protocol_fee_cost: cost.fee,
				index: 0,
				fill_data,
			};
			if side == Side::Sell && fill.adjusted_rate(side) <= Decimal::ZERO {
				return None;
			}
			Some(fill)
		})
		.collect();

	// Stable, so equally priced orders keep their given order.
	fills.sort_by(|a, b| match side {
		Side::Sell => b.adjusted_rate(side).cmp(&a.adjusted_rate(side)),
		Side::Buy => a.adjusted_rate(side).cmp(&b.adjusted_rate(side)),
	});
	for (index, fill) in fills.iter_mut().enumerate() {
		fill.index = index;
	}
	fills
}

fn dex_fills(series: &[Sample], costs: &FillCosts<'_>) -> Vec<Fill> {
	let mut fills = Vec::with_capacity(series.len());
	let mut previous_input = Decimal::ZERO;
	let mut previous_output = Decimal::ZERO;

	for sample in series.iter().filter(|s| !s.output.is_zero()) {
		let input = sample.input - previous_input;
		let output = sample.output - previous_output;
		previous_input = sample.input;
		previous_output = sample.output;
		if input <= Decimal::ZERO {
			continue;
		}

		let (penalty, gas_cost, protocol_fee_cost) = if fills.is_empty() {
			let cost = costs.price(
				&CostQuery {
					source: sample.source,
					input: sample.input,
					fill_data: &sample.fill_data,
				},
				Decimal::ZERO,
			);
			(cost.penalty, cost.gas, cost.fee)
		} else {
			(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
		};

		fills.push(Fill {
			source: sample.source,
			input,
			output,
			penalty,
			gas_cost,
			protocol_fee_cost,
			index: fills.len(),
			fill_data: sample.fill_data.clone(),
		});
	}
	fills
}

fn two_hop_fill(sample: &Sample, costs: &FillCosts<'_>) -> Option<Fill> {
	if sample.output.is_zero() || sample.input.is_zero() {
		return None;
	}
	let FillData::MultiHop(hops) = &sample.fill_data else {
		return None;
	};

	// Both legs pay their own costs, plus the chaining overhead priced under
	// the two-hop source itself.
	let legs = [
		(hops.first_hop_source, &hops.first_hop_data),
		(hops.second_hop_source, &hops.second_hop_data),
		(Source::MultiHop, &sample.fill_data),
	];
	let mut gas = Decimal::ZERO;
	let mut fee = Decimal::ZERO;
	let mut penalty = Decimal::ZERO;
	for (source, fill_data) in legs {
		let cost = costs.price(
			&CostQuery {
				source,
				input: sample.input,
				fill_data,
			},
			Decimal::ZERO,
		);
		gas += cost.gas;
		fee += cost.fee;
		penalty += cost.penalty;
	}

	Some(Fill {
		source: Source::MultiHop,
		input: sample.input,
		output: sample.output,
		penalty,
		gas_cost: gas,
		protocol_fee_cost: fee,
		index: 0,
		fill_data: sample.fill_data.clone(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use router_types::{Address, Bytes, MultiHopFillData, SignedOrder, U256};

	fn order(taker: u64, maker: u64) -> NativeOrder {
		NativeOrder::fully_fillable(SignedOrder {
			chain_id: 1,
			exchange_address: Address::ZERO,
			maker_address: Address::repeat_byte(1),
			taker_address: Address::ZERO,
			fee_recipient_address: Address::ZERO,
			sender_address: Address::ZERO,
			maker_asset_amount: U256::from(maker),
			taker_asset_amount: U256::from(taker),
			maker_fee: U256::ZERO,
			taker_fee: U256::ZERO,
			expiration_time_seconds: U256::from(u64::MAX),
			salt: U256::from(taker),
			maker_asset_data: Bytes::new(),
			taker_asset_data: Bytes::new(),
			maker_fee_asset_data: Bytes::new(),
			taker_fee_asset_data: Bytes::new(),
			signature: Bytes::new(),
		})
	}

	fn costs<'a>(fees: &'a CostSchedule, gas: &'a CostSchedule, eth_rate: Amount) -> FillCosts<'a> {
		FillCosts {
			eth_to_output_rate: eth_rate,
			gas_price: Decimal::ZERO,
			protocol_fee_multiplier: Decimal::ZERO,
			fee_schedule: fees,
			gas_schedule: gas,
		}
	}

	#[test]
	fn test_small_orders_first_when_target_fits_both() {
		let fees = CostSchedule::new().with_constant(Source::Native, Decimal::from(200_000));
		let gas = CostSchedule::new();
		let small = order(5_000_000, 10_000_000);
		let large = order(10_000_000, 20_000_000);
		let target = Decimal::from(4_999_999);

		let fills = build_fills(
			Side::Sell,
			&[small.clone(), large],
			&[],
			&[],
			target,
			&costs(&fees, &gas, Decimal::new(5, 1)),
		);
		assert_eq!(fills.len(), 1);
		assert_eq!(fills[0][0].fill_data.native_order(), Some(&small));
		assert_eq!(fills[0][0].input, target);
		assert_eq!(fills[0][0].penalty, Decimal::from(100_000));
	}

	#[test]
	fn test_large_orders_first_when_target_is_large() {
		let fees = CostSchedule::new().with_constant(Source::Native, Decimal::from(200_000));
		let gas = CostSchedule::new();
		let small = order(5_000_000, 10_000_000);
		let large = order(10_000_000, 20_000_000);

		let fills = build_fills(
			Side::Sell,
			&[small.clone(), large.clone()],
			&[],
			&[],
			Decimal::from(1_000_000_000_000u64),
			&costs(&fees, &gas, Decimal::new(5, 1)),
		);
		assert_eq!(fills[0][0].fill_data.native_order(), Some(&large));
		assert_eq!(fills[0][1].fill_data.native_order(), Some(&small));
		assert_eq!(fills[0][1].index, 1);
	}

	#[test]
	fn test_unprofitable_native_orders_are_dropped() {
		let fees = CostSchedule::new().with_constant(Source::Native, Decimal::from(100));
		let gas = CostSchedule::new();
		let fills = build_fills(
			Side::Sell,
			&[order(10, 50), order(10, 0)],
			&[],
			&[],
			Decimal::from(10),
			&costs(&fees, &gas, Decimal::ONE),
		);
		assert!(fills.is_empty());
	}

	#[test]
	fn test_dex_fills_are_increments_with_one_penalty() {
		let fees = CostSchedule::new().with_constant(Source::Uniswap, Decimal::from(3));
		let gas = CostSchedule::new().with_constant(Source::Uniswap, Decimal::from(10));
		let series = vec![
			Sample::new(Source::Uniswap, Decimal::from(10), Decimal::ZERO),
			Sample::new(Source::Uniswap, Decimal::from(20), Decimal::from(18)),
			Sample::new(Source::Uniswap, Decimal::from(30), Decimal::from(25)),
		];
		let mut costs = costs(&fees, &gas, Decimal::from(2));
		costs.gas_price = Decimal::ONE;

		let fills = build_fills(Side::Sell, &[], &[series], &[], Decimal::from(30), &costs);
		assert_eq!(fills.len(), 1);
		let fills = &fills[0];
		// The zero-output sample is skipped entirely.
		assert_eq!(fills.len(), 2);
		assert_eq!(fills[0].input, Decimal::from(20));
		assert_eq!(fills[0].output, Decimal::from(18));
		assert_eq!(fills[0].penalty, Decimal::from(26));
		assert_eq!(fills[0].gas_cost, Decimal::from(10));
		assert_eq!(fills[1].input, Decimal::from(10));
		assert_eq!(fills[1].output, Decimal::from(7));
		assert_eq!(fills[1].penalty, Decimal::ZERO);
		assert_eq!(fills[1].index, 1);
	}

	#[test]
	fn test_protocol_fee_is_charged_on_native_fills() {
		let fees = CostSchedule::new();
		let gas = CostSchedule::new();
		let costs = FillCosts {
			eth_to_output_rate: Decimal::ONE,
			gas_price: Decimal::from(2),
			protocol_fee_multiplier: Decimal::from(5),
			fee_schedule: &fees,
			gas_schedule: &gas,
		};
		let fills = build_fills(Side::Sell, &[order(100, 100)], &[], &[], Decimal::from(100), &costs);
		assert_eq!(fills[0][0].protocol_fee_cost, Decimal::from(10));
		assert_eq!(fills[0][0].penalty, Decimal::from(10));
	}

	#[test]
	fn test_two_hop_fill_carries_both_legs() {
		let fees = CostSchedule::new();
		let gas = CostSchedule::new()
			.with_constant(Source::Uniswap, Decimal::from(3))
			.with_constant(Source::Eth2Dai, Decimal::from(4))
			.with_constant(Source::MultiHop, Decimal::from(1));
		let sample = Sample::new(Source::MultiHop, Decimal::from(100), Decimal::from(90)).with_fill_data(
			FillData::MultiHop(Box::new(MultiHopFillData {
				first_hop_source: Source::Uniswap,
				second_hop_source: Source::Eth2Dai,
				intermediate_token: Address::repeat_byte(9),
				first_hop_data: FillData::Empty,
				second_hop_data: FillData::Empty,
			})),
		);
		let zero = Sample::new(Source::MultiHop, Decimal::from(100), Decimal::ZERO);
		let fills = build_fills(
			Side::Sell,
			&[],
			&[],
			&[sample, zero],
			Decimal::from(100),
			&costs(&fees, &gas, Decimal::ONE),
		);
		assert_eq!(fills.len(), 1);
		assert_eq!(fills[0][0].source, Source::MultiHop);
		assert_eq!(fills[0][0].gas_cost, Decimal::from(8));
	}
}
