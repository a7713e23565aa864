//! The reference price offered to quote providers.

use router_types::{
	to_unit_amount, Amount, CostQuery, FillData, MarketSideLiquidity, Path, Side, Source,
};
use rust_decimal::Decimal;

use crate::OptimizerOptions;

/// Fixed cost of one native fill at `input`, in output units.
///
/// Returns `None` when no native fee is configured, in which case providers
/// get no comparison price.
pub fn native_fill_penalty(
	options: &OptimizerOptions,
	liquidity: &MarketSideLiquidity,
) -> Option<Amount> {
	if !options.fee_schedule.contains(Source::Native) {
		return None;
	}
	let query = CostQuery {
		source: Source::Native,
		input: liquidity.input_amount,
		fill_data: &FillData::Empty,
	};
	let gas = options.gas_schedule.cost(&query);
	let fee = options.fee_schedule.cost(&query)
		+ options.protocol_fee_multiplier * options.gas_price;
	Some((gas * options.gas_price + fee) * liquidity.eth_to_output_rate)
}

/// Maker-token units per taker-token unit a native order must beat.
///
/// Starts from the path's adjusted rate and adds back the fixed cost a
/// single native fill would pay, so a quote at this price breaks even with
/// the path.
pub fn comparison_price(
	path: &Path,
	liquidity: &MarketSideLiquidity,
	native_penalty: Amount,
) -> Option<Amount> {
	if path.is_empty() || liquidity.input_amount <= Decimal::ZERO {
		return None;
	}
	let amount = liquidity.input_amount;
	let output = path.adjusted_rate() * amount;
	let (maker_amount, taker_amount) = match path.side {
		Side::Sell => (output + native_penalty, amount),
		Side::Buy => (amount, output - native_penalty),
	};
	let maker_units = to_unit_amount(maker_amount, liquidity.maker_token_decimals);
	let taker_units = to_unit_amount(taker_amount, liquidity.taker_token_decimals);
	if taker_units <= Decimal::ZERO {
		return None;
	}
	Some(maker_units / taker_units)
}
