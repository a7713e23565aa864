//! Fill construction and path optimization.
//!
//! The two building blocks, [`build_fills`] and [`find_best_path`], are pure
//! functions. [`optimize`] wires them together for one liquidity snapshot
//! and adds the fallback path.

use router_types::{
	Amount, CostSchedule, ExchangeProxyOverhead, MarketSideLiquidity, Path, RouterError, Source,
	SourceFlags,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

pub mod comparison;
pub mod fallback;
pub mod fills;
pub mod path;

pub use comparison::{comparison_price, native_fill_penalty};
pub use fallback::build_fallback;
pub use fills::{build_fills, FillCosts};
pub use path::{apply_bridge_slippage, find_best_path};

/// Default bound on search nodes per optimization.
pub const DEFAULT_RUN_LIMIT: usize = 1 << 15;

/// Default gas units charged as protocol fee per native fill.
pub const DEFAULT_PROTOCOL_FEE_MULTIPLIER: u64 = 70_000;

/// Knobs for one optimization.
#[derive(Debug, Clone)]
pub struct OptimizerOptions {
	/// Fractional haircut on every non-native fill.
	pub bridge_slippage: Decimal,
	pub allow_fallback: bool,
	/// Largest relative rate shortfall a fallback may have.
	pub max_fallback_slippage: Decimal,
	pub run_limit: usize,
	/// Gas price in wei.
	pub gas_price: Amount,
	pub protocol_fee_multiplier: Amount,
	/// Source fees in wei.
	pub fee_schedule: CostSchedule,
	/// Source gas usage in gas units.
	pub gas_schedule: CostSchedule,
	pub exchange_proxy_overhead: ExchangeProxyOverhead,
}

impl Default for OptimizerOptions {
	fn default() -> Self {
		Self {
			bridge_slippage: Decimal::new(5, 3),
			allow_fallback: true,
			max_fallback_slippage: Decimal::new(5, 2),
			run_limit: DEFAULT_RUN_LIMIT,
			gas_price: Decimal::ZERO,
			protocol_fee_multiplier: Decimal::from(DEFAULT_PROTOCOL_FEE_MULTIPLIER),
			fee_schedule: CostSchedule::new(),
			gas_schedule: CostSchedule::new(),
			exchange_proxy_overhead: ExchangeProxyOverhead::zero(),
		}
	}
}

/// The primary path and, when one qualifies, its fallback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedPaths {
	pub path: Path,
	pub fallback: Option<Path>,
}

/// Runs fill construction, path search and fallback construction over one
/// liquidity snapshot.
pub fn optimize(
	liquidity: &MarketSideLiquidity,
	options: &OptimizerOptions,
) -> Result<OptimizedPaths, RouterError> {
	let side = liquidity.side;
	let allowed = liquidity.allowed_sources;

	let native_orders = if allowed.contains(Source::Native) {
		liquidity.candidate_orders()
	} else {
		Vec::new()
	};
	let dex_quotes: Vec<_> = liquidity
		.dex_quotes
		.iter()
		.filter(|series| series.first().is_some_and(|s| allowed.contains(s.source)))
		.cloned()
		.collect();
	let two_hop_quotes = if allowed.contains(Source::MultiHop) {
		liquidity.two_hop_quotes.as_slice()
	} else {
		&[]
	};

	let costs = FillCosts {
		eth_to_output_rate: liquidity.eth_to_output_rate,
		gas_price: options.gas_price,
		protocol_fee_multiplier: options.protocol_fee_multiplier,
		fee_schedule: &options.fee_schedule,
		gas_schedule: &options.gas_schedule,
	};
	let mut fills = build_fills(
		side,
		&native_orders,
		&dex_quotes,
		two_hop_quotes,
		liquidity.input_amount,
		&costs,
	);
	apply_bridge_slippage(side, &mut fills, options.bridge_slippage);
	debug!(
		side = %side,
		sequences = fills.len(),
		fills = fills.iter().map(Vec::len).sum::<usize>(),
		"Built fills"
	);

	let overhead = |flags: SourceFlags| {
		options.exchange_proxy_overhead.cost(flags) * liquidity.eth_to_output_rate
	};
	let path = find_best_path(
		side,
		&fills,
		liquidity.input_amount,
		overhead,
		options.run_limit,
	)?;

	let fallback = if options.allow_fallback {
		build_fallback(
			&path,
			&fills,
			liquidity.input_amount,
			options.max_fallback_slippage,
			overhead,
			options.run_limit,
		)
	} else {
		None
	};

	info!(
		side = %side,
		sources = ?path.sources(),
		output = %path.output,
		adjusted_output = %path.adjusted_output,
		fallback = fallback.is_some(),
		"Optimized path"
	);
	Ok(OptimizedPaths { path, fallback })
}
