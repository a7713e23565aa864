//! The per-round liquidity snapshot handed to the optimizer.

use crate::{Address, Amount, NativeOrder, Quote, QuoteKind, Sample, Side, Source, SourceFlags};
use serde::{Deserialize, Serialize};

/// Everything known about one side of a market for one negotiation round.
///
/// A new snapshot is built for every round; quotes are folded in by
/// constructing a fresh value through [`MarketSideLiquidity::with_quotes`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSideLiquidity {
	pub side: Side,
	/// The amount the target applies to: sold amount on a sell, bought amount
	/// on a buy.
	pub input_amount: Amount,
	pub maker_token: Address,
	pub taker_token: Address,
	pub maker_token_decimals: u8,
	pub taker_token_decimals: u8,
	/// Output-token base units per wei.
	pub eth_to_output_rate: Amount,
	/// One sample series per source (or per discovered pool).
	pub dex_quotes: Vec<Vec<Sample>>,
	/// One full-amount sample per intermediate token.
	pub two_hop_quotes: Vec<Sample>,
	/// Resting orders, including accepted firm quotes.
	pub native_orders: Vec<NativeOrder>,
	/// Indicative quotes, priced like resting orders but never signed.
	pub indicative_quotes: Vec<Quote>,
	/// Firm quotes already folded into `native_orders`.
	pub firm_quotes: Vec<Quote>,
	pub allowed_sources: SourceFlags,
}

impl MarketSideLiquidity {
	/// A new snapshot with `quotes` added.
	///
	/// Firm quotes become fully fillable resting orders. Indicative quotes
	/// are kept apart but still compete as native liquidity.
	pub fn with_quotes(&self, quotes: &[Quote]) -> Self {
		let mut next = self.clone();
		for quote in quotes {
			match quote.kind {
				QuoteKind::Firm => {
					next.native_orders.push(quote.to_native_order());
					next.firm_quotes.push(quote.clone());
				}
				QuoteKind::Indicative => next.indicative_quotes.push(quote.clone()),
			}
		}
		if !quotes.is_empty() {
			next.allowed_sources.insert(Source::Native);
		}
		next
	}

	/// Resting orders plus indicative quotes, everything native fills are
	/// built from.
	pub fn candidate_orders(&self) -> Vec<NativeOrder> {
		self.native_orders
			.iter()
			.cloned()
			.chain(self.indicative_quotes.iter().map(Quote::to_native_order))
			.collect()
	}
}
