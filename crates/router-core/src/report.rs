//! What a routing request selected, for observability.

use router_types::{Amount, Path, Source};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteReport {
	/// Sources of the primary path.
	pub sources: Vec<Source>,
	/// Number of fills taken from each source of the primary path.
	pub fill_counts: BTreeMap<Source, usize>,
	pub fallback_sources: Vec<Source>,
	/// Optimizer invocations, one or two.
	pub optimizer_runs: usize,
	/// True when the final path was found with quotes in the liquidity.
	pub quote_enriched: bool,
	pub quotes_received: usize,
	/// Price handed to counterparties, when one was computed.
	pub comparison_price: Option<Amount>,
}

impl QuoteReport {
	pub fn new(path: &Path, fallback: Option<&Path>) -> Self {
		let mut fill_counts = BTreeMap::new();
		for fill in &path.fills {
			*fill_counts.entry(fill.source).or_insert(0) += 1;
		}
		Self {
			sources: path.sources(),
			fill_counts,
			fallback_sources: fallback.map(Path::sources).unwrap_or_default(),
			optimizer_runs: 0,
			quote_enriched: false,
			quotes_received: 0,
			comparison_price: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use router_types::{Decimal, Fill, FillData, Side};

	fn fill(source: Source) -> Fill {
		Fill {
			source,
			input: Decimal::ONE,
			output: Decimal::ONE,
			penalty: Decimal::ZERO,
			gas_cost: Decimal::ZERO,
			protocol_fee_cost: Decimal::ZERO,
			index: 0,
			fill_data: FillData::Empty,
		}
	}

	#[test]
	fn test_counts_fills_per_source() {
		let path = Path::from_fills(
			Side::Sell,
			vec![fill(Source::Native), fill(Source::Uniswap), fill(Source::Native)],
			Decimal::ZERO,
		);
		let fallback = Path::from_fills(Side::Sell, vec![fill(Source::Kyber)], Decimal::ZERO);
		let report = QuoteReport::new(&path, Some(&fallback));
		assert_eq!(report.sources, vec![Source::Native, Source::Uniswap]);
		assert_eq!(report.fill_counts.get(&Source::Native), Some(&2));
		assert_eq!(report.fill_counts.get(&Source::Uniswap), Some(&1));
		assert_eq!(report.fallback_sources, vec![Source::Kyber]);
	}
}
