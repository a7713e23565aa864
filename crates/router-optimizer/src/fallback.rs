//! Secondary paths over sources the primary path leaves untouched.

use crate::path::find_best_path;
use router_types::{Amount, Fill, Path, SourceFlags};
use tracing::debug;

/// Builds a fallback path from sources disjoint from `primary`.
///
/// Returns `None` when no disjoint source can cover the target or when the
/// fallback's adjusted rate trails the primary's by more than
/// `max_fallback_slippage`.
pub fn build_fallback<F>(
	primary: &Path,
	fills: &[Vec<Fill>],
	target_input: Amount,
	max_fallback_slippage: Amount,
	overhead: F,
	run_limit: usize,
) -> Option<Path>
where
	F: Fn(SourceFlags) -> Amount,
{
	if primary.is_empty() {
		return None;
	}
	let disjoint: Vec<Vec<Fill>> = fills
		.iter()
		.filter(|group| {
			group
				.first()
				.is_some_and(|f| !primary.flags.contains(f.source))
		})
		.cloned()
		.collect();
	if disjoint.is_empty() {
		return None;
	}

	let fallback = match find_best_path(primary.side, &disjoint, target_input, overhead, run_limit) {
		Ok(path) if !path.is_empty() => path,
		Ok(_) => return None,
		Err(e) => {
			debug!(error = %e, "No fallback path");
			return None;
		}
	};

	let slippage = primary.rate_slippage(&fallback);
	if slippage > max_fallback_slippage {
		debug!(
			slippage = %slippage,
			max = %max_fallback_slippage,
			"Discarding fallback path"
		);
		return None;
	}
	Some(fallback)
}

#[cfg(test)]
mod tests {
	use super::*;
	use router_types::{FillData, Side, Source};
	use rust_decimal::Decimal;

	fn single(source: Source, input: i64, output: i64) -> Vec<Fill> {
		vec![Fill {
			source,
			input: Decimal::from(input),
			output: Decimal::from(output),
			penalty: Decimal::ZERO,
			gas_cost: Decimal::ZERO,
			protocol_fee_cost: Decimal::ZERO,
			index: 0,
			fill_data: FillData::Empty,
		}]
	}

	#[test]
	fn test_fallback_avoids_primary_sources() {
		let fills = vec![
			single(Source::Native, 100, 100),
			single(Source::Uniswap, 100, 95),
			single(Source::Eth2Dai, 100, 90),
		];
		let primary = find_best_path(Side::Sell, &fills, Decimal::from(100), |_| Decimal::ZERO, 64).unwrap();
		assert_eq!(primary.sources(), vec![Source::Native]);

		let fallback = build_fallback(
			&primary,
			&fills,
			Decimal::from(100),
			Decimal::ONE,
			|_| Decimal::ZERO,
			64,
		)
		.unwrap();
		assert_eq!(fallback.sources(), vec![Source::Uniswap]);
		assert!(fallback.flags.is_disjoint(primary.flags));
	}

	#[test]
	fn test_fallback_beyond_slippage_is_dropped() {
		let fills = vec![single(Source::Native, 100, 100), single(Source::Eth2Dai, 100, 49)];
		let primary = find_best_path(Side::Sell, &fills, Decimal::from(100), |_| Decimal::ZERO, 64).unwrap();
		let fallback = build_fallback(
			&primary,
			&fills,
			Decimal::from(100),
			Decimal::new(25, 2),
			|_| Decimal::ZERO,
			64,
		);
		assert!(fallback.is_none());
	}

	#[test]
	fn test_no_fallback_without_other_sources() {
		let fills = vec![single(Source::Native, 100, 100)];
		let primary = find_best_path(Side::Sell, &fills, Decimal::from(100), |_| Decimal::ZERO, 64).unwrap();
		assert!(build_fallback(&primary, &fills, Decimal::from(100), Decimal::ONE, |_| Decimal::ZERO, 64).is_none());
	}
}
