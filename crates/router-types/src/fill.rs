//! Fills, the unit of liquidity the optimizer consumes, and paths built from
//! them.

use crate::{Amount, FillData, Side, Source, SourceFlags};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A discrete, consumable slice of one source's liquidity.
///
/// Fills of one source form an ordered sequence: fill `i` can only be used
/// once fills `0..i` are used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
	pub source: Source,
	/// Amount on the targeted side (sold on a sell, bought on a buy).
	pub input: Amount,
	/// Amount on the other side (proceeds on a sell, cost on a buy).
	pub output: Amount,
	/// Fixed cost of using this fill, in output units.
	pub penalty: Amount,
	/// Gas units attributed to this fill.
	pub gas_cost: Amount,
	/// Protocol and source fees attributed to this fill, in wei.
	pub protocol_fee_cost: Amount,
	/// Position within its source sequence.
	pub index: usize,
	pub fill_data: FillData,
}

impl Fill {
	pub fn is_native(&self) -> bool {
		self.source == Source::Native
	}

	/// Output after the fill's penalty.
	pub fn adjusted_output(&self, side: Side) -> Amount {
		side.apply_penalty(self.output, self.penalty)
	}

	/// Output per unit of input after the penalty.
	pub fn adjusted_rate(&self, side: Side) -> Amount {
		if self.input.is_zero() {
			return Decimal::ZERO;
		}
		self.adjusted_output(side) / self.input
	}

	/// Raw output of consuming `input` of this fill.
	pub fn interpolated_output(&self, input: Amount) -> Amount {
		if input >= self.input {
			return self.output;
		}
		if self.input.is_zero() {
			return Decimal::ZERO;
		}
		self.output * (input / self.input)
	}

	/// A copy of this fill cut down to `input`.
	pub fn clipped(&self, input: Amount) -> Fill {
		let mut fill = self.clone();
		if input < self.input {
			fill.output = self.interpolated_output(input);
			fill.input = input;
		}
		fill
	}
}

/// An ordered selection of fills covering a requested amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Path {
	pub side: Side,
	pub fills: Vec<Fill>,
	/// Total input consumed.
	pub input: Amount,
	/// Total raw output.
	pub output: Amount,
	/// Settlement overhead for the path's source combination, in output units.
	pub overhead: Amount,
	/// Output after fill penalties and overhead.
	pub adjusted_output: Amount,
	pub flags: SourceFlags,
}

impl Path {
	/// The path that uses no liquidity.
	pub fn empty(side: Side) -> Self {
		Self {
			side,
			fills: Vec::new(),
			input: Decimal::ZERO,
			output: Decimal::ZERO,
			overhead: Decimal::ZERO,
			adjusted_output: Decimal::ZERO,
			flags: SourceFlags::empty(),
		}
	}

	/// Builds a path from fills, computing its totals.
	pub fn from_fills(side: Side, fills: Vec<Fill>, overhead: Amount) -> Self {
		let input = fills.iter().map(|f| f.input).sum();
		let output = fills.iter().map(|f| f.output).sum();
		let penalties: Amount = fills.iter().map(|f| f.penalty).sum();
		let flags = fills.iter().map(|f| f.source).collect();
		let adjusted_output = side.apply_penalty(output, penalties + overhead);
		Self {
			side,
			fills,
			input,
			output,
			overhead,
			adjusted_output,
			flags,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.fills.is_empty()
	}

	pub fn sources(&self) -> Vec<Source> {
		self.flags.sources()
	}

	/// Net output per unit of input.
	pub fn adjusted_rate(&self) -> Amount {
		if self.input.is_zero() {
			return Decimal::ZERO;
		}
		self.adjusted_output / self.input
	}

	/// Relative shortfall of `other`'s adjusted rate against this path's.
	///
	/// Positive when `other` is worse, for either side.
	pub fn rate_slippage(&self, other: &Path) -> Amount {
		let reference = self.adjusted_rate();
		if reference.is_zero() {
			return Decimal::ZERO;
		}
		let candidate = other.adjusted_rate();
		match self.side {
			Side::Sell => (reference - candidate) / reference,
			Side::Buy => (candidate - reference) / reference,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn fill(source: Source, input: i64, output: i64, penalty: i64) -> Fill {
		Fill {
			source,
			input: Decimal::from(input),
			output: Decimal::from(output),
			penalty: Decimal::from(penalty),
			gas_cost: Decimal::ZERO,
			protocol_fee_cost: Decimal::ZERO,
			index: 0,
			fill_data: FillData::Empty,
		}
	}

	#[test]
	fn test_clipping_keeps_full_penalty() {
		let f = fill(Source::Uniswap, 100, 50, 5);
		let half = f.clipped(Decimal::from(50));
		assert_eq!(half.adjusted_output(Side::Sell), Decimal::from(20));
		assert_eq!(half.adjusted_output(Side::Buy), Decimal::from(30));
		let clipped = f.clipped(Decimal::from(10));
		assert_eq!(clipped.input, Decimal::from(10));
		assert_eq!(clipped.output, Decimal::from(5));
		assert_eq!(clipped.penalty, Decimal::from(5));
	}

	#[test]
	fn test_path_totals() {
		let path = Path::from_fills(
			Side::Sell,
			vec![
				fill(Source::Uniswap, 10, 9, 1),
				fill(Source::Native, 10, 10, 2),
			],
			Decimal::ONE,
		);
		assert_eq!(path.input, Decimal::from(20));
		assert_eq!(path.output, Decimal::from(19));
		assert_eq!(path.adjusted_output, Decimal::from(15));
		assert_eq!(path.flags.count(), 2);
	}

	#[test]
	fn test_rate_slippage() {
		let primary = Path::from_fills(
			Side::Sell,
			vec![fill(Source::Native, 100, 100, 0)],
			Decimal::ZERO,
		);
		let fallback = Path::from_fills(
			Side::Sell,
			vec![fill(Source::Eth2Dai, 100, 49, 0)],
			Decimal::ZERO,
		);
		assert_eq!(primary.rate_slippage(&fallback), Decimal::new(51, 2));
	}
}
