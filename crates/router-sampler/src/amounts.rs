//! Fill sizes at which sources are sampled.

use router_types::{Amount, Decimal};

/// Splits `max` into `count` cumulative sample amounts.
///
/// Step `i` has weight `base^i`, so `base > 1` concentrates samples near
/// zero relative to the large end and `base = 1` spaces them evenly. Amounts
/// are rounded up to whole base units and the last amount is `max` exactly.
pub fn sample_amounts(max: Amount, count: usize, base: Decimal) -> Vec<Amount> {
	if count == 0 {
		return Vec::new();
	}

	let mut weights = Vec::with_capacity(count);
	let mut weight = Decimal::ONE;
	for _ in 0..count {
		weights.push(weight);
		weight = weight.checked_mul(base).unwrap_or(Decimal::MAX);
	}
	let total: Decimal = weights.iter().copied().sum();

	let mut amounts = Vec::with_capacity(count);
	let mut cumulative = Decimal::ZERO;
	for (i, weight) in weights.iter().enumerate() {
		if i == count - 1 {
			amounts.push(max);
			break;
		}
		cumulative += *weight / total;
		amounts.push((max * cumulative).ceil().min(max));
	}
	amounts
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_linear_spacing() {
		let amounts = sample_amounts(Decimal::from(100), 4, Decimal::ONE);
		assert_eq!(
			amounts,
			vec![
				Decimal::from(25),
				Decimal::from(50),
				Decimal::from(75),
				Decimal::from(100)
			]
		);
	}

	#[test]
	fn test_geometric_spacing_rounds_up() {
		let amounts = sample_amounts(Decimal::from(100), 3, Decimal::from(2));
		// Weights 1, 2, 4 of 7.
		assert_eq!(
			amounts,
			vec![Decimal::from(15), Decimal::from(43), Decimal::from(100)]
		);
	}

	#[test]
	fn test_degenerate_counts() {
		assert!(sample_amounts(Decimal::from(100), 0, Decimal::ONE).is_empty());
		assert_eq!(
			sample_amounts(Decimal::from(100), 1, Decimal::from(3)),
			vec![Decimal::from(100)]
		);
	}

	#[test]
	fn test_amounts_are_non_decreasing() {
		let amounts = sample_amounts(Decimal::from(1_000_000), 13, Decimal::new(105, 2));
		assert_eq!(amounts.len(), 13);
		assert!(amounts.windows(2).all(|w| w[0] <= w[1]));
		assert_eq!(amounts[12], Decimal::from(1_000_000));
	}
}
