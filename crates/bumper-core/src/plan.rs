use bumper_types::U256;

/// How many swaps and batches a processing order is expected to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
	pub total_bumps: u64,
	pub total_batches: u32,
}

/// `total_batches = ceil(floor(remaining / bump_amount) / batch_size)`.
pub fn plan_batches(remaining: U256, bump_amount: U256, batch_size: usize) -> BatchPlan {
	if bump_amount.is_zero() || batch_size == 0 {
		return BatchPlan {
			total_bumps: 0,
			total_batches: 0,
		};
	}

	let total_bumps: u64 = (remaining / bump_amount).saturating_to();
	let total_batches = total_bumps.div_ceil(batch_size as u64);

	BatchPlan {
		total_bumps,
		total_batches: u32::try_from(total_batches).unwrap_or(u32::MAX),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::utils::parse_ether;

	fn eth(value: &str) -> U256 {
		parse_ether(value).unwrap()
	}

	#[test]
	fn test_exact_multiple() {
		let plan = plan_batches(eth("0.41"), eth("0.02"), 5);
		assert_eq!(plan.total_bumps, 20);
		assert_eq!(plan.total_batches, 4);
	}

	#[test]
	fn test_partial_last_batch_rounds_up() {
		let plan = plan_batches(eth("0.011"), eth("0.002"), 5);
		assert_eq!(plan.total_bumps, 5);
		assert_eq!(plan.total_batches, 1);

		let plan = plan_batches(eth("0.25"), eth("0.02"), 5);
		assert_eq!(plan.total_bumps, 12);
		assert_eq!(plan.total_batches, 3);
	}

	#[test]
	fn test_below_one_bump() {
		let plan = plan_batches(eth("0.011"), eth("0.02"), 5);
		assert_eq!(plan, BatchPlan { total_bumps: 0, total_batches: 0 });
	}
}
