//! Disperse contract funding via `disperseEth`.

use crate::{FundingError, FundingInterface};
use alloy::sol;
use alloy::sol_types::SolCall;
use bumper_types::{Address, ConfigSchema, Field, FieldType, Schema, Transaction, ValidationError, U256};

sol! {
	interface IDisperse {
		function disperseEth(address[] recipients, uint256[] values) external payable;
	}
}

pub use IDisperse::disperseEthCall;

pub struct DisperseFunding {
	contract: Address,
	gas_limit: Option<u64>,
}

impl DisperseFunding {
	pub fn new(contract: Address, gas_limit: Option<u64>) -> Self {
		Self {
			contract,
			gas_limit,
		}
	}
}

pub struct DisperseSchema;

impl ConfigSchema for DisperseSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("contract", FieldType::Address)],
			vec![Field::new(
				"gas_limit",
				FieldType::Integer {
					min: Some(21_000),
					max: None,
				},
			)],
		);
		schema.validate(config)
	}
}

impl FundingInterface for DisperseFunding {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(DisperseSchema)
	}

	fn build_disperse(
		&self,
		recipients: &[Address],
		amounts: &[U256],
	) -> Result<Transaction, FundingError> {
		if recipients.is_empty() {
			return Err(FundingError::EmptyBatch);
		}
		if recipients.len() != amounts.len() {
			return Err(FundingError::Config(format!(
				"{} recipients but {} amounts",
				recipients.len(),
				amounts.len()
			)));
		}

		let total = amounts
			.iter()
			.try_fold(U256::ZERO, |acc, amount| acc.checked_add(*amount))
			.ok_or_else(|| FundingError::Config("Disperse total overflows".into()))?;

		let data = disperseEthCall {
			recipients: recipients.to_vec(),
			values: amounts.to_vec(),
		}
		.abi_encode();

		let tx = Transaction::call(self.contract, data, total);
		Ok(match self.gas_limit {
			Some(limit) => tx.with_gas_limit(limit),
			None => tx,
		})
	}
}

/// Required: `contract`. Optional: `gas_limit`; estimated by the node when
/// absent.
pub fn create_disperse_funding(
	config: &toml::Value,
) -> Result<Box<dyn FundingInterface>, FundingError> {
	DisperseSchema
		.validate(config)
		.map_err(|e| FundingError::Config(e.to_string()))?;

	let contract = config
		.get("contract")
		.and_then(|v| v.as_str())
		.ok_or_else(|| FundingError::Config("contract is required".into()))?
		.parse()
		.map_err(|e| FundingError::Config(format!("Invalid contract address: {}", e)))?;
	let gas_limit = config
		.get("gas_limit")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64);

	Ok(Box::new(DisperseFunding::new(contract, gas_limit)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_disperse_value_is_sum_of_amounts() {
		let funder = DisperseFunding::new(Address::repeat_byte(0xdd), None);
		let recipients: Vec<Address> = (1..=5u8).map(Address::repeat_byte).collect();
		let amounts = vec![U256::from(7u64); 5];

		let tx = funder.build_disperse(&recipients, &amounts).unwrap();
		assert_eq!(tx.to, Address::repeat_byte(0xdd));
		assert_eq!(tx.value, U256::from(35u64));
		assert_eq!(tx.gas_limit, None);

		let decoded = disperseEthCall::abi_decode(&tx.data).unwrap();
		assert_eq!(decoded.recipients, recipients);
		assert_eq!(decoded.values, amounts);
	}

	#[test]
	fn test_rejects_mismatched_arrays() {
		let funder = DisperseFunding::new(Address::ZERO, Some(500_000));
		let result = funder.build_disperse(&[Address::ZERO], &[]);
		assert!(matches!(result, Err(FundingError::Config(_))));
		assert!(matches!(
			funder.build_disperse(&[], &[]),
			Err(FundingError::EmptyBatch)
		));
	}

	#[test]
	fn test_factory_reads_gas_limit() {
		let config: toml::Value = toml::from_str(
			"contract = \"0xD152f549545093347A162Dce210e7293f1452150\"\ngas_limit = 250000",
		)
		.unwrap();
		let funder = create_disperse_funding(&config).unwrap();
		let tx = funder
			.build_disperse(&[Address::repeat_byte(1)], &[U256::from(1u64)])
			.unwrap();
		assert_eq!(tx.gas_limit, Some(250_000));
	}
}
