//! Schema validation for plugin configuration tables.
//!
//! Each implementation (delivery provider, exchange protocol, funding
//! contract, storage backend) declares a [`Schema`] for its TOML table so a
//! bad config is rejected before anything touches the chain.

use alloy::primitives::{utils::parse_ether, Address};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

impl ValidationError {
	fn prefixed(self, prefix: &str) -> Self {
		match self {
			Self::MissingField(f) => Self::MissingField(format!("{}.{}", prefix, f)),
			Self::InvalidValue { field, message } => Self::InvalidValue {
				field: format!("{}.{}", prefix, field),
				message,
			},
			Self::TypeMismatch {
				field,
				expected,
				actual,
			} => Self::TypeMismatch {
				field: format!("{}.{}", prefix, field),
				expected,
				actual,
			},
		}
	}
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// `0x`-prefixed 20 byte hex address.
	Address,
	/// Decimal ether amount such as `"0.02"`.
	EtherAmount,
	Array(Box<FieldType>),
	Table(Schema),
}

pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a check run after the type check passes.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		check_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of one TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| mismatch("root", "table", config))?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn mismatch(field: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
	ValidationError::InvalidValue {
		field: field.to_string(),
		message: message.into(),
	}
}

fn check_type(name: &str, value: &toml::Value, expected: &FieldType) -> Result<(), ValidationError> {
	match expected {
		FieldType::String => {
			value.as_str().ok_or_else(|| mismatch(name, "string", value))?;
		}
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(name, "integer", value))?;
			if let Some(min) = (*min).filter(|m| int_val < *m) {
				return Err(invalid(name, format!("Value {} is less than minimum {}", int_val, min)));
			}
			if let Some(max) = (*max).filter(|m| int_val > *m) {
				return Err(invalid(name, format!("Value {} is greater than maximum {}", int_val, max)));
			}
		}
		FieldType::Boolean => {
			value.as_bool().ok_or_else(|| mismatch(name, "boolean", value))?;
		}
		FieldType::Address => {
			let raw = value.as_str().ok_or_else(|| mismatch(name, "address", value))?;
			if !raw.starts_with("0x") || raw.parse::<Address>().is_err() {
				return Err(invalid(name, "must be a 0x-prefixed 20 byte hex address"));
			}
		}
		FieldType::EtherAmount => {
			let raw = value.as_str().ok_or_else(|| mismatch(name, "ether amount", value))?;
			parse_ether(raw).map_err(|e| invalid(name, format!("not an ether amount: {}", e)))?;
		}
		FieldType::Array(inner) => {
			let items = value.as_array().ok_or_else(|| mismatch(name, "array", value))?;
			for (i, item) in items.iter().enumerate() {
				check_type(&format!("{}[{}]", name, i), item, inner)?;
			}
		}
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| e.prefixed(name))?;
		}
	}

	Ok(())
}

/// Implemented by every pluggable component to describe its config table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> Schema {
		Schema::new(
			vec![
				Field::new("router", FieldType::Address),
				Field::new("fee_tier", FieldType::Integer { min: Some(1), max: Some(1_000_000) }),
			],
			vec![Field::new("amount", FieldType::EtherAmount)],
		)
	}

	#[test]
	fn test_valid_table() {
		let config: toml::Value = toml::from_str(
			r#"
router = "0xE592427A0AEce92De3Edee1F18E0157C05861564"
fee_tier = 3000
amount = "0.02"
"#,
		)
		.unwrap();
		assert!(schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_and_invalid_fields() {
		let missing: toml::Value = toml::from_str(r#"fee_tier = 3000"#).unwrap();
		assert_eq!(
			schema().validate(&missing),
			Err(ValidationError::MissingField("router".into()))
		);

		let bad_address: toml::Value =
			toml::from_str("router = \"0x1234\"\nfee_tier = 3000").unwrap();
		assert!(matches!(
			schema().validate(&bad_address),
			Err(ValidationError::InvalidValue { field, .. }) if field == "router"
		));

		let out_of_range: toml::Value = toml::from_str(
			"router = \"0xE592427A0AEce92De3Edee1F18E0157C05861564\"\nfee_tier = 0",
		)
		.unwrap();
		assert!(schema().validate(&out_of_range).is_err());
	}

	#[test]
	fn test_nested_table_errors_are_prefixed() {
		let outer = Schema::new(vec![Field::new("inner", FieldType::Table(schema()))], vec![]);
		let config: toml::Value = toml::from_str("[inner]\nfee_tier = 3000").unwrap();
		assert_eq!(
			outer.validate(&config),
			Err(ValidationError::MissingField("inner.router".into()))
		);
	}
}
