//! Serde helpers for amounts written as decimal ether strings.

/// `U256` wei <-> `"0.009"`.
pub mod ether {
	use alloy::primitives::utils::{format_ether, parse_ether};
	use bumper_types::U256;
	use serde::{de, Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format_ether(*value))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;
		parse_ether(raw.trim())
			.map_err(|e| de::Error::custom(format!("Invalid ether amount '{}': {}", raw, e)))
	}
}
