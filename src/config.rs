use ethers::types::Address;
use std::str::FromStr;
use thiserror::Error;

/// Whitelist contract deployment the dApp talks to unless overridden at build time
pub const WHITELIST_CONTRACT_ADDRESS: &str = "0x31D4A708962291e9fd61e5B04607D79B26507ce6";
pub const GOERLI_CHAIN_ID: u64 = 5;
pub const GOERLI_NETWORK_NAME: &str = "Goerli";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid whitelist contract address {0:?}")]
    InvalidAddress(String),

    #[error("Invalid chain id {0:?}")]
    InvalidChainId(String),
}

/// Build-time configuration of the dApp
#[derive(Clone, Debug, PartialEq)]
pub struct WhitelistConfig {
    pub contract_address: Address,
    pub chain_id: u64,
    pub network_name: String,
}

impl WhitelistConfig {
    /// Reads `WHITELIST_CONTRACT_ADDRESS`, `WHITELIST_CHAIN_ID` and `WHITELIST_NETWORK_NAME`
    /// from the build environment, falling back to the Goerli deployment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(
            option_env!("WHITELIST_CONTRACT_ADDRESS"),
            option_env!("WHITELIST_CHAIN_ID"),
            option_env!("WHITELIST_NETWORK_NAME"),
        )
    }

    pub fn parse(
        contract_address: Option<&str>,
        chain_id: Option<&str>,
        network_name: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let address = contract_address.unwrap_or(WHITELIST_CONTRACT_ADDRESS).trim();
        let contract_address = Address::from_str(address)
            .map_err(|_| ConfigError::InvalidAddress(address.to_string()))?;

        let chain_id = match chain_id.map(str::trim) {
            None => GOERLI_CHAIN_ID,
            Some(id) => parse_chain_id(id).ok_or_else(|| ConfigError::InvalidChainId(id.to_string()))?,
        };

        let network_name = network_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(GOERLI_NETWORK_NAME)
            .to_string();

        Ok(Self { contract_address, chain_id, network_name })
    }

    /// Message shown to the user when the wallet sits on another chain
    pub fn wrong_network_message(&self) -> String {
        format!("Change the network to {}", self.network_name)
    }
}

/// Accepts decimal (`5`) and hex (`0x5`) chain ids
fn parse_chain_id(id: &str) -> Option<u64> {
    match id.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => id.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_goerli_deployment() {
        let config = WhitelistConfig::parse(None, None, None).unwrap();
        assert_eq!(
            config.contract_address,
            Address::from_str(WHITELIST_CONTRACT_ADDRESS).unwrap()
        );
        assert_eq!(config.chain_id, 5);
        assert_eq!(config.wrong_network_message(), "Change the network to Goerli");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = WhitelistConfig::parse(
            Some("0x0000000000000000000000000000000000000042"),
            Some("0xaa36a7"),
            Some("Sepolia"),
        )
        .unwrap();
        assert_eq!(config.contract_address, Address::from_low_u64_be(0x42));
        assert_eq!(config.chain_id, 11155111);
        assert_eq!(config.network_name, "Sepolia");

        let config = WhitelistConfig::parse(None, Some("31337"), Some("  ")).unwrap();
        assert_eq!(config.chain_id, 31337);
        assert_eq!(config.network_name, "Goerli");
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert_eq!(
            WhitelistConfig::parse(Some("0x1234"), None, None),
            Err(ConfigError::InvalidAddress("0x1234".to_string()))
        );
        assert_eq!(
            WhitelistConfig::parse(None, Some("goerli"), None),
            Err(ConfigError::InvalidChainId("goerli".to_string()))
        );
    }
}
