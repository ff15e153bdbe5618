//! Stellar network presets

use super::error::RpcError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TESTNET_HORIZON_URL: &str = "https://horizon-testnet.stellar.org/";
pub const MAINNET_HORIZON_URL: &str = "https://horizon.stellar.org/";
pub const FUTURENET_HORIZON_URL: &str = "https://horizon-futurenet.stellar.org/";

pub const TESTNET_SOROBAN_URL: &str = "https://soroban-testnet.stellar.org";
pub const MAINNET_SOROBAN_URL: &str = "https://mainnet.stellar.validationcloud.io/v1/soroban-rpc-demo";
pub const FUTURENET_SOROBAN_URL: &str = "https://rpc-futurenet.stellar.org";

pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const MAINNET_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const FUTURENET_PASSPHRASE: &str = "Test SDF Future Network ; October 2022";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Futurenet,
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Mainnet, Network::Testnet, Network::Futurenet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Futurenet => "futurenet",
        }
    }

    pub fn config(&self) -> NetworkConfig {
        match self {
            Network::Mainnet => NetworkConfig {
                name: "mainnet".to_string(),
                horizon_url: MAINNET_HORIZON_URL.to_string(),
                network_passphrase: MAINNET_PASSPHRASE.to_string(),
                soroban_rpc_url: MAINNET_SOROBAN_URL.to_string(),
            },
            Network::Testnet => NetworkConfig {
                name: "testnet".to_string(),
                horizon_url: TESTNET_HORIZON_URL.to_string(),
                network_passphrase: TESTNET_PASSPHRASE.to_string(),
                soroban_rpc_url: TESTNET_SOROBAN_URL.to_string(),
            },
            Network::Futurenet => NetworkConfig {
                name: "futurenet".to_string(),
                horizon_url: FUTURENET_HORIZON_URL.to_string(),
                network_passphrase: FUTURENET_PASSPHRASE.to_string(),
                soroban_rpc_url: FUTURENET_SOROBAN_URL.to_string(),
            },
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "mainnet" | "public" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "futurenet" => Ok(Network::Futurenet),
            other => Err(RpcError::InvalidConfig(format!(
                "unknown network '{}' (expected mainnet, testnet or futurenet)",
                other
            ))),
        }
    }
}

/// Endpoints and passphrase for one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub horizon_url: String,
    pub network_passphrase: String,
    #[serde(default)]
    pub soroban_rpc_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_network() {
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("MAINNET".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_presets() {
        let testnet = Network::Testnet.config();
        assert_eq!(testnet.network_passphrase, "Test SDF Network ; September 2015");
        assert_eq!(testnet.horizon_url, TESTNET_HORIZON_URL);

        let futurenet = Network::Futurenet.config();
        assert_eq!(futurenet.soroban_rpc_url, FUTURENET_SOROBAN_URL);
        assert_eq!(Network::default(), Network::Mainnet);
    }
}
