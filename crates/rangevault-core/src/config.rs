use std::fs;

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_BPS, MAX_DEPOSIT_FEE_BPS};
use crate::errors::{VaultError, VaultResult};
use crate::types::Address;

/// Deployment settings loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Vault wiring, fees and limits
    pub vault: VaultConfig,

    /// Reward distributor wiring
    pub rewards: DistributorConfig,
}

/// Configuration for a single vault
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VaultConfig {
    /// Vault name for logging
    pub name: String,

    /// Account that holds the vault's assets
    pub vault: Address,

    /// Deposit and withdrawal asset
    pub base_token: Address,

    /// Main pool token0
    pub token0: Address,

    /// Main pool token1
    pub token1: Address,

    /// Pool the vault provides liquidity to
    pub main_pool: Address,

    /// Pool bridging the base asset to token0; absent when token0 is the base asset
    #[serde(default)]
    pub token0_route: Option<Address>,

    /// Pool bridging the base asset to token1; absent when token1 is the base asset
    #[serde(default)]
    pub token1_route: Option<Address>,

    /// Price feed quoting the base asset in token1
    pub oracle: Address,

    /// Fee configuration
    pub fees: FeeConfig,

    /// Limit configuration
    pub limits: LimitConfig,
}

/// Deposit fee and reward routing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeeConfig {
    /// Deposit fee (basis points, capped at 10%)
    pub deposit_fee_bps: u32,

    /// Receives deposit fees
    pub fee_receiver: Address,

    /// Share of harvested fees moved to the reward escrow (basis points)
    pub reward_bps: u32,

    /// Only account allowed to pull the reward escrow
    pub reward_receiver: Address,
}

/// Slippage, deposit and price limits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LimitConfig {
    /// Slippage tolerance for every swap (basis points)
    pub slippage_bps: u32,

    /// Minimum deposit in raw base-asset units
    pub min_deposit: u64,

    /// Allowed oracle/pool disagreement when the base asset is token0 (basis points)
    pub max_price_deviation_bps: u32,
}

/// Configuration for the reward distributor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DistributorConfig {
    /// Account that holds undistributed and claimable rewards
    pub address: Address,

    /// Reward asset (the vaults' base asset)
    pub base_token: Address,

    /// Receives the fixed receiver share of every distribution
    pub receiver: Address,

    /// Receiver share (basis points)
    pub receiver_bps: u32,
}

impl Settings {
    /// Load settings from TOML file
    pub fn load(path: &str) -> VaultResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| VaultError::Config(format!("Failed to read config file {}: {}", path, e)))?;

        Self::from_toml_str(&content)
            .map_err(|e| VaultError::Config(format!("{}: {}", path, e)))
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(content: &str) -> VaultResult<Self> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| VaultError::Config(format!("Failed to parse config: {}", e)))?;

        settings.validate()?;

        Ok(settings)
    }

    /// Save settings to TOML file
    pub fn save(&self, path: &str) -> VaultResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VaultError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)
            .map_err(|e| VaultError::Config(format!("Failed to write config file {}: {}", path, e)))?;
        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> VaultResult<()> {
        self.vault.validate()?;
        self.rewards.validate()?;

        if self.rewards.base_token != self.vault.base_token {
            return Err(VaultError::invalid_parameter(
                "rewards.base_token",
                &self.rewards.base_token.to_string(),
                &format!("vault base token ({})", self.vault.base_token),
            ));
        }

        Ok(())
    }
}

fn require_non_zero(name: &str, address: &Address) -> VaultResult<()> {
    if address.is_zero() {
        return Err(VaultError::invalid_parameter(name, "0x0", "non-zero address"));
    }
    Ok(())
}

fn require_bps(name: &str, bps: u32, max: u32) -> VaultResult<()> {
    if bps > max {
        return Err(VaultError::invalid_parameter(
            name,
            &bps.to_string(),
            &format!("at most {}", max),
        ));
    }
    Ok(())
}

impl VaultConfig {
    /// Validate vault configuration
    pub fn validate(&self) -> VaultResult<()> {
        if self.name.is_empty() {
            return Err(VaultError::invalid_parameter("name", "empty", "non-empty string"));
        }

        require_non_zero("vault", &self.vault)?;
        require_non_zero("base_token", &self.base_token)?;
        require_non_zero("token0", &self.token0)?;
        require_non_zero("token1", &self.token1)?;
        require_non_zero("main_pool", &self.main_pool)?;
        require_non_zero("oracle", &self.oracle)?;

        if self.token0 == self.token1 {
            return Err(VaultError::invalid_parameter(
                "token1",
                &self.token1.to_string(),
                "different from token0",
            ));
        }

        Self::validate_route("token0_route", self.token0_route, self.token0 == self.base_token)?;
        Self::validate_route("token1_route", self.token1_route, self.token1 == self.base_token)?;

        self.fees.validate()?;
        self.limits.validate()?;

        Ok(())
    }

    fn validate_route(name: &str, route: Option<Address>, leg_is_base: bool) -> VaultResult<()> {
        match (route, leg_is_base) {
            (Some(pool), false) => require_non_zero(name, &pool),
            (None, true) => Ok(()),
            (Some(_), true) => Err(VaultError::invalid_parameter(
                name,
                "set",
                "absent when the leg is the base asset",
            )),
            (None, false) => Err(VaultError::invalid_parameter(
                name,
                "absent",
                "a pool bridging the base asset to the leg",
            )),
        }
    }
}

impl FeeConfig {
    /// Validate fee configuration
    pub fn validate(&self) -> VaultResult<()> {
        require_bps("deposit_fee_bps", self.deposit_fee_bps, MAX_DEPOSIT_FEE_BPS)?;
        require_bps("reward_bps", self.reward_bps, MAX_BPS)?;
        require_non_zero("fee_receiver", &self.fee_receiver)?;
        require_non_zero("reward_receiver", &self.reward_receiver)?;
        Ok(())
    }
}

impl LimitConfig {
    /// Validate limit configuration
    pub fn validate(&self) -> VaultResult<()> {
        require_bps("slippage_bps", self.slippage_bps, MAX_BPS)?;
        require_bps("max_price_deviation_bps", self.max_price_deviation_bps, MAX_BPS)?;
        Ok(())
    }
}

impl DistributorConfig {
    /// Validate distributor configuration
    pub fn validate(&self) -> VaultResult<()> {
        require_non_zero("rewards.address", &self.address)?;
        require_non_zero("rewards.base_token", &self.base_token)?;
        require_non_zero("rewards.receiver", &self.receiver)?;
        require_bps("rewards.receiver_bps", self.receiver_bps, MAX_BPS)?;
        Ok(())
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            deposit_fee_bps: 0,
            fee_receiver: Address::from_low_u64(0xfee),
            reward_bps: MAX_BPS,
            reward_receiver: Address::from_low_u64(0xd157),
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 100,          // 1%
            min_deposit: 1_000_000,
            max_price_deviation_bps: 500, // 5%
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            name: "base-weth-wbtc".to_string(),
            vault: Address::from_low_u64(0x1000),
            base_token: Address::from_low_u64(0xba5e),
            token0: Address::from_low_u64(0x7070),
            token1: Address::from_low_u64(0x7171),
            main_pool: Address::from_low_u64(0x9001),
            token0_route: Some(Address::from_low_u64(0x9002)),
            token1_route: Some(Address::from_low_u64(0x9003)),
            oracle: Address::from_low_u64(0x0c1e),
            fees: FeeConfig::default(),
            limits: LimitConfig::default(),
        }
    }
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            address: Address::from_low_u64(0xd157),
            base_token: Address::from_low_u64(0xba5e),
            receiver: Address::from_low_u64(0x7ec),
            receiver_bps: 3_000, // 30%
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault: VaultConfig::default(),
            rewards: DistributorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = include_str!("../../../config/vault.example.toml");

    #[test]
    fn test_default_settings_validate() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_example_file_parses() {
        let settings = Settings::from_toml_str(EXAMPLE).unwrap();
        assert_eq!(settings.vault.fees.deposit_fee_bps, 50);
        assert_eq!(settings.rewards.receiver_bps, 3_000);
        assert!(settings.vault.token1_route.is_some());
    }

    #[test]
    fn test_toml_round_trip() {
        let settings = Settings::default();
        let text = toml::to_string_pretty(&settings).unwrap();
        assert_eq!(Settings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_fee_cap() {
        let mut config = VaultConfig::default();
        config.fees.deposit_fee_bps = MAX_DEPOSIT_FEE_BPS;
        assert!(config.validate().is_ok());

        config.fees.deposit_fee_bps = MAX_DEPOSIT_FEE_BPS + 1;
        assert!(matches!(config.validate(), Err(VaultError::InvalidInput(_))));
    }

    #[test]
    fn test_route_must_match_base_leg() {
        let mut config = VaultConfig::default();
        config.token1_route = None;
        assert!(config.validate().is_err());

        config.base_token = config.token1;
        assert!(config.validate().is_ok());

        config.token1_route = Some(Address::from_low_u64(0x9003));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_address_rejected() {
        let mut config = VaultConfig::default();
        config.oracle = Address::ZERO;
        assert!(matches!(config.validate(), Err(VaultError::InvalidInput(_))));
    }

    #[test]
    fn test_mismatched_reward_token() {
        let mut settings = Settings::default();
        settings.rewards.base_token = Address::from_low_u64(0x1234);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Settings::load("/nonexistent/vault.toml"),
            Err(VaultError::Config(_))
        ));
    }
}
