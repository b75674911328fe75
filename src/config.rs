use crate::{
    amount::parse_ether,
    chain::Address,
    game::GameConfig,
    wallets::{
        self,
        WalletConnector,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

pub const DEFAULT_CONFIG_PATH: &str = "~/.flowfun/config.json";
pub const DEFAULT_LOG_DIR: &str = "~/.flowfun/logs";
pub const FLOW_EVM_CHAIN_ID: u64 = 747;
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xc97a8e7Fe83d3941a10D5f791F5cf3E6Ef88f57c";
pub const DEFAULT_MIN_BET: &str = "0.001";
pub const DEFAULT_CURRENCY: &str = "FLOW";
const CLI_RPC_CONNECTOR: &str = "Command-line RPC";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub required_chain_id: u64,
    pub contract_address: String,
    pub min_bet: String,
    pub currency_symbol: String,
    pub connectors: Vec<WalletConnector>,
    pub connector_allow_list: Vec<String>,
    pub refresh_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            required_chain_id: FLOW_EVM_CHAIN_ID,
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            min_bet: DEFAULT_MIN_BET.to_string(),
            currency_symbol: DEFAULT_CURRENCY.to_string(),
            connectors: wallets::default_connectors(),
            connector_allow_list: wallets::default_allow_list(),
            refresh_interval_secs: 4,
        }
    }
}

/// Command-line values that win over the settings file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub rpc_url: Option<String>,
    pub contract: Option<String>,
    pub chain_id: Option<u64>,
}

impl Settings {
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(url) = &overrides.rpc_url {
            self.connectors
                .retain(|connector| connector.name != CLI_RPC_CONNECTOR);
            self.connectors
                .insert(0, WalletConnector::rpc(CLI_RPC_CONNECTOR, url.clone()));
            let needle = CLI_RPC_CONNECTOR.to_lowercase();
            if !self.connector_allow_list.contains(&needle) {
                self.connector_allow_list.push(needle);
            }
        }
        if let Some(contract) = &overrides.contract {
            self.contract_address = contract.clone();
        }
        if let Some(chain_id) = overrides.chain_id {
            self.required_chain_id = chain_id;
        }
    }

    pub fn game_config(&self) -> Result<GameConfig> {
        let contract: Address = self
            .contract_address
            .parse()
            .map_err(|e| eyre!("Invalid contract address '{}': {e}", self.contract_address))?;
        let min_bet = parse_ether(&self.min_bet)
            .map_err(|e| eyre!("Invalid minimum bet '{}': {e}", self.min_bet))?;
        Ok(GameConfig {
            required_chain_id: self.required_chain_id,
            contract,
            min_bet,
            currency_symbol: self.currency_symbol.clone(),
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

pub fn resolve_path(raw: Option<&str>, default: &str) -> PathBuf {
    let raw = raw.unwrap_or(default);
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Opens the settings file at `path`, writing defaults if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_store(&path)?;
        Ok(Self { path })
    }

    pub fn load(&self) -> Result<Settings> {
        let data = fs::read(&self.path)
            .wrap_err_with(|| format!("Failed to read settings {}", self.path.display()))?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Settings::default());
        }
        serde_json::from_slice(&data)
            .wrap_err_with(|| format!("Failed to parse settings {}", self.path.display()))
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        write_settings(&self.path, settings)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn ensure_store(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).wrap_err_with(|| {
            format!("Failed to create settings directory {}", parent.display())
        })?;
    }
    if !path.exists() {
        write_settings(path, &Settings::default())
            .wrap_err("Failed to initialize settings file")?;
    }
    Ok(())
}

fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    let json =
        serde_json::to_vec_pretty(settings).wrap_err("Failed to serialize settings")?;
    fs::write(path, json)
        .wrap_err_with(|| format!("Failed to write settings {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn open__creates_default_settings_file() {
        // given
        let dir = TempDir::new("flowfun-config").unwrap();
        let path = dir.path().join("nested").join("config.json");

        // when
        let store = SettingsStore::open(&path).unwrap();

        // then
        assert!(path.exists());
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn load__fills_missing_fields_with_defaults() {
        // given
        let dir = TempDir::new("flowfun-config").unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"required_chain_id": 545, "min_bet": "0.01"}"#).unwrap();

        // when
        let settings = SettingsStore::open(&path).unwrap().load().unwrap();

        // then
        assert_eq!(settings.required_chain_id, 545);
        assert_eq!(settings.min_bet, "0.01");
        assert_eq!(settings.currency_symbol, DEFAULT_CURRENCY);
        assert_eq!(settings.connectors, wallets::default_connectors());
    }

    #[test]
    fn apply_overrides__cli_values_win() {
        // given
        let mut settings = Settings::default();
        let overrides = Overrides {
            rpc_url: Some("http://localhost:8545".to_string()),
            contract: Some(format!("0x{}", "ab".repeat(20))),
            chain_id: Some(31337),
        };

        // when
        settings.apply_overrides(&overrides);
        let config = settings.game_config().unwrap();

        // then
        assert_eq!(config.required_chain_id, 31337);
        assert_eq!(config.contract, Address([0xab; 20]));
        assert_eq!(settings.connectors[0].name, CLI_RPC_CONNECTOR);
        let allowed =
            wallets::allowed_connectors(&settings.connectors, &settings.connector_allow_list);
        assert!(allowed.iter().any(|c| c.name == CLI_RPC_CONNECTOR));
    }

    #[test]
    fn game_config__rejects_bad_contract_address() {
        let settings = Settings {
            contract_address: "0x1234".to_string(),
            ..Settings::default()
        };
        assert!(settings.game_config().is_err());
    }

    #[test]
    fn game_config__parses_min_bet_to_wei() {
        let config = Settings::default().game_config().unwrap();
        assert_eq!(config.min_bet, 1_000_000_000_000_000);
    }
}
