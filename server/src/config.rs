//! Server configuration read from the environment.

use std::env;
use std::net::{IpAddr, SocketAddr};

use flight_surety_ledger::{AccountId, Amount, LedgerConfig};
use rand::Rng;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_EVENT_BUFFER_SIZE: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub owner: AccountId,
    pub genesis_airline: AccountId,
    pub max_premium: Option<Amount>,
    pub enforce_reserves: bool,
    pub nonce: [u8; 32],
    pub cors_allowed_origins: Vec<String>,
    pub simulated_oracles: usize,
    pub event_buffer_size: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = parse_or(&var, "HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_or(&var, "PORT", DEFAULT_PORT)?;
        let owner = var("OWNER_ADDRESS")
            .map(|v| AccountId::new(v.trim()))
            .ok_or(ConfigError::Missing("OWNER_ADDRESS"))?;
        let genesis_airline = var("GENESIS_AIRLINE")
            .map(|v| AccountId::new(v.trim()))
            .ok_or(ConfigError::Missing("GENESIS_AIRLINE"))?;

        let max_premium = match var("MAX_INSURANCE_PREMIUM") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<Amount>()
                    .ok()
                    .filter(|cap| *cap > 0)
                    .ok_or_else(|| invalid("MAX_INSURANCE_PREMIUM", &raw))?,
            ),
            None => None,
        };

        let enforce_reserves = parse_or(&var, "ENFORCE_RESERVES", false)?;

        let nonce = match var("LEDGER_NONCE") {
            Some(raw) => parse_nonce(&raw)?,
            None => rand::thread_rng().gen(),
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let simulated_oracles = parse_or(&var, "SIMULATED_ORACLES", 0usize)?;
        let event_buffer_size = parse_or(&var, "EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE)?;
        if event_buffer_size == 0 {
            return Err(invalid("EVENT_BUFFER_SIZE", "0"));
        }

        Ok(Self {
            host,
            port,
            owner,
            genesis_airline,
            max_premium,
            enforce_reserves,
            nonce,
            cors_allowed_origins,
            simulated_oracles,
            event_buffer_size,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        let mut config = LedgerConfig::new(self.owner.clone(), self.genesis_airline.clone())
            .with_nonce(self.nonce);
        if self.enforce_reserves {
            config = config.with_reserve_check();
        }
        match self.max_premium {
            Some(cap) => config.with_max_premium(cap),
            None => config,
        }
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

fn parse_or<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, &raw)),
        None => Ok(default),
    }
}

fn parse_nonce(raw: &str) -> Result<[u8; 32], ConfigError> {
    let trimmed = raw.trim().trim_start_matches("0x");
    let bytes = hex::decode(trimmed).map_err(|_| invalid("LEDGER_NONCE", raw))?;
    bytes
        .try_into()
        .map_err(|_| invalid("LEDGER_NONCE", raw))
}
