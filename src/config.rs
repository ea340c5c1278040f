//! Recognised configuration options (§6.3) and their effects.
//!
//! Loaded from an optional TOML file (`CRASH_ENGINE_CONFIG` env var, default
//! `./crash_engine.toml`) with every field overridable by an environment
//! variable of the same name upper-cased and prefixed `CRASH_ENGINE_`
//! (e.g. `CRASH_ENGINE_HOUSE_EDGE=0.03`). `.env` files are loaded first via
//! `dotenvy`, mirroring the teacher family's own local-dev conventions.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;

/// How many independent crash curves a round runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveMode {
    Single,
    Dual,
}

impl CurveMode {
    pub fn curve_count(self) -> u8 {
        match self {
            CurveMode::Single => 1,
            CurveMode::Dual => 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub house_edge: f64,
    pub waiting_ms: u64,
    pub crashed_ms: u64,
    pub tick_ms: u64,
    pub min_bet: Decimal,
    pub max_bet: Decimal,
    pub max_crash_point: Decimal,
    pub bet_cooldown_ms: u64,
    pub max_history: usize,
    pub curve_mode: CurveMode,
    /// Bind address for the gateway's HTTP/WebSocket listener.
    pub listen_addr: String,
    /// HS256 shared secret used to validate bearer tokens on
    /// `authenticate`. Must be overridden in production.
    pub auth_secret: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            house_edge: 0.04,
            waiting_ms: 10_000,
            crashed_ms: 3_000,
            tick_ms: 100,
            min_bet: dec!(0.10),
            max_bet: dec!(10000),
            max_crash_point: dec!(5000.00),
            bet_cooldown_ms: 500,
            max_history: 20,
            curve_mode: CurveMode::Single,
            listen_addr: "0.0.0.0:8080".to_string(),
            auth_secret: "dev-only-insecure-secret".to_string(),
        }
    }
}

impl Config {
    pub fn curve_count(&self) -> u8 {
        self.curve_mode.curve_count()
    }

    /// Load `.env`, then an optional TOML file, then environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let path = std::env::var("CRASH_ENGINE_CONFIG").unwrap_or_else(|_| "crash_engine.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            let raw = std::fs::read_to_string(&path)?;
            toml::from_str(&raw)?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        macro_rules! override_from_env {
            ($field:ident, $parse:expr) => {
                if let Ok(raw) = std::env::var(concat!("CRASH_ENGINE_", stringify!($field))) {
                    self.$field = $parse(&raw)?;
                }
            };
        }

        override_from_env!(house_edge, |s: &str| s.parse::<f64>().map_err(anyhow::Error::from));
        override_from_env!(waiting_ms, |s: &str| s.parse::<u64>().map_err(anyhow::Error::from));
        override_from_env!(crashed_ms, |s: &str| s.parse::<u64>().map_err(anyhow::Error::from));
        override_from_env!(tick_ms, |s: &str| s.parse::<u64>().map_err(anyhow::Error::from));
        override_from_env!(min_bet, |s: &str| Decimal::from_str_exact(s).map_err(anyhow::Error::from));
        override_from_env!(max_bet, |s: &str| Decimal::from_str_exact(s).map_err(anyhow::Error::from));
        override_from_env!(max_crash_point, |s: &str| Decimal::from_str_exact(s).map_err(anyhow::Error::from));
        override_from_env!(bet_cooldown_ms, |s: &str| s.parse::<u64>().map_err(anyhow::Error::from));
        override_from_env!(max_history, |s: &str| s.parse::<usize>().map_err(anyhow::Error::from));
        override_from_env!(listen_addr, |s: &str| Ok::<_, anyhow::Error>(s.to_string()));
        override_from_env!(auth_secret, |s: &str| Ok::<_, anyhow::Error>(s.to_string()));

        if let Ok(raw) = std::env::var("CRASH_ENGINE_CURVE_MODE") {
            self.curve_mode = match raw.to_ascii_lowercase().as_str() {
                "dual" => CurveMode::Dual,
                _ => CurveMode::Single,
            };
        }

        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!((0.0..=0.5).contains(&self.house_edge), "house_edge must be in [0.0, 0.5]");
        anyhow::ensure!(self.min_bet > Decimal::ZERO, "min_bet must be positive");
        anyhow::ensure!(self.max_bet >= self.min_bet, "max_bet must be >= min_bet");
        anyhow::ensure!(self.tick_ms > 0, "tick_ms must be positive");
        Ok(())
    }
}
