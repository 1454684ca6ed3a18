use anyhow::{Context, Result};
use khata_finance::Jurisdiction;

pub const DEFAULT_RELAY_CHANNEL: &str = "khata.events";

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub redis_url: String,
    pub relay_channel: String,
    pub default_jurisdiction: Jurisdiction,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads through `lookup`, so callers can supply
    /// values from somewhere other than the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let redis_url = lookup("REDIS_URL").context("REDIS_URL is required")?;
        let relay_channel = lookup("KHATA_RELAY_CHANNEL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_RELAY_CHANNEL.to_string());
        let default_jurisdiction = match lookup("KHATA_DEFAULT_JURISDICTION") {
            Some(value) => value
                .parse::<Jurisdiction>()
                .context("KHATA_DEFAULT_JURISDICTION must be same or other")?,
            None => Jurisdiction::Same,
        };

        Ok(Self {
            redis_url,
            relay_channel,
            default_jurisdiction,
        })
    }
}
