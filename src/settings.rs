//! Loads `settings.json`, the small user configuration file shared by the
//! whole pipeline.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::Error;

/// Contents of `settings.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(rename = "Config")]
    pub config: Config,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Key into `banks.json` selecting the column mapping to use.
    #[serde(rename = "Bank", default = "default_bank")]
    pub bank: String,
    /// Currency label used in the report and on the chart axis.
    #[serde(rename = "Currency", default = "default_currency")]
    pub currency: String,
    /// Distance in data points between x-axis labels on the balance chart.
    /// Historically stored as a string, so both forms are accepted.
    #[serde(
        rename = "Graph_Interval",
        default = "default_graph_interval",
        deserialize_with = "number_or_numeric_string"
    )]
    pub graph_interval: u32,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Settings, Error> {
        let text = fs::read_to_string(path).map_err(|err| Error::config(path, err.to_string()))?;
        serde_json::from_str(&text).map_err(|err| Error::config(path, err.to_string()))
    }
}

fn default_bank() -> String {
    "default".to_owned()
}

fn default_currency() -> String {
    "EUR".to_owned()
}

fn default_graph_interval() -> u32 {
    7
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(interval) => Ok(interval),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
