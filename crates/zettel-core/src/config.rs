//! Parser configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

fn default_network() -> String {
    "main".to_string()
}

/// Settings a host passes when constructing a parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Chain name, `"main"` or `"test"`.
    pub network: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            network: default_network(),
        }
    }
}

impl ParserConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
