use std::fmt;

use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SourceEndpoint {
    pub base_url: String,
    pub owner: String,
    pub token_env_var: String,
    #[serde(default)]
    pub repositories: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DestinationEndpoint {
    pub base_url: String,
    pub owner: String,
    pub token_env_var: String,
}

/// One source-to-destination user handle pair from the `users` section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UserPair {
    pub source: String,
    pub destination: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    Open,
    Closed,
    All,
}

impl Default for StateFilter {
    fn default() -> Self {
        StateFilter::All
    }
}

impl fmt::Display for StateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StateFilter::Open => "open",
            StateFilter::Closed => "closed",
            StateFilter::All => "all",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
pub struct SensitiveInfo {
    #[serde(default)]
    pub redact: bool,
    #[serde(default)]
    pub regexes: Vec<String>,
}
