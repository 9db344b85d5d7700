use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Material slot a poster can supply a texture for.
///
/// The set is closed. Requests carry the one-letter code (`a`, `e`, `n`);
/// storage uses the long kind name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Albedo,
    Emissive,
    Normal,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Albedo, Channel::Emissive, Channel::Normal];

    /// Parse an optional path segment. Absent means the default channel.
    pub fn parse(code: Option<&str>) -> Result<Self, CoreError> {
        match code {
            None => Ok(Self::default()),
            Some(code) => code.parse(),
        }
    }

    /// One-letter code used in request paths.
    pub fn as_code(&self) -> &'static str {
        match self {
            Channel::Albedo => "a",
            Channel::Emissive => "e",
            Channel::Normal => "n",
        }
    }

    /// Kind name used by the material table.
    pub fn as_kind(&self) -> &'static str {
        match self {
            Channel::Albedo => "albedo",
            Channel::Emissive => "emissive",
            Channel::Normal => "normal",
        }
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Channel::Albedo),
            "e" => Ok(Channel::Emissive),
            "n" => Ok(Channel::Normal),
            _ => Err(CoreError::invalid_channel(s)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}
