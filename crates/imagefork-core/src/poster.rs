use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::token::TokenHash;

/// Identifier of a poster record owned by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PosterId(pub i64);

impl PosterId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for PosterId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for PosterId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(PosterId)
            .map_err(|_| CoreError::invalid_poster_id(s))
    }
}

impl fmt::Display for PosterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable association between a token hash and the poster it first observed.
///
/// `poster_id` never changes once the binding exists; only `last_used` moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub hash: TokenHash,
    pub poster_id: PosterId,
    pub last_used: DateTime<Utc>,
}

impl Binding {
    pub fn new(hash: TokenHash, poster_id: PosterId) -> Self {
        Self {
            hash,
            poster_id,
            last_used: Utc::now(),
        }
    }

    /// Record another hit on this binding.
    pub fn touch(&mut self) {
        self.last_used = Utc::now();
    }
}
