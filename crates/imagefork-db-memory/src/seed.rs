use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Posters to preload into an in-memory store.
///
/// ```toml
/// [[storage.memory.posters]]
/// id = 42
/// servable = true
/// materials = { a = "https://cdn.example/42/albedo.webp" }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub posters: Vec<SeedPoster>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPoster {
    pub id: i64,
    #[serde(default = "default_servable")]
    pub servable: bool,
    /// Material URLs keyed by channel code (`a`, `e`, `n`).
    #[serde(default)]
    pub materials: HashMap<String, String>,
}

fn default_servable() -> bool {
    true
}
