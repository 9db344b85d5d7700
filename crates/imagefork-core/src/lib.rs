//! # imagefork-core
//!
//! Domain types shared by every imagefork crate: token hashing, the closed
//! set of material channels, poster identifiers and bindings, and the baked
//! fallback bundles together with the pure outcome-to-bundle selection.

pub mod bundle;
pub mod channel;
pub mod error;
pub mod poster;
pub mod token;

pub use bundle::{BakedBundle, FallbackChain, Outcome};
pub use channel::Channel;
pub use error::{CoreError, Result};
pub use poster::{Binding, PosterId};
pub use token::TokenHash;
