//! Baked fallback bundles and outcome classification.
//!
//! Whenever live resolution does not yield a material URL, the response is
//! built from one of the baked bundles below. Every bundle names a file for
//! every channel, so a client always receives an image.

use serde::Serialize;
use std::fmt;

use crate::channel::Channel;

/// Static, build-time mapping from channel to an asset-store filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BakedBundle {
    /// Always-available check poster served for the diagnostic token.
    Diagnostic,
    /// Neutral poster served when nothing live is available.
    Default,
    /// Served when resolution failed unexpectedly.
    Error,
    /// Served when the requested channel is not one we know.
    ChannelFallback,
}

impl BakedBundle {
    pub const ALL: [BakedBundle; 4] = [
        BakedBundle::Diagnostic,
        BakedBundle::Default,
        BakedBundle::Error,
        BakedBundle::ChannelFallback,
    ];

    /// Asset filename for the given channel.
    pub fn filename(&self, channel: Channel) -> &'static str {
        match (self, channel) {
            (BakedBundle::Diagnostic, Channel::Albedo) => "yote_albedo.webp",
            (BakedBundle::Diagnostic, Channel::Emissive) => "yote_emissive.webp",
            (BakedBundle::Diagnostic, Channel::Normal) => "yote_normal.webp",
            (BakedBundle::Default, Channel::Albedo) => "safe.webp",
            (BakedBundle::Error, Channel::Albedo) => "error.webp",
            (BakedBundle::ChannelFallback, Channel::Albedo) => "black_pixel.png",
            (_, Channel::Emissive) => "black_pixel.png",
            (_, Channel::Normal) => "default_normal_pixel.png",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BakedBundle::Diagnostic => "diagnostic",
            BakedBundle::Default => "default",
            BakedBundle::Error => "error",
            BakedBundle::ChannelFallback => "channel_fallback",
        }
    }
}

impl fmt::Display for BakedBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification of a single resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A live material URL was found for the bound poster.
    Found(String),
    /// The token is bound to a poster that has no material for the channel.
    NoMaterial,
    /// No poster is bound and none is servable right now.
    NoPoster,
    /// The requested channel is outside the supported set.
    InvalidChannel,
    /// The diagnostic token was presented.
    Diagnostic,
    /// Backend serving is switched off by the circuit breaker.
    BackendDisabled,
    /// Resolution failed (store timeout, connectivity, ...).
    Failed,
}

impl Outcome {
    /// Stable label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Found(_) => "found",
            Outcome::NoMaterial => "no_material",
            Outcome::NoPoster => "no_poster",
            Outcome::InvalidChannel => "invalid_channel",
            Outcome::Diagnostic => "diagnostic",
            Outcome::BackendDisabled => "backend_disabled",
            Outcome::Failed => "failed",
        }
    }
}

/// Pure mapping from resolution outcome to the baked bundle that answers it.
pub struct FallbackChain;

impl FallbackChain {
    /// Bundle for an outcome, or `None` when a live URL answers the request.
    ///
    /// `NoMaterial` and `NoPoster` currently share the default bundle; they
    /// stay distinct outcomes so operators can tell them apart in metrics.
    pub fn select(outcome: &Outcome) -> Option<BakedBundle> {
        match outcome {
            Outcome::Found(_) => None,
            Outcome::InvalidChannel => Some(BakedBundle::ChannelFallback),
            Outcome::Diagnostic => Some(BakedBundle::Diagnostic),
            Outcome::BackendDisabled | Outcome::NoMaterial | Outcome::NoPoster => {
                Some(BakedBundle::Default)
            }
            Outcome::Failed => Some(BakedBundle::Error),
        }
    }

    /// Whether the outcome must be reported with a server failure status.
    pub fn is_failure(outcome: &Outcome) -> bool {
        matches!(outcome, Outcome::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_fallback_outcome() -> Vec<Outcome> {
        vec![
            Outcome::NoMaterial,
            Outcome::NoPoster,
            Outcome::InvalidChannel,
            Outcome::Diagnostic,
            Outcome::BackendDisabled,
            Outcome::Failed,
        ]
    }

    #[test]
    fn test_selection_table() {
        assert_eq!(
            FallbackChain::select(&Outcome::InvalidChannel),
            Some(BakedBundle::ChannelFallback)
        );
        assert_eq!(
            FallbackChain::select(&Outcome::Diagnostic),
            Some(BakedBundle::Diagnostic)
        );
        assert_eq!(
            FallbackChain::select(&Outcome::BackendDisabled),
            Some(BakedBundle::Default)
        );
        assert_eq!(
            FallbackChain::select(&Outcome::NoMaterial),
            Some(BakedBundle::Default)
        );
        assert_eq!(
            FallbackChain::select(&Outcome::NoPoster),
            Some(BakedBundle::Default)
        );
        assert_eq!(
            FallbackChain::select(&Outcome::Failed),
            Some(BakedBundle::Error)
        );
        assert_eq!(
            FallbackChain::select(&Outcome::Found("http://x/a.png".into())),
            None
        );
    }

    #[test]
    fn test_every_outcome_lands_on_a_complete_bundle() {
        for outcome in every_fallback_outcome() {
            let bundle = FallbackChain::select(&outcome).expect("fallback outcome has a bundle");
            assert!(BakedBundle::ALL.contains(&bundle));
            for channel in Channel::ALL {
                assert!(!bundle.filename(channel).is_empty());
            }
        }
    }

    #[test]
    fn test_only_failures_are_marked() {
        for outcome in every_fallback_outcome() {
            assert_eq!(
                FallbackChain::is_failure(&outcome),
                outcome == Outcome::Failed
            );
        }
        assert!(!FallbackChain::is_failure(&Outcome::Found("u".into())));
    }

    #[test]
    fn test_bundle_filenames() {
        assert_eq!(BakedBundle::Diagnostic.filename(Channel::Emissive), "yote_emissive.webp");
        assert_eq!(BakedBundle::Default.filename(Channel::Albedo), "safe.webp");
        assert_eq!(BakedBundle::Error.filename(Channel::Albedo), "error.webp");
        assert_eq!(BakedBundle::Error.filename(Channel::Normal), "default_normal_pixel.png");
        assert_eq!(
            BakedBundle::ChannelFallback.filename(Channel::Albedo),
            "black_pixel.png"
        );
    }

    #[test]
    fn test_outcome_labels_are_distinct() {
        let mut labels: Vec<_> = every_fallback_outcome().iter().map(Outcome::label).collect();
        labels.push(Outcome::Found(String::new()).label());
        let len = labels.len();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), len);
    }
}
