use imagefork_core::PosterId;
use serde::Serialize;

/// Result of a claim-or-lookup on the binding store.
///
/// `poster_id == None` means nothing could be bound right now (no servable
/// poster) and no binding was recorded. It is distinct from a bound poster
/// that simply lacks a material, which the asset table reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BindingResolution {
    pub poster_id: Option<PosterId>,
    /// Whether this call created the binding.
    pub created: bool,
}

impl BindingResolution {
    /// A binding that already existed.
    pub fn existing(poster_id: PosterId) -> Self {
        Self {
            poster_id: Some(poster_id),
            created: false,
        }
    }

    /// A binding created by this call.
    pub fn created(poster_id: PosterId) -> Self {
        Self {
            poster_id: Some(poster_id),
            created: true,
        }
    }

    /// Nothing to bind to.
    pub fn unbound() -> Self {
        Self {
            poster_id: None,
            created: false,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.poster_id.is_some()
    }
}
