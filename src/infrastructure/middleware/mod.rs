// ViewerContext middleware and extractors

pub mod viewer_context_extractor;
pub mod viewer_context_middleware;

pub use viewer_context_extractor::{MaybeVc, Vc};
pub use viewer_context_middleware::*;
