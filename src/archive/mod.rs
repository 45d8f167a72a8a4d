//! Turning a fetched archive into a usable plugin directory.

mod extract;
mod normalize;
mod path;
#[cfg(test)]
pub(crate) mod testing;

pub use extract::{ExtractSummary, Extractor};
pub use normalize::{LayoutNormalizer, NormalizeOutcome};
