//! Network side of the pipeline: resolving archive URLs and streaming their bodies.

mod archive;
mod fetcher;

pub use archive::ArchiveStream;
pub(crate) use archive::take_transfer_error;
pub use fetcher::{
    ArchiveFetcher, DEFAULT_BRANCH, DEFAULT_HOST, FetchOptions, HttpArchiveFetcher,
};
