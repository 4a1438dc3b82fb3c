pub mod feed;
pub mod normalizer;
pub mod raw_log;

pub use feed::FeedConnection;
pub use normalizer::{EventNormalizer, HttpMetadataFetcher, MetadataFetcher};
