//! Candidate retrieval: local catalog filtering plus a best-effort
//! external lookup source, merged and de-duplicated for ranking.

pub mod aggregator;
pub mod external;

pub use aggregator::CandidateAggregator;
pub use external::{
    ExternalSource, HttpLookupSource, NoopLookupSource, RetryPolicy, RetryingLookup, SourceError,
};
