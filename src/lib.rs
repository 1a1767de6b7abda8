//! locus_compare
//!
//! Locus-level comparison of a reference and a predicted gene annotation.
//! Overlapping genes from both sides are grouped into loci; within a locus,
//! alternative-splicing-compatible transcripts are grouped into cliques, every
//! reference clique is scored against every prediction clique, and a greedy
//! sweep keeps the best mutually exclusive pairs. Coordinates are 1-based and
//! closed.

pub mod types;
pub mod model;
pub mod annotation;
pub mod clique;
pub mod pair;
pub mod locus;
pub mod filter;
pub mod compare;
pub mod error;

pub use annotation::{group_loci, AnnotationBuilder};

pub use types::{Interval, Provenance, Strand};

pub use model::gene::Gene;
pub use model::transcript::Transcript;
pub use model::{PairComparison, PairRelation};

pub use clique::{enumerate_cliques, TranscriptClique};
pub use pair::CliquePair;
pub use locus::{Locus, Memo, SkipReason};
pub use filter::{passes_filters, FilterConfig};
pub use compare::{compare_loci, load_loci, CompareOptions, ComparisonSummary, LocusReport};
pub use error::{Error, Result};
