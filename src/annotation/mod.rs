pub mod builder;
pub mod io;

pub use builder::{group_loci, AnnotationBuilder, FeatureKeys};
pub use io::{AnnotationReader, AnnotationRecord, Dialect, ParseError};
