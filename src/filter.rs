//! Locus filters: min/max thresholds that exclude loci from the comparison.
//!
//! Every threshold uses 0 for "unset". A real threshold of 0 therefore cannot
//! be expressed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::locus::Locus;
use crate::types::Provenance;

/// Errors while reading a filter file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error while reading '{path}': {source}")]
    IoPath { path: String, source: std::io::Error },

    #[error("line {line_no}: expected 'Key = Value', got '{line}'")]
    MalformedLine { line_no: usize, line: String },

    #[error("line {line_no}: unknown filter '{key}'")]
    UnknownKey { line_no: usize, key: String },

    #[error("line {line_no}: value for '{key}' is not a non-negative integer: '{value}'")]
    BadValue { line_no: usize, key: String, value: String },
}

/// Lower/upper bounds a locus must satisfy to be reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FilterConfig {
    pub locus_length_upper_limit: u64,
    pub locus_length_lower_limit: u64,

    pub min_reference_gene_models: u64,
    pub max_reference_gene_models: u64,
    pub min_prediction_gene_models: u64,
    pub max_prediction_gene_models: u64,

    pub min_reference_transcript_models: u64,
    pub max_reference_transcript_models: u64,
    pub min_prediction_transcript_models: u64,
    pub max_prediction_transcript_models: u64,

    pub min_transcripts_per_reference_gene_model: u64,
    pub max_transcripts_per_reference_gene_model: u64,
    pub min_transcripts_per_prediction_gene_model: u64,
    pub max_transcripts_per_prediction_gene_model: u64,

    pub min_reference_exons: u64,
    pub max_reference_exons: u64,
    pub min_prediction_exons: u64,
    pub max_prediction_exons: u64,

    #[serde(rename = "MinReferenceCDSLength")]
    pub min_reference_cds_length: u64,
    #[serde(rename = "MaxReferenceCDSLength")]
    pub max_reference_cds_length: u64,
    #[serde(rename = "MinPredictionCDSLength")]
    pub min_prediction_cds_length: u64,
    #[serde(rename = "MaxPredictionCDSLength")]
    pub max_prediction_cds_length: u64,
}

impl FilterConfig {
    /// True if no threshold is set.
    pub fn is_empty(&self) -> bool {
        *self == FilterConfig::default()
    }

    /// Read a filter file from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ConfigError::IoPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            ConfigError::IoPath { source, .. } => ConfigError::IoPath {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parse `Key = Value` lines.
    ///
    /// - Skips blank lines
    /// - Skips comments starting with '#' (whole-line or trailing)
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ConfigError> {
        let mut config = FilterConfig::default();

        for (i, line) in reader.lines().enumerate() {
            let line_no = i + 1;
            let line = line.map_err(|e| ConfigError::IoPath {
                path: "<reader>".to_string(),
                source: e,
            })?;

            let content = line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            let Some((key, value)) = content.split_once('=') else {
                return Err(ConfigError::MalformedLine {
                    line_no,
                    line: line.clone(),
                });
            };
            let (key, value) = (key.trim(), value.trim());

            let parsed: u64 = value.parse().map_err(|_| ConfigError::BadValue {
                line_no,
                key: key.to_string(),
                value: value.to_string(),
            })?;

            let slot = config.slot_mut(key).ok_or_else(|| ConfigError::UnknownKey {
                line_no,
                key: key.to_string(),
            })?;
            *slot = parsed;
        }

        Ok(config)
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut u64> {
        let slot = match key {
            "LocusLengthUpperLimit" => &mut self.locus_length_upper_limit,
            "LocusLengthLowerLimit" => &mut self.locus_length_lower_limit,
            "MinReferenceGeneModels" => &mut self.min_reference_gene_models,
            "MaxReferenceGeneModels" => &mut self.max_reference_gene_models,
            "MinPredictionGeneModels" => &mut self.min_prediction_gene_models,
            "MaxPredictionGeneModels" => &mut self.max_prediction_gene_models,
            "MinReferenceTranscriptModels" => &mut self.min_reference_transcript_models,
            "MaxReferenceTranscriptModels" => &mut self.max_reference_transcript_models,
            "MinPredictionTranscriptModels" => &mut self.min_prediction_transcript_models,
            "MaxPredictionTranscriptModels" => &mut self.max_prediction_transcript_models,
            "MinTranscriptsPerReferenceGeneModel" => &mut self.min_transcripts_per_reference_gene_model,
            "MaxTranscriptsPerReferenceGeneModel" => &mut self.max_transcripts_per_reference_gene_model,
            "MinTranscriptsPerPredictionGeneModel" => &mut self.min_transcripts_per_prediction_gene_model,
            "MaxTranscriptsPerPredictionGeneModel" => &mut self.max_transcripts_per_prediction_gene_model,
            "MinReferenceExons" => &mut self.min_reference_exons,
            "MaxReferenceExons" => &mut self.max_reference_exons,
            "MinPredictionExons" => &mut self.min_prediction_exons,
            "MaxPredictionExons" => &mut self.max_prediction_exons,
            "MinReferenceCDSLength" => &mut self.min_reference_cds_length,
            "MaxReferenceCDSLength" => &mut self.max_reference_cds_length,
            "MinPredictionCDSLength" => &mut self.min_prediction_cds_length,
            "MaxPredictionCDSLength" => &mut self.max_prediction_cds_length,
            _ => return None,
        };
        Some(slot)
    }
}

/// `value` violates `[lower, upper]`, with 0 meaning "no bound".
fn out_of_bounds(value: u64, lower: u64, upper: u64) -> bool {
    (lower > 0 && value < lower) || (upper > 0 && value > upper)
}

/// True if at least one gene on `side` satisfies the per-gene transcript
/// bound. Unset bounds are trivially satisfied.
fn some_gene_within(locus: &Locus, side: Provenance, lower: u64, upper: u64) -> bool {
    let genes = locus.genes(side);
    let min_ok = lower == 0 || genes.iter().any(|g| g.num_transcripts() as u64 >= lower);
    let max_ok = upper == 0 || genes.iter().any(|g| g.num_transcripts() as u64 <= upper);
    min_ok && max_ok
}

/// Decide whether `locus` should be excluded. `true` means "filter it out".
///
/// Bounds are checked in a fixed order and the first violation wins.
/// Per-gene transcript bounds use an "exists" test: the locus is kept if any
/// one gene on that side satisfies the bound.
pub fn passes_filters(locus: &Locus, filters: Option<&FilterConfig>) -> bool {
    let Some(f) = filters else {
        return false;
    };

    if out_of_bounds(locus.length(), f.locus_length_lower_limit, f.locus_length_upper_limit) {
        return true;
    }

    let counts = [
        (
            locus.num_genes(Provenance::Reference) as u64,
            f.min_reference_gene_models,
            f.max_reference_gene_models,
        ),
        (
            locus.num_genes(Provenance::Prediction) as u64,
            f.min_prediction_gene_models,
            f.max_prediction_gene_models,
        ),
        (
            locus.num_transcripts(Provenance::Reference) as u64,
            f.min_reference_transcript_models,
            f.max_reference_transcript_models,
        ),
        (
            locus.num_transcripts(Provenance::Prediction) as u64,
            f.min_prediction_transcript_models,
            f.max_prediction_transcript_models,
        ),
    ];
    if counts.iter().any(|&(v, lo, hi)| out_of_bounds(v, lo, hi)) {
        return true;
    }

    if !some_gene_within(
        locus,
        Provenance::Reference,
        f.min_transcripts_per_reference_gene_model,
        f.max_transcripts_per_reference_gene_model,
    ) {
        return true;
    }
    if !some_gene_within(
        locus,
        Provenance::Prediction,
        f.min_transcripts_per_prediction_gene_model,
        f.max_transcripts_per_prediction_gene_model,
    ) {
        return true;
    }

    if out_of_bounds(locus.num_exons(Provenance::Reference) as u64, f.min_reference_exons, f.max_reference_exons)
        || out_of_bounds(locus.num_exons(Provenance::Prediction) as u64, f.min_prediction_exons, f.max_prediction_exons)
    {
        return true;
    }

    out_of_bounds(
        locus.cds_length(Provenance::Reference),
        f.min_reference_cds_length,
        f.max_reference_cds_length,
    ) || out_of_bounds(
        locus.cds_length(Provenance::Prediction),
        f.min_prediction_cds_length,
        f.max_prediction_cds_length,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::gene::Gene;
    use crate::model::transcript::Transcript;
    use crate::types::{Interval, Strand};
    use std::io::Cursor;

    fn gene(id: &str, ntx: usize, start: u64) -> Gene {
        let mut g = Gene::new(id, "chr1", Interval::EMPTY, Strand::Plus);
        for i in 0..ntx {
            let mut t = Transcript::new(format!("{id}.{i}"), Interval::EMPTY, Strand::Plus);
            t.add_exon(Interval::new(start, start + 99));
            t.add_cds(Interval::new(start + 10, start + 89));
            t.finalize();
            g.add_transcript(t);
        }
        g
    }

    fn locus() -> Locus {
        let mut l = Locus::new("chr1");
        l.add_reference_gene(gene("R1", 1, 1000));
        l.add_reference_gene(gene("R2", 3, 1200));
        l.add_prediction_gene(gene("P1", 2, 1000));
        l
    }

    #[test]
    fn no_filters_keeps_everything() {
        let l = locus();
        assert!(!passes_filters(&l, None));
        assert!(!passes_filters(&l, Some(&FilterConfig::default())));
    }

    #[test]
    fn per_gene_transcript_bound_is_existential() {
        let l = locus();
        let f = FilterConfig {
            min_transcripts_per_reference_gene_model: 2,
            ..Default::default()
        };
        assert!(!passes_filters(&l, Some(&f)));

        let f = FilterConfig {
            min_transcripts_per_reference_gene_model: 4,
            ..Default::default()
        };
        assert!(passes_filters(&l, Some(&f)));

        let f = FilterConfig {
            max_transcripts_per_prediction_gene_model: 1,
            ..Default::default()
        };
        assert!(passes_filters(&l, Some(&f)));
    }

    #[test]
    fn length_and_count_bounds() {
        let l = locus();
        assert_eq!(l.length(), 300);

        let too_long = FilterConfig {
            locus_length_upper_limit: 299,
            ..Default::default()
        };
        assert!(passes_filters(&l, Some(&too_long)));

        let enough_genes = FilterConfig {
            min_reference_gene_models: 2,
            max_prediction_gene_models: 1,
            ..Default::default()
        };
        assert!(!passes_filters(&l, Some(&enough_genes)));

        let too_many_tx = FilterConfig {
            max_reference_transcript_models: 3,
            ..Default::default()
        };
        assert!(passes_filters(&l, Some(&too_many_tx)));
    }

    #[test]
    fn exon_and_cds_bounds() {
        let l = locus();
        // 4 reference transcripts x 1 exon, each CDS 80 bp
        let f = FilterConfig {
            min_reference_exons: 5,
            ..Default::default()
        };
        assert!(passes_filters(&l, Some(&f)));

        let f = FilterConfig {
            min_prediction_cds_length: 80,
            max_prediction_cds_length: 80,
            ..Default::default()
        };
        assert!(!passes_filters(&l, Some(&f)));

        let f = FilterConfig {
            max_reference_cds_length: 79,
            ..Default::default()
        };
        assert!(passes_filters(&l, Some(&f)));
    }

    #[test]
    fn parses_filter_file() {
        let text = "\
# locus filters
LocusLengthUpperLimit = 5000
MinReferenceGeneModels=1

MaxPredictionCDSLength = 900   # trailing comment
";
        let f = FilterConfig::from_reader(Cursor::new(text.as_bytes())).unwrap();
        assert_eq!(f.locus_length_upper_limit, 5000);
        assert_eq!(f.min_reference_gene_models, 1);
        assert_eq!(f.max_prediction_cds_length, 900);
        assert!(!f.is_empty());
    }

    #[test]
    fn rejects_bad_filter_lines() {
        let err = FilterConfig::from_reader(Cursor::new("Bogus = 3\n".as_bytes())).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { line_no: 1, .. }));

        let err = FilterConfig::from_reader(Cursor::new("\nMinReferenceExons = -1\n".as_bytes())).unwrap_err();
        assert!(matches!(err, ConfigError::BadValue { line_no: 2, .. }));

        let err = FilterConfig::from_reader(Cursor::new("MinReferenceExons 4\n".as_bytes())).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedLine { .. }));
    }

    #[test]
    fn deserializes_with_file_key_names() {
        let f: FilterConfig =
            serde_json::from_str(r#"{"MinReferenceCDSLength": 30, "MaxTranscriptsPerPredictionGeneModel": 2}"#)
                .unwrap();
        assert_eq!(f.min_reference_cds_length, 30);
        assert_eq!(f.max_transcripts_per_prediction_gene_model, 2);
        assert_eq!(f.locus_length_upper_limit, 0);
    }
}
