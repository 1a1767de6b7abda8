//! Drive the locus engine over a whole annotation pair.
//!
//! Loci are independent, so `compare_loci` hands them to the rayon pool and
//! collects one [`LocusReport`] per locus, in input order.

use std::fmt;
use std::path::Path;

use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

use crate::annotation::builder::{group_loci, AnnotationBuilder};
use crate::clique::TranscriptClique;
use crate::error::Result;
use crate::filter::{passes_filters, FilterConfig};
use crate::locus::{Locus, SkipReason};
use crate::model::types::PairRelation;
use crate::pair::CliquePair;
use crate::types::Provenance;

/// Default per-side transcript ceiling for clique enumeration.
pub const DEFAULT_MAX_TRANSCRIPTS: usize = 32;

#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Transcripts per side above which a locus is skipped (0 = no cap).
    pub max_transcripts: usize,
    pub filters: Option<FilterConfig>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            max_transcripts: DEFAULT_MAX_TRANSCRIPTS,
            filters: None,
        }
    }
}

impl CompareOptions {
    /// Load locus filters from a `Key = Value` file.
    pub fn with_filter_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let filters = FilterConfig::from_path(path)?;
        self.filters = if filters.is_empty() { None } else { Some(filters) };
        Ok(self)
    }
}

/// Read both annotations and cluster their genes into loci.
pub fn load_loci<P: AsRef<Path>, Q: AsRef<Path>>(
    builder: &AnnotationBuilder,
    reference: P,
    prediction: Q,
) -> Result<Vec<Locus>> {
    let refr = builder.build_from_path(reference)?;
    let pred = builder.build_from_path(prediction)?;
    info!("loaded {} reference and {} prediction genes", refr.len(), pred.len());

    let loci = group_loci(refr, pred);
    info!("grouped genes into {} loci", loci.len());
    Ok(loci)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocusStatus {
    Compared,
    Filtered,
    Skipped(SkipReason),
}

impl fmt::Display for LocusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocusStatus::Compared => write!(f, "compared"),
            LocusStatus::Filtered => write!(f, "filtered"),
            LocusStatus::Skipped(reason) => write!(f, "skipped:{reason}"),
        }
    }
}

/// One reported clique pair, flattened for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairRecord {
    pub refr: Vec<String>,
    pub pred: Vec<String>,
    pub relation: PairRelation,
    pub cds_shared_bp: u64,
    pub cds_union_bp: u64,
    pub exon_shared_bp: u64,
    pub exon_union_bp: u64,
}

impl From<&CliquePair> for PairRecord {
    fn from(pair: &CliquePair) -> Self {
        let (cds_shared_bp, cds_union_bp) = pair.comparison().cds_similarity();
        let (exon_shared_bp, exon_union_bp) = pair.comparison().exon_similarity();
        Self {
            refr: owned_ids(pair.refr_clique()),
            pred: owned_ids(pair.pred_clique()),
            relation: pair.relation(),
            cds_shared_bp,
            cds_union_bp,
            exon_shared_bp,
            exon_union_bp,
        }
    }
}

fn owned_ids(clique: &TranscriptClique) -> Vec<String> {
    clique.ids().into_iter().map(str::to_string).collect()
}

/// Outcome of comparing one locus.
#[derive(Debug, Clone, Serialize)]
pub struct LocusReport {
    pub seqid: String,
    pub start: u64,
    pub end: u64,
    pub status: LocusStatus,
    pub refr_genes: Vec<String>,
    pub pred_genes: Vec<String>,
    pub refr_transcripts: usize,
    pub pred_transcripts: usize,
    pub refr_cliques: Option<usize>,
    pub pred_cliques: Option<usize>,
    pub complex: bool,
    pub pairs: Vec<PairRecord>,
    pub unique_refr: Vec<Vec<String>>,
    pub unique_pred: Vec<Vec<String>>,
}

impl LocusReport {
    /// Column names matching the `Display` rendering.
    pub const TSV_HEADER: &'static str = "seqid\tstart\tend\tstatus\trefr_genes\tpred_genes\trefr_transcripts\tpred_transcripts\tpairs\texact\tunique_refr\tunique_pred\tcomplex";

    fn new(locus: &Locus, status: LocusStatus) -> Self {
        let ids = |p| locus.gene_ids(p).into_iter().map(str::to_string).collect::<Vec<_>>();
        let unique = |p| {
            locus
                .unique_cliques(p)
                .unwrap_or(&[])
                .iter()
                .map(|c| owned_ids(c.as_ref()))
                .collect::<Vec<_>>()
        };

        Self {
            seqid: locus.seqid().to_string(),
            start: locus.start(),
            end: locus.end(),
            status,
            refr_genes: ids(Provenance::Reference),
            pred_genes: ids(Provenance::Prediction),
            refr_transcripts: locus.num_transcripts(Provenance::Reference),
            pred_transcripts: locus.num_transcripts(Provenance::Prediction),
            refr_cliques: locus.splice_complexity(Provenance::Reference),
            pred_cliques: locus.splice_complexity(Provenance::Prediction),
            complex: locus.is_complex(),
            pairs: locus
                .reported_pairs()
                .unwrap_or(&[])
                .iter()
                .map(|p| PairRecord::from(&**p))
                .collect(),
            unique_refr: unique(Provenance::Reference),
            unique_pred: unique(Provenance::Prediction),
        }
    }

    pub fn num_exact(&self) -> usize {
        self.pairs.iter().filter(|p| p.relation == PairRelation::Exact).count()
    }
}

impl fmt::Display for LocusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |v: &[String]| if v.is_empty() { ".".to_string() } else { v.join(",") };
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.seqid,
            self.start,
            self.end,
            self.status,
            join(&self.refr_genes),
            join(&self.pred_genes),
            self.refr_transcripts,
            self.pred_transcripts,
            self.pairs.len(),
            self.num_exact(),
            self.unique_refr.len(),
            self.unique_pred.len(),
            self.complex,
        )
    }
}

/// Filter, pair and report a single locus.
pub fn compare_locus(locus: &mut Locus, opts: &CompareOptions) -> LocusReport {
    if passes_filters(locus, opts.filters.as_ref()) {
        debug!("filtered locus {}{}", locus.seqid(), locus.range());
        return LocusReport::new(locus, LocusStatus::Filtered);
    }

    if locus.get_clique_pairs(opts.max_transcripts).is_some() {
        locus.find_best_pairs();
    }

    let status = match locus.skip_reason() {
        Some(reason) => LocusStatus::Skipped(reason),
        None => LocusStatus::Compared,
    };
    LocusReport::new(locus, status)
}

/// Compare every locus on the current rayon pool. Reports keep input order.
pub fn compare_loci(loci: &mut [Locus], opts: &CompareOptions) -> Vec<LocusReport> {
    let reports: Vec<LocusReport> = loci.par_iter_mut().map(|l| compare_locus(l, opts)).collect();
    ComparisonSummary::from_reports(&reports).log();
    reports
}

/// Run totals over a set of locus reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    pub loci: usize,
    pub compared: usize,
    pub filtered: usize,
    pub skipped_too_many_transcripts: usize,
    pub skipped_one_sided: usize,
    pub reported_pairs: usize,
    pub exact_pairs: usize,
    pub unique_refr_cliques: usize,
    pub unique_pred_cliques: usize,
}

impl ComparisonSummary {
    pub fn from_reports(reports: &[LocusReport]) -> Self {
        let mut s = Self {
            loci: reports.len(),
            ..Self::default()
        };
        for r in reports {
            match r.status {
                LocusStatus::Compared => s.compared += 1,
                LocusStatus::Filtered => s.filtered += 1,
                LocusStatus::Skipped(SkipReason::TooManyTranscripts { .. }) => s.skipped_too_many_transcripts += 1,
                LocusStatus::Skipped(SkipReason::OneSided { .. }) => s.skipped_one_sided += 1,
            }
            s.reported_pairs += r.pairs.len();
            s.exact_pairs += r.num_exact();
            s.unique_refr_cliques += r.unique_refr.len();
            s.unique_pred_cliques += r.unique_pred.len();
        }
        s
    }

    pub fn log(&self) {
        info!(
            "{} loci: {} compared, {} filtered, {} skipped (too many transcripts), {} skipped (one-sided)",
            self.loci, self.compared, self.filtered, self.skipped_too_many_transcripts, self.skipped_one_sided
        );
        info!(
            "{} reported pairs ({} exact), {} unique reference cliques, {} unique prediction cliques",
            self.reported_pairs, self.exact_pairs, self.unique_refr_cliques, self.unique_pred_cliques
        );
    }
}

impl fmt::Display for ComparisonSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "loci\t{}", self.loci)?;
        writeln!(f, "compared\t{}", self.compared)?;
        writeln!(f, "filtered\t{}", self.filtered)?;
        writeln!(f, "skipped_too_many_transcripts\t{}", self.skipped_too_many_transcripts)?;
        writeln!(f, "skipped_one_sided\t{}", self.skipped_one_sided)?;
        writeln!(f, "reported_pairs\t{}", self.reported_pairs)?;
        writeln!(f, "exact_pairs\t{}", self.exact_pairs)?;
        writeln!(f, "unique_refr_cliques\t{}", self.unique_refr_cliques)?;
        write!(f, "unique_pred_cliques\t{}", self.unique_pred_cliques)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::gene::Gene;
    use crate::model::transcript::Transcript;
    use crate::types::{Interval, Strand};
    use std::io::Write;

    fn gene(id: &str, blocks: &[(u64, u64)]) -> Gene {
        let mut g = Gene::new(id, "chr1", Interval::EMPTY, Strand::Plus);
        let mut t = Transcript::new(format!("{id}.t"), Interval::EMPTY, Strand::Plus);
        for &(s, e) in blocks {
            t.add_exon(Interval::new(s, e));
            t.add_cds(Interval::new(s, e));
        }
        t.finalize();
        g.add_transcript(t);
        g
    }

    fn paired_locus() -> Locus {
        let mut l = Locus::new("chr1");
        l.add_reference_gene(gene("r", &[(100, 200), (300, 400)]));
        l.add_prediction_gene(gene("p", &[(100, 200), (300, 400)]));
        l
    }

    #[test]
    fn compared_locus_reports_exact_pair() {
        let mut l = paired_locus();
        let report = compare_locus(&mut l, &CompareOptions::default());

        assert_eq!(report.status, LocusStatus::Compared);
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.num_exact(), 1);
        assert_eq!(report.pairs[0].refr, vec!["r.t"]);
        assert_eq!(report.pairs[0].cds_shared_bp, 202);
        assert_eq!(report.pairs[0].cds_union_bp, 202);
        assert!(report.unique_refr.is_empty());
        assert_eq!(report.refr_cliques, Some(1));
        assert_eq!(
            report.to_string(),
            "chr1\t100\t400\tcompared\tr\tp\t1\t1\t1\t1\t0\t0\tfalse"
        );
    }

    #[test]
    fn one_sided_locus_is_skipped() {
        let mut l = Locus::new("chr1");
        l.add_reference_gene(gene("r", &[(100, 200)]));
        let report = compare_locus(&mut l, &CompareOptions::default());

        assert!(matches!(report.status, LocusStatus::Skipped(SkipReason::OneSided { .. })));
        assert!(report.pairs.is_empty());
        assert!(report.to_string().contains("skipped:one-sided"));
    }

    #[test]
    fn filtered_locus_is_not_paired() {
        let mut l = paired_locus();
        let opts = CompareOptions {
            filters: Some(FilterConfig {
                locus_length_upper_limit: 100,
                ..FilterConfig::default()
            }),
            ..CompareOptions::default()
        };
        let report = compare_locus(&mut l, &opts);

        assert_eq!(report.status, LocusStatus::Filtered);
        assert_eq!(report.refr_cliques, None);
        assert_eq!(l.pairing_attempts(), 0);
    }

    #[test]
    fn parallel_comparison_keeps_order_and_summarizes() {
        let mut far = Locus::new("chr1");
        far.add_reference_gene(gene("r2", &[(5000, 5100)]));

        let mut loci = vec![paired_locus(), far];
        let reports = compare_loci(&mut loci, &CompareOptions::default());

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].start, 100);
        assert_eq!(reports[1].start, 5000);

        let summary = ComparisonSummary::from_reports(&reports);
        assert_eq!(summary.loci, 2);
        assert_eq!(summary.compared, 1);
        assert_eq!(summary.skipped_one_sided, 1);
        assert_eq!(summary.reported_pairs, 1);
        assert_eq!(summary.exact_pairs, 1);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut l = paired_locus();
        let report = compare_locus(&mut l, &CompareOptions::default());
        let v = serde_json::to_value(&report).unwrap();

        assert_eq!(v["status"], "compared");
        assert_eq!(v["pairs"][0]["relation"], "Exact");
        assert_eq!(v["refr_genes"][0], "r");
    }

    #[test]
    fn filter_file_with_no_bounds_means_no_filters() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# nothing set").unwrap();
        writeln!(file, "LocusLengthUpperLimit = 0").unwrap();

        let opts = CompareOptions::default().with_filter_file(file.path()).unwrap();
        assert!(opts.filters.is_none());
        assert_eq!(opts.max_transcripts, DEFAULT_MAX_TRANSCRIPTS);
    }

    #[test]
    fn load_loci_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let refr = dir.path().join("ref.gff3");
        let pred = dir.path().join("pred.gtf");
        std::fs::write(
            &refr,
            "chr1\tr\tgene\t100\t400\t.\t+\t.\tID=g1\n\
             chr1\tr\tmRNA\t100\t400\t.\t+\t.\tID=t1;Parent=g1\n\
             chr1\tr\tCDS\t100\t400\t.\t+\t0\tParent=t1\n",
        )
        .unwrap();
        std::fs::write(
            &pred,
            "chr1\tp\tCDS\t150\t450\t.\t+\t0\tgene_id \"pg\"; transcript_id \"pt\";\n",
        )
        .unwrap();

        let mut loci = load_loci(&AnnotationBuilder::new(), &refr, &pred).unwrap();
        assert_eq!(loci.len(), 1);

        let reports = compare_loci(&mut loci, &CompareOptions::default());
        assert_eq!(reports[0].pairs.len(), 1);
        assert_eq!(reports[0].pairs[0].relation, PairRelation::Overlap);
    }
}
