//! Gene loci: the unit of comparison between a reference and a prediction
//! annotation.
//!
//! A locus owns every gene falling in one merged interval, tagged by
//! provenance. Cliques, clique pairs and the final pairing are derived on
//! demand, in that order, and cached for the life of the locus.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::clique::{enumerate_cliques, TranscriptClique};
use crate::model::gene::Gene;
use crate::model::transcript::Transcript;
use crate::pair::CliquePair;
use crate::types::{Interval, Provenance};

/// Cached result of a derived computation.
///
/// Keeps "not attempted yet" apart from "attempted, nothing to show".
#[derive(Debug, Clone, Default)]
pub enum Memo<T> {
    #[default]
    NotComputed,
    Empty,
    Computed(T),
}

impl<T> Memo<T> {
    pub fn is_computed(&self) -> bool {
        !matches!(self, Memo::NotComputed)
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Memo::Computed(v) => Some(v),
            _ => None,
        }
    }
}

/// Why a locus produced no clique pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// One side has no transcripts; pairs need both.
    OneSided { refr_transcripts: usize, pred_transcripts: usize },

    /// A side exceeds the per-locus transcript ceiling.
    TooManyTranscripts {
        refr_transcripts: usize,
        pred_transcripts: usize,
        limit: usize,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::OneSided { .. } => write!(f, "one-sided"),
            SkipReason::TooManyTranscripts { .. } => write!(f, "too-many-transcripts"),
        }
    }
}

/// Output of the greedy pairing pass.
#[derive(Debug, Clone, Default)]
pub struct Pairing {
    pub reported: Vec<Arc<CliquePair>>,
    pub unique_refr: Vec<Arc<TranscriptClique>>,
    pub unique_pred: Vec<Arc<TranscriptClique>>,
}

/// A genomic interval holding overlapping reference and prediction genes.
#[derive(Debug, Clone)]
pub struct Locus {
    seqid: String,
    range: Interval,
    genes: Vec<Gene>,
    refr_genes: HashSet<usize>,
    pred_genes: HashSet<usize>,
    refr_cliques: Memo<Vec<Arc<TranscriptClique>>>,
    pred_cliques: Memo<Vec<Arc<TranscriptClique>>>,
    clique_pairs: Memo<Vec<Arc<CliquePair>>>,
    pairing: Memo<Pairing>,
    skip: Option<SkipReason>,
    pairing_attempts: usize,
}

impl Locus {
    pub fn new(seqid: impl Into<String>) -> Self {
        Self {
            seqid: seqid.into(),
            range: Interval::EMPTY,
            genes: Vec::new(),
            refr_genes: HashSet::new(),
            pred_genes: HashSet::new(),
            refr_cliques: Memo::NotComputed,
            pred_cliques: Memo::NotComputed,
            clique_pairs: Memo::NotComputed,
            pairing: Memo::NotComputed,
            skip: None,
            pairing_attempts: 0,
        }
    }

    // -----------------------
    // Gene management
    // -----------------------

    /// Append a gene and merge its interval into the locus range.
    ///
    /// Adding the same gene twice is not guarded against.
    pub fn add_gene(&mut self, gene: Gene, provenance: Provenance) {
        debug_assert_eq!(gene.seqid, self.seqid, "gene {} is on another sequence", gene.id);
        debug_assert!(
            !self.clique_pairs.is_computed(),
            "gene {} added after clique pairs were formed",
            gene.id
        );

        self.range = self.range.join(gene.interval);

        let idx = self.genes.len();
        self.genes.push(gene);
        match provenance {
            Provenance::Reference => self.refr_genes.insert(idx),
            Provenance::Prediction => self.pred_genes.insert(idx),
        };
        debug_assert!(!(self.refr_genes.contains(&idx) && self.pred_genes.contains(&idx)));
    }

    pub fn add_reference_gene(&mut self, gene: Gene) {
        self.add_gene(gene, Provenance::Reference);
    }

    pub fn add_prediction_gene(&mut self, gene: Gene) {
        self.add_gene(gene, Provenance::Prediction);
    }

    pub fn seqid(&self) -> &str {
        &self.seqid
    }

    pub fn range(&self) -> Interval {
        self.range
    }

    pub fn start(&self) -> u64 {
        self.range.start
    }

    pub fn end(&self) -> u64 {
        self.range.end
    }

    pub fn length(&self) -> u64 {
        self.range.len()
    }

    fn side(&self, provenance: Provenance) -> &HashSet<usize> {
        match provenance {
            Provenance::Reference => &self.refr_genes,
            Provenance::Prediction => &self.pred_genes,
        }
    }

    /// Genes of one side, in insertion order.
    fn side_genes(&self, provenance: Provenance) -> impl Iterator<Item = &Gene> {
        let side = self.side(provenance);
        self.genes
            .iter()
            .enumerate()
            .filter(move |(i, _)| side.contains(i))
            .map(|(_, g)| g)
    }

    // -----------------------
    // Queries (fresh, sorted)
    // -----------------------

    /// All genes, sorted by interval.
    pub fn all_genes(&self) -> Vec<&Gene> {
        let mut out: Vec<&Gene> = self.genes.iter().collect();
        out.sort_by_key(|g| g.interval);
        out
    }

    /// Genes of one side, sorted by interval.
    pub fn genes(&self, provenance: Provenance) -> Vec<&Gene> {
        let mut out: Vec<&Gene> = self.side_genes(provenance).collect();
        out.sort_by_key(|g| g.interval);
        out
    }

    /// Gene ids of one side, sorted lexicographically.
    pub fn gene_ids(&self, provenance: Provenance) -> Vec<&str> {
        let mut out: Vec<&str> = self.side_genes(provenance).map(|g| g.id.as_str()).collect();
        out.sort_unstable();
        out
    }

    /// Transcripts of one side, sorted by interval.
    pub fn transcripts(&self, provenance: Provenance) -> Vec<&Arc<Transcript>> {
        let mut out: Vec<&Arc<Transcript>> = self
            .side_genes(provenance)
            .flat_map(|g| g.transcripts().iter())
            .collect();
        out.sort_by_key(|t| t.interval);
        out
    }

    /// Transcript ids of one side, sorted lexicographically.
    pub fn transcript_ids(&self, provenance: Provenance) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .side_genes(provenance)
            .flat_map(|g| g.transcripts().iter().map(|t| t.id.as_str()))
            .collect();
        out.sort_unstable();
        out
    }

    pub fn num_genes(&self, provenance: Provenance) -> usize {
        self.side(provenance).len()
    }

    pub fn num_transcripts(&self, provenance: Provenance) -> usize {
        self.side_genes(provenance).map(|g| g.num_transcripts()).sum()
    }

    pub fn num_exons(&self, provenance: Provenance) -> usize {
        self.side_genes(provenance).map(|g| g.num_exons()).sum()
    }

    /// CDS length of the last transcript of one side, in interval order.
    ///
    /// This is neither a sum nor a maximum. It matches the existing comparison
    /// reports, which use the same last-wins value; 0 if the side is empty.
    pub fn cds_length(&self, provenance: Provenance) -> u64 {
        self.transcripts(provenance)
            .last()
            .map(|t| t.cds_length())
            .unwrap_or(0)
    }

    /// Order loci by range: start, then end.
    pub fn cmp_by_range(&self, other: &Locus) -> Ordering {
        (self.range.start, self.range.end).cmp(&(other.range.start, other.range.end))
    }

    // -----------------------
    // Cliques and pairs
    // -----------------------

    /// Cliques of one side; `None` until pairs were formed, or if skipped.
    pub fn cliques(&self, provenance: Provenance) -> Option<&[Arc<TranscriptClique>]> {
        let memo = match provenance {
            Provenance::Reference => &self.refr_cliques,
            Provenance::Prediction => &self.pred_cliques,
        };
        memo.get().map(|v| v.as_slice())
    }

    /// Number of alternative interpretations on one side (its clique count).
    pub fn splice_complexity(&self, provenance: Provenance) -> Option<usize> {
        self.cliques(provenance).map(|c| c.len())
    }

    /// True if either side needed more than one clique.
    pub fn is_complex(&self) -> bool {
        self.splice_complexity(Provenance::Reference).unwrap_or(0) > 1
            || self.splice_complexity(Provenance::Prediction).unwrap_or(0) > 1
    }

    /// Why no pairs were formed, if they were not.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.skip
    }

    /// How many times the clique/pair computation actually ran (0 or 1).
    pub fn pairing_attempts(&self) -> usize {
        self.pairing_attempts
    }

    /// Form every (reference clique, prediction clique) pair.
    ///
    /// `max_transcripts` caps the transcripts per side that will be enumerated
    /// (0 = no cap). A locus with an empty side, or a side above the cap, is
    /// skipped: the result is `None` and stays `None` on later calls.
    pub fn get_clique_pairs(&mut self, max_transcripts: usize) -> Option<&[Arc<CliquePair>]> {
        if !self.clique_pairs.is_computed() {
            self.form_clique_pairs(max_transcripts);
        }
        self.clique_pairs.get().map(|v| v.as_slice())
    }

    fn form_clique_pairs(&mut self, max_transcripts: usize) {
        debug_assert!(!self.genes.is_empty(), "clique pairs requested on an empty locus");
        self.pairing_attempts += 1;

        let refr_trans: Vec<Arc<Transcript>> = self
            .side_genes(Provenance::Reference)
            .flat_map(|g| g.transcripts().iter().cloned())
            .collect();
        let pred_trans: Vec<Arc<Transcript>> = self
            .side_genes(Provenance::Prediction)
            .flat_map(|g| g.transcripts().iter().cloned())
            .collect();

        let (nrefr, npred) = (refr_trans.len(), pred_trans.len());
        let within = |n: usize| max_transcripts == 0 || n <= max_transcripts;

        let skip = if nrefr == 0 || npred == 0 {
            debug!(
                "skipping locus {}{} with {} reference transcripts and {} prediction transcripts \
                 (must have at least 1 transcript for both)",
                self.seqid, self.range, nrefr, npred
            );
            Some(SkipReason::OneSided {
                refr_transcripts: nrefr,
                pred_transcripts: npred,
            })
        } else if !within(nrefr) || !within(npred) {
            debug!(
                "skipping locus {}{} with {} reference transcripts and {} prediction transcripts \
                 (exceeds reasonable limit of {})",
                self.seqid, self.range, nrefr, npred, max_transcripts
            );
            Some(SkipReason::TooManyTranscripts {
                refr_transcripts: nrefr,
                pred_transcripts: npred,
                limit: max_transcripts,
            })
        } else {
            None
        };

        if skip.is_some() {
            self.skip = skip;
            self.refr_cliques = Memo::Empty;
            self.pred_cliques = Memo::Empty;
            self.clique_pairs = Memo::Empty;
            return;
        }

        let refr_cliques: Vec<Arc<TranscriptClique>> =
            enumerate_cliques(&refr_trans).into_iter().map(Arc::new).collect();
        let pred_cliques: Vec<Arc<TranscriptClique>> =
            enumerate_cliques(&pred_trans).into_iter().map(Arc::new).collect();

        let mut pairs: Vec<Arc<CliquePair>> = Vec::with_capacity(refr_cliques.len() * pred_cliques.len());
        for refr in &refr_cliques {
            for pred in &pred_cliques {
                pairs.push(Arc::new(CliquePair::new(
                    self.seqid.clone(),
                    Arc::clone(refr),
                    Arc::clone(pred),
                    self.range,
                )));
            }
        }

        debug!(
            "locus {}{}: {} reference cliques, {} prediction cliques, {} pairs",
            self.seqid,
            self.range,
            refr_cliques.len(),
            pred_cliques.len(),
            pairs.len()
        );

        self.refr_cliques = Memo::Computed(refr_cliques);
        self.pred_cliques = Memo::Computed(pred_cliques);
        self.clique_pairs = Memo::Computed(pairs);
    }

    /// Select a mutually exclusive set of pairs, best first.
    ///
    /// Walks the pairs once in descending quality and accepts a pair when none
    /// of its transcripts (on either side) was claimed by an earlier accepted
    /// pair. This is a greedy sweep, not an optimal matching. Cliques not used
    /// by any accepted pair become the locus' unique cliques.
    ///
    /// Returns `None` when no pairs exist (not formed yet, or skipped).
    pub fn find_best_pairs(&mut self) -> Option<&[Arc<CliquePair>]> {
        if !self.pairing.is_computed() {
            self.pairing = match self.clique_pairs.get() {
                Some(pairs) if !pairs.is_empty() => Memo::Computed(self.select_pairs(pairs)),
                _ => return None,
            };
        }
        self.pairing.get().map(|p| p.reported.as_slice())
    }

    fn select_pairs(&self, pairs: &[Arc<CliquePair>]) -> Pairing {
        let mut ranked: Vec<Arc<CliquePair>> = pairs.to_vec();
        ranked.sort_by(|a, b| a.compare_reverse(b));

        let mut refr_claimed: HashSet<String> = HashSet::new();
        let mut pred_claimed: HashSet<String> = HashSet::new();
        let mut reported: Vec<Arc<CliquePair>> = Vec::new();

        for pair in ranked {
            if pair.refr_clique().has_id_in(&refr_claimed) || pair.pred_clique().has_id_in(&pred_claimed) {
                continue;
            }
            pair.refr_clique().put_ids_in(&mut refr_claimed);
            pair.pred_clique().put_ids_in(&mut pred_claimed);
            reported.push(pair);
        }

        let unique = |cliques: &[Arc<TranscriptClique>], side: fn(&CliquePair) -> &Arc<TranscriptClique>| {
            cliques
                .iter()
                .filter(|c| !reported.iter().any(|p| Arc::ptr_eq(side(&**p), *c)))
                .cloned()
                .collect::<Vec<_>>()
        };

        let unique_refr = unique(self.cliques(Provenance::Reference).unwrap_or(&[]), CliquePair::refr_clique);
        let unique_pred = unique(self.cliques(Provenance::Prediction).unwrap_or(&[]), CliquePair::pred_clique);

        Pairing {
            reported,
            unique_refr,
            unique_pred,
        }
    }

    /// Pairs chosen by `find_best_pairs`, if it ran and found any.
    pub fn reported_pairs(&self) -> Option<&[Arc<CliquePair>]> {
        self.pairing.get().map(|p| p.reported.as_slice())
    }

    /// Cliques of one side left out of every reported pair.
    pub fn unique_cliques(&self, provenance: Provenance) -> Option<&[Arc<TranscriptClique>]> {
        self.pairing.get().map(|p| match provenance {
            Provenance::Reference => p.unique_refr.as_slice(),
            Provenance::Prediction => p.unique_pred.as_slice(),
        })
    }

    /// Best-ranked pair (reported or not) whose reference clique is `refr`.
    pub fn optimal_clique_pair(&self, refr: &Arc<TranscriptClique>) -> Option<&Arc<CliquePair>> {
        self.clique_pairs
            .get()?
            .iter()
            .filter(|p| Arc::ptr_eq(p.refr_clique(), refr))
            .max_by(|a, b| a.compare_direct(b))
    }
}
