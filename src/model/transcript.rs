use crate::types::{merge_intervals, shared_len, total_len, Interval, Strand};
use serde::{Deserialize, Serialize};

/// Transcript model (mRNA): span, exon blocks and coding segments.
///
/// Coordinates are 1-based, closed. Call `finalize()` after the last
/// `add_exon`/`add_cds` so blocks are sorted and merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub interval: Interval,
    pub strand: Strand,
    exons: Vec<Interval>,
    cds: Vec<Interval>,
    finalized: bool,
}

impl Transcript {
    pub fn new(id: impl Into<String>, interval: Interval, strand: Strand) -> Self {
        Self {
            id: id.into(),
            interval,
            strand,
            exons: Vec::new(),
            cds: Vec::new(),
            finalized: false,
        }
    }

    pub fn add_exon(&mut self, block: Interval) {
        self.exons.push(block);
        self.finalized = false;
    }

    pub fn add_cds(&mut self, block: Interval) {
        self.cds.push(block);
        self.finalized = false;
    }

    pub fn exons(&self) -> &[Interval] {
        &self.exons
    }

    pub fn cds(&self) -> &[Interval] {
        &self.cds
    }

    pub fn num_exons(&self) -> usize {
        self.exons.len()
    }

    /// Sorts and merges exon and CDS blocks, and widens the span to cover them.
    pub fn finalize(&mut self) {
        self.exons = merge_intervals(&self.exons);
        self.cds = merge_intervals(&self.cds);

        for block in self.exons.iter().chain(self.cds.iter()) {
            self.interval = self.interval.join(*block);
        }
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn cds_length(&self) -> u64 {
        total_len(&self.cds)
    }

    /// Blocks used to decide whether two transcripts can coexist:
    /// CDS if present, otherwise exons, otherwise the whole span.
    pub fn coding_footprint(&self) -> Vec<Interval> {
        if !self.cds.is_empty() {
            self.cds.clone()
        } else if !self.exons.is_empty() {
            self.exons.clone()
        } else {
            vec![self.interval]
        }
    }

    /// True if the two coding footprints share at least one base.
    pub fn conflicts_with(&self, other: &Transcript) -> bool {
        debug_assert!(self.is_finalized() && other.is_finalized(), "conflict test on unfinalized transcript");
        if !self.interval.overlaps(other.interval) {
            return false;
        }
        shared_len(&self.coding_footprint(), &other.coding_footprint()) > 0
    }
}
