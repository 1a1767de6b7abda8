use std::sync::Arc;

use crate::model::transcript::Transcript;
use crate::types::{Interval, Strand};

/// Gene model: a stable id, its span on `seqid`, and child transcripts.
///
/// Transcripts are held behind `Arc` so cliques and clique pairs built by a
/// locus can share them without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gene {
    pub id: String,
    pub seqid: String,
    pub interval: Interval,
    pub strand: Strand,
    transcripts: Vec<Arc<Transcript>>,
}

impl Gene {
    pub fn new(id: impl Into<String>, seqid: impl Into<String>, interval: Interval, strand: Strand) -> Self {
        Self {
            id: id.into(),
            seqid: seqid.into(),
            interval,
            strand,
            transcripts: Vec::new(),
        }
    }

    /// Add a transcript and widen the gene span to cover it.
    pub fn add_transcript(&mut self, tx: Transcript) {
        self.interval = self.interval.join(tx.interval);
        self.transcripts.push(Arc::new(tx));
    }

    pub fn transcripts(&self) -> &[Arc<Transcript>] {
        &self.transcripts
    }

    pub fn num_transcripts(&self) -> usize {
        self.transcripts.len()
    }

    /// Exon count summed over all transcripts.
    pub fn num_exons(&self) -> usize {
        self.transcripts.iter().map(|t| t.num_exons()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: &str, start: u64, end: u64) -> Transcript {
        let mut t = Transcript::new(id, Interval::EMPTY, Strand::Plus);
        t.add_exon(Interval::new(start, end));
        t.finalize();
        t
    }

    #[test]
    fn add_transcript_widens_span() {
        let mut g = Gene::new("G1", "chr1", Interval::new(100, 200), Strand::Plus);
        g.add_transcript(tx("T1", 120, 180));
        assert_eq!(g.interval, Interval::new(100, 200));

        g.add_transcript(tx("T2", 150, 260));
        assert_eq!(g.interval, Interval::new(100, 260));
        assert_eq!(g.num_transcripts(), 2);
    }

    #[test]
    fn exon_count_sums_transcripts() {
        let mut g = Gene::new("G1", "chr1", Interval::EMPTY, Strand::Plus);
        let mut t = Transcript::new("T1", Interval::EMPTY, Strand::Plus);
        t.add_exon(Interval::new(1, 10));
        t.add_exon(Interval::new(20, 30));
        t.finalize();
        g.add_transcript(t);
        g.add_transcript(tx("T2", 1, 30));

        assert_eq!(g.num_exons(), 3);
        assert_eq!(g.interval, Interval::new(1, 30));
    }
}
