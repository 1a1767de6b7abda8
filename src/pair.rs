use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::clique::TranscriptClique;
use crate::model::types::{PairComparison, PairRelation};
use crate::types::Interval;

/// A candidate correspondence between one reference clique and one
/// prediction clique of the same locus.
///
/// Ordering ranks pairs by match quality: the greater pair is the better
/// match. The order is total; pairs only compare equal when they hold the same
/// member ids on both sides.
#[derive(Debug, Clone)]
pub struct CliquePair {
    pub seqid: String,
    pub range: Interval,
    refr: Arc<TranscriptClique>,
    pred: Arc<TranscriptClique>,
    comparison: PairComparison,
}

impl CliquePair {
    pub fn new(
        seqid: impl Into<String>,
        refr: Arc<TranscriptClique>,
        pred: Arc<TranscriptClique>,
        range: Interval,
    ) -> Self {
        let comparison = PairComparison::from_blocks(
            &refr.merged_cds(),
            &pred.merged_cds(),
            &refr.merged_exons(),
            &pred.merged_exons(),
        );
        Self {
            seqid: seqid.into(),
            range,
            refr,
            pred,
            comparison,
        }
    }

    pub fn refr_clique(&self) -> &Arc<TranscriptClique> {
        &self.refr
    }

    pub fn pred_clique(&self) -> &Arc<TranscriptClique> {
        &self.pred
    }

    pub fn comparison(&self) -> &PairComparison {
        &self.comparison
    }

    pub fn relation(&self) -> PairRelation {
        self.comparison.relation
    }

    pub fn is_exact_match(&self) -> bool {
        self.comparison.relation == PairRelation::Exact
    }

    /// Same order as `Ord`, spelled out for call sites that pick a winner.
    pub fn compare_direct(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    /// Best pair first.
    pub fn compare_reverse(&self, other: &Self) -> Ordering {
        other.cmp(self)
    }
}

impl Ord for CliquePair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparison
            .quality_cmp(&other.comparison)
            // Tie-break: lexicographically smaller ids rank higher.
            .then_with(|| other.refr.ids().cmp(&self.refr.ids()))
            .then_with(|| other.pred.ids().cmp(&self.pred.ids()))
    }
}

impl PartialOrd for CliquePair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CliquePair {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CliquePair {}

impl fmt::Display for CliquePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}\t{}\t{}\t{}",
            self.seqid, self.range, self.refr, self.pred, self.comparison.relation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transcript::Transcript;
    use crate::types::Strand;

    fn clique(txs: &[(&str, u64, u64)]) -> Arc<TranscriptClique> {
        let members = txs
            .iter()
            .map(|&(id, s, e)| {
                let mut t = Transcript::new(id, Interval::EMPTY, Strand::Plus);
                t.add_exon(Interval::new(s, e));
                t.add_cds(Interval::new(s, e));
                t.finalize();
                Arc::new(t)
            })
            .collect();
        Arc::new(TranscriptClique::new(members))
    }

    fn pair(r: &Arc<TranscriptClique>, p: &Arc<TranscriptClique>) -> CliquePair {
        CliquePair::new("chr1", Arc::clone(r), Arc::clone(p), Interval::new(1, 1000))
    }

    #[test]
    fn exact_pair_ranks_above_overlap() {
        let r = clique(&[("R1", 100, 200)]);
        let exact = pair(&r, &clique(&[("P1", 100, 200)]));
        let partial = pair(&r, &clique(&[("P2", 150, 260)]));

        assert!(exact.is_exact_match());
        assert_eq!(partial.relation(), PairRelation::Overlap);
        assert_eq!(exact.compare_direct(&partial), Ordering::Greater);
        assert_eq!(exact.compare_reverse(&partial), Ordering::Less);
    }

    #[test]
    fn equal_scores_break_ties_on_ids() {
        let r = clique(&[("R1", 100, 200)]);
        let a = pair(&r, &clique(&[("PA", 100, 200)]));
        let b = pair(&r, &clique(&[("PB", 100, 200)]));

        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.cmp(&b), Ordering::Greater);

        let mut pairs = vec![b.clone(), a.clone()];
        pairs.sort_by(|x, y| x.compare_reverse(y));
        assert_eq!(pairs[0].pred_clique().ids(), vec!["PA"]);
    }

    #[test]
    fn display_lists_both_cliques() {
        let p = pair(&clique(&[("R1", 1, 10), ("R2", 20, 30)]), &clique(&[("P1", 1, 30)]));
        assert_eq!(p.to_string(), "chr1[1, 1000]\tR1,R2\tP1\tOverlap");
    }
}
