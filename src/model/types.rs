use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::types::{shared_len, total_len, Interval};

/// Structural relationship between a reference and a prediction clique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PairRelation {
    /// Identical CDS segments and identical exon structure.
    Exact,

    /// Identical CDS segments; exon (UTR) structure differs.
    CdsMatch,

    /// At least one shared coding base, but CDS structures differ.
    Overlap,

    /// No shared coding base. Two non-coding cliques are compared on exons.
    Disjoint,
}

impl fmt::Display for PairRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PairRelation::Exact => "Exact",
            PairRelation::CdsMatch => "CdsMatch",
            PairRelation::Overlap => "Overlap",
            PairRelation::Disjoint => "Disjoint",
        };
        write!(f, "{s}")
    }
}

impl PairRelation {
    /// Numeric ranking used for comparisons.
    /// Higher is better.
    pub fn rank(self) -> u8 {
        match self {
            PairRelation::Exact => 3,
            PairRelation::CdsMatch => 2,
            PairRelation::Overlap => 1,
            PairRelation::Disjoint => 0,
        }
    }
}

impl Ord for PairRelation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for PairRelation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Base counts behind a `PairRelation`, computed on the merged CDS and exon
/// blocks of each clique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairComparison {
    pub relation: PairRelation,
    pub shared_cds_bp: u64,
    pub refr_cds_bp: u64,
    pub pred_cds_bp: u64,
    pub shared_exon_bp: u64,
    pub refr_exon_bp: u64,
    pub pred_exon_bp: u64,
}

impl PairComparison {
    /// Compare two block sets. Inputs must be sorted and merged.
    pub fn from_blocks(
        refr_cds: &[Interval],
        pred_cds: &[Interval],
        refr_exons: &[Interval],
        pred_exons: &[Interval],
    ) -> Self {
        let shared_cds_bp = shared_len(refr_cds, pred_cds);
        let shared_exon_bp = shared_len(refr_exons, pred_exons);

        // Non-coding on both sides: exons stand in for the CDS.
        let noncoding = refr_cds.is_empty() && pred_cds.is_empty();

        let relation = if noncoding {
            if !refr_exons.is_empty() && refr_exons == pred_exons {
                PairRelation::Exact
            } else if shared_exon_bp > 0 {
                PairRelation::Overlap
            } else {
                PairRelation::Disjoint
            }
        } else if refr_cds == pred_cds && refr_exons == pred_exons {
            PairRelation::Exact
        } else if refr_cds == pred_cds {
            PairRelation::CdsMatch
        } else if shared_cds_bp > 0 {
            PairRelation::Overlap
        } else {
            PairRelation::Disjoint
        };

        Self {
            relation,
            shared_cds_bp,
            refr_cds_bp: total_len(refr_cds),
            pred_cds_bp: total_len(pred_cds),
            shared_exon_bp,
            refr_exon_bp: total_len(refr_exons),
            pred_exon_bp: total_len(pred_exons),
        }
    }

    /// CDS agreement as (shared, union).
    pub fn cds_similarity(&self) -> (u64, u64) {
        (self.shared_cds_bp, self.refr_cds_bp + self.pred_cds_bp - self.shared_cds_bp)
    }

    /// Exon agreement as (shared, union).
    pub fn exon_similarity(&self) -> (u64, u64) {
        (self.shared_exon_bp, self.refr_exon_bp + self.pred_exon_bp - self.shared_exon_bp)
    }

    /// Rank two comparisons by quality. Greater is better.
    ///
    /// Not total on its own: two comparisons with identical counts compare
    /// equal; callers break ties on clique identity.
    pub fn quality_cmp(&self, other: &Self) -> Ordering {
        self.relation
            .cmp(&other.relation)
            .then_with(|| ratio_cmp(self.cds_similarity(), other.cds_similarity()))
            .then_with(|| ratio_cmp(self.exon_similarity(), other.exon_similarity()))
    }
}

/// Exact comparison of a/b against c/d; 0/0 sorts as 0.
fn ratio_cmp((a, b): (u64, u64), (c, d): (u64, u64)) -> Ordering {
    let b = b.max(1) as u128;
    let d = d.max(1) as u128;
    (a as u128 * d).cmp(&(c as u128 * b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(s: u64, e: u64) -> Interval {
        Interval::new(s, e)
    }

    #[test]
    fn relation_rank_orders_best_first() {
        let mut rels = vec![
            PairRelation::Overlap,
            PairRelation::Exact,
            PairRelation::Disjoint,
            PairRelation::CdsMatch,
        ];
        rels.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            rels,
            vec![PairRelation::Exact, PairRelation::CdsMatch, PairRelation::Overlap, PairRelation::Disjoint]
        );
    }

    #[test]
    fn classifies_cds_match_with_different_utrs() {
        let cds = [iv(150, 250)];
        let cmp = PairComparison::from_blocks(&cds, &cds, &[iv(100, 300)], &[iv(120, 260)]);
        assert_eq!(cmp.relation, PairRelation::CdsMatch);
        assert_eq!(cmp.shared_cds_bp, 101);
    }

    #[test]
    fn classifies_overlap_and_disjoint() {
        let over = PairComparison::from_blocks(&[iv(1, 100)], &[iv(50, 150)], &[iv(1, 100)], &[iv(50, 150)]);
        assert_eq!(over.relation, PairRelation::Overlap);
        assert_eq!(over.cds_similarity(), (51, 150));

        let dis = PairComparison::from_blocks(&[iv(1, 100)], &[iv(200, 300)], &[iv(1, 100)], &[iv(200, 300)]);
        assert_eq!(dis.relation, PairRelation::Disjoint);
        assert_eq!(over.quality_cmp(&dis), Ordering::Greater);
    }

    #[test]
    fn higher_overlap_ranks_better_within_relation() {
        let r = [iv(1, 100)];
        let a = PairComparison::from_blocks(&r, &[iv(10, 120)], &r, &[iv(10, 120)]);
        let b = PairComparison::from_blocks(&r, &[iv(60, 120)], &r, &[iv(60, 120)]);
        assert_eq!(a.quality_cmp(&b), Ordering::Greater);
        assert_eq!(b.quality_cmp(&a), Ordering::Less);
        assert_eq!(a.quality_cmp(&a), Ordering::Equal);
    }

    #[test]
    fn noncoding_pairs_are_classified_on_exons() {
        let dis = PairComparison::from_blocks(&[], &[], &[iv(100, 200)], &[iv(400, 500)]);
        assert_eq!(dis.relation, PairRelation::Disjoint);
        assert_eq!(dis.exon_similarity(), (0, 202));

        let part = PairComparison::from_blocks(&[], &[], &[iv(100, 200)], &[iv(150, 260)]);
        assert_eq!(part.relation, PairRelation::Overlap);
        assert_eq!(part.shared_exon_bp, 51);

        let same = PairComparison::from_blocks(&[], &[], &[iv(100, 200)], &[iv(100, 200)]);
        assert_eq!(same.relation, PairRelation::Exact);
    }

    #[test]
    fn coding_against_noncoding_is_disjoint() {
        let cmp = PairComparison::from_blocks(&[iv(120, 180)], &[], &[iv(100, 200)], &[iv(100, 200)]);
        assert_eq!(cmp.relation, PairRelation::Disjoint);
    }
}
