//! Transcript cliques: maximal sets of transcripts from one annotation whose
//! coding regions pairwise do not overlap.
//!
//! Each clique is one self-consistent reading of a locus: a set of gene
//! models that could all be expressed side by side. Alternative isoforms of
//! one gene conflict with each other and therefore land in different cliques.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::model::transcript::Transcript;
use crate::types::{merge_intervals, Interval};

/// An immutable group of mutually compatible transcripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptClique {
    transcripts: Vec<Arc<Transcript>>,
}

impl TranscriptClique {
    pub fn new(mut transcripts: Vec<Arc<Transcript>>) -> Self {
        transcripts.sort_by(|a, b| (a.interval, &a.id).cmp(&(b.interval, &b.id)));
        debug_assert!(
            transcripts
                .iter()
                .enumerate()
                .all(|(i, a)| transcripts[i + 1..].iter().all(|b| !a.conflicts_with(b))),
            "clique members must not overlap in coding space"
        );
        Self { transcripts }
    }

    pub fn transcripts(&self) -> &[Arc<Transcript>] {
        &self.transcripts
    }

    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }

    /// Summed CDS length of all members.
    pub fn cds_length(&self) -> u64 {
        self.transcripts.iter().map(|t| t.cds_length()).sum()
    }

    /// Member transcript ids, in member order.
    pub fn ids(&self) -> Vec<&str> {
        self.transcripts.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn id_set(&self) -> HashSet<&str> {
        self.transcripts.iter().map(|t| t.id.as_str()).collect()
    }

    /// True if any member id is present in `ids`.
    pub fn has_id_in(&self, ids: &HashSet<String>) -> bool {
        self.transcripts.iter().any(|t| ids.contains(&t.id))
    }

    /// Insert every member id into `ids`.
    pub fn put_ids_in(&self, ids: &mut HashSet<String>) {
        for t in &self.transcripts {
            ids.insert(t.id.clone());
        }
    }

    /// Union of the members' CDS segments, sorted and merged.
    pub fn merged_cds(&self) -> Vec<Interval> {
        let all: Vec<Interval> = self.transcripts.iter().flat_map(|t| t.cds().iter().copied()).collect();
        merge_intervals(&all)
    }

    /// Union of the members' exons, sorted and merged.
    pub fn merged_exons(&self) -> Vec<Interval> {
        let all: Vec<Interval> = self.transcripts.iter().flat_map(|t| t.exons().iter().copied()).collect();
        merge_intervals(&all)
    }
}

impl fmt::Display for TranscriptClique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ids().join(","))
    }
}

/// Enumerate every maximal clique of mutually compatible transcripts.
///
/// Two transcripts are compatible when their coding footprints share no
/// base (see [`Transcript::conflicts_with`]). The result covers every input
/// transcript at least once. Output is deterministic: transcripts are ordered
/// by (interval, id), and cliques are ordered by their member positions in
/// that order.
///
/// Runs Bron–Kerbosch with pivoting on the compatibility graph, so arbitrary
/// conflict graphs (not only interval chains) are handled. Cost is
/// exponential in the worst case; callers bound the input size.
pub fn enumerate_cliques(transcripts: &[Arc<Transcript>]) -> Vec<TranscriptClique> {
    if transcripts.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<Arc<Transcript>> = transcripts.to_vec();
    sorted.sort_by(|a, b| (a.interval, &a.id).cmp(&(b.interval, &b.id)));

    let n = sorted.len();
    let mut compatible = vec![vec![false; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let ok = !sorted[i].conflicts_with(&sorted[j]);
            compatible[i][j] = ok;
            compatible[j][i] = ok;
        }
    }

    let mut found: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    bron_kerbosch(&mut current, (0..n).collect(), Vec::new(), &compatible, &mut found);

    found.sort();

    found
        .into_iter()
        .map(|members| TranscriptClique::new(members.into_iter().map(|i| Arc::clone(&sorted[i])).collect()))
        .collect()
}

fn bron_kerbosch(
    current: &mut Vec<usize>,
    mut candidates: Vec<usize>,
    mut excluded: Vec<usize>,
    adj: &[Vec<bool>],
    out: &mut Vec<Vec<usize>>,
) {
    if candidates.is_empty() && excluded.is_empty() {
        let mut clique = current.clone();
        clique.sort_unstable();
        out.push(clique);
        return;
    }

    // Pivot on the vertex with the most candidate neighbours.
    let pivot = candidates
        .iter()
        .chain(excluded.iter())
        .copied()
        .max_by_key(|&u| candidates.iter().filter(|&&v| adj[u][v]).count());

    let branch: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&v| pivot.map_or(true, |u| !adj[u][v]))
        .collect();

    for v in branch {
        let next_candidates: Vec<usize> = candidates.iter().copied().filter(|&w| adj[v][w]).collect();
        let next_excluded: Vec<usize> = excluded.iter().copied().filter(|&w| adj[v][w]).collect();

        current.push(v);
        bron_kerbosch(current, next_candidates, next_excluded, adj, out);
        current.pop();

        candidates.retain(|&w| w != v);
        excluded.push(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Strand;

    fn tx(id: &str, cds: &[(u64, u64)]) -> Arc<Transcript> {
        let mut t = Transcript::new(id, Interval::EMPTY, Strand::Plus);
        for &(s, e) in cds {
            t.add_exon(Interval::new(s, e));
            t.add_cds(Interval::new(s, e));
        }
        t.finalize();
        Arc::new(t)
    }

    fn id_lists(cliques: &[TranscriptClique]) -> Vec<Vec<&str>> {
        cliques.iter().map(|c| c.ids()).collect()
    }

    #[test]
    fn two_conflicting_and_one_free() {
        let txs = vec![tx("T1", &[(1, 100)]), tx("T2", &[(50, 150)]), tx("T3", &[(200, 300)])];
        let cliques = enumerate_cliques(&txs);
        assert_eq!(id_lists(&cliques), vec![vec!["T1", "T3"], vec!["T2", "T3"]]);
    }

    #[test]
    fn empty_input_has_no_cliques() {
        assert!(enumerate_cliques(&[]).is_empty());
    }

    #[test]
    fn single_transcript_is_one_clique() {
        let cliques = enumerate_cliques(&[tx("T1", &[(10, 20)])]);
        assert_eq!(id_lists(&cliques), vec![vec!["T1"]]);
        assert_eq!(cliques[0].cds_length(), 11);
    }

    #[test]
    fn interleaved_exons_are_compatible() {
        // A and B interleave without sharing a base; C overlaps both.
        let txs = vec![
            tx("A", &[(100, 200), (400, 500)]),
            tx("B", &[(250, 350), (600, 700)]),
            tx("C", &[(180, 260)]),
        ];
        let cliques = enumerate_cliques(&txs);
        assert_eq!(id_lists(&cliques), vec![vec!["A", "B"], vec!["C"]]);
    }

    #[test]
    fn non_chain_conflict_graph() {
        // Conflict cycle A-B, B-C, C-D, D-A: maximal sets are {A,C} and {B,D}.
        let txs = vec![
            tx("A", &[(1, 10), (100, 110)]),
            tx("B", &[(5, 15), (50, 60)]),
            tx("C", &[(55, 65), (200, 210)]),
            tx("D", &[(105, 115), (205, 215)]),
        ];
        let cliques = enumerate_cliques(&txs);
        assert_eq!(id_lists(&cliques), vec![vec!["A", "C"], vec!["B", "D"]]);
    }

    #[test]
    fn every_transcript_covered_and_no_clique_conflicts() {
        let txs = vec![
            tx("T1", &[(1, 100)]),
            tx("T2", &[(50, 150)]),
            tx("T3", &[(120, 220)]),
            tx("T4", &[(210, 300)]),
            tx("T5", &[(400, 500)]),
        ];
        let cliques = enumerate_cliques(&txs);

        for t in &txs {
            assert!(cliques.iter().any(|c| c.ids().contains(&t.id.as_str())), "{} not covered", t.id);
        }
        for c in &cliques {
            let members = c.transcripts();
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    assert!(!a.conflicts_with(b));
                }
            }
            // maximal: nothing else can be added
            for t in &txs {
                if c.ids().contains(&t.id.as_str()) {
                    continue;
                }
                assert!(members.iter().any(|m| m.conflicts_with(t)));
            }
        }
    }

    #[test]
    fn id_set_membership() {
        let clique = TranscriptClique::new(vec![tx("T1", &[(1, 10)]), tx("T3", &[(20, 30)])]);
        let mut claimed: HashSet<String> = HashSet::new();
        assert!(!clique.has_id_in(&claimed));

        claimed.insert("T3".to_string());
        assert!(clique.has_id_in(&claimed));

        clique.put_ids_in(&mut claimed);
        assert_eq!(claimed.len(), 2);
        assert_eq!(clique.to_string(), "T1,T3");
    }
}
