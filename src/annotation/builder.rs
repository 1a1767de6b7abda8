use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};

use crate::annotation::io::{AnnotationReader, AnnotationRecord, ParseError};
use crate::locus::Locus;
use crate::model::gene::Gene;
use crate::model::transcript::Transcript;
use crate::types::{Interval, Provenance, Strand};

/// Configure which feature types and attribute keys define the gene →
/// transcript → exon/CDS hierarchy.
///
/// Notes:
/// - We allow multiple keys per category; first present wins.
/// - GFF3 links children through `Parent` (comma-separated lists allowed).
/// - GTF has no gene/transcript lines as a rule; `gene_id`/`transcript_id`
///   on exon and CDS lines are used instead.
#[derive(Debug, Clone)]
pub struct FeatureKeys {
    pub gene_types: Vec<String>,
    pub transcript_types: Vec<String>,
    pub exon_types: Vec<String>,
    pub cds_types: Vec<String>,

    pub id_keys: Vec<String>,
    pub parent_keys: Vec<String>,

    /// GTF-style gene linkage on transcript/exon/CDS lines.
    pub gene_id_keys: Vec<String>,
    /// GTF-style transcript linkage on exon/CDS lines.
    pub transcript_id_keys: Vec<String>,
}

impl Default for FeatureKeys {
    fn default() -> Self {
        Self {
            gene_types: vec!["gene".into()],
            transcript_types: vec!["mRNA".into(), "transcript".into()],
            exon_types: vec!["exon".into()],
            cds_types: vec!["CDS".into()],

            id_keys: vec!["ID".into()],
            parent_keys: vec!["Parent".into()],

            gene_id_keys: vec!["gene_id".into()],
            transcript_id_keys: vec!["transcript_id".into()],
        }
    }
}

#[derive(Debug)]
struct GeneDraft {
    id: String,
    seqid: String,
    strand: Strand,
    interval: Interval,
}

#[derive(Debug)]
struct TranscriptDraft {
    id: String,
    seqid: String,
    strand: Strand,
    interval: Interval,
    gene_key: Option<String>,
    exons: Vec<Interval>,
    cds: Vec<Interval>,
}

/// Collects genes (with transcripts, exons and CDS) from a GTF/GFF3 file.
///
/// Genes without any transcript are dropped; transcripts without a
/// resolvable gene are dropped with a warning. A transcript with CDS but no
/// exon lines gets its CDS blocks as exons.
#[derive(Debug, Clone, Default)]
pub struct AnnotationBuilder {
    pub keys: FeatureKeys,
}

impl AnnotationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: feature types treated as genes.
    pub fn gene_types(mut self, types: &[&str]) -> Self {
        self.keys.gene_types = types.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Convenience: feature types treated as transcripts (e.g. `mRNA`).
    pub fn transcript_types(mut self, types: &[&str]) -> Self {
        self.keys.transcript_types = types.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Convenience: set parent keys for GFF3 linking (usually ["Parent"]).
    pub fn parent_keys(mut self, keys: &[&str]) -> Self {
        self.keys.parent_keys = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Convenience: set GTF-style gene id key(s).
    pub fn gene_id_keys(mut self, keys: &[&str]) -> Self {
        self.keys.gene_id_keys = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Convenience: set GTF-style transcript id key(s).
    pub fn transcript_id_keys(mut self, keys: &[&str]) -> Self {
        self.keys.transcript_id_keys = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Collect genes from anything implementing `BufRead`.
    ///
    /// Genes come back in first-seen order.
    pub fn build_from_reader<R: BufRead>(&self, reader: R) -> Result<Vec<Gene>, ParseError> {
        let keys = &self.keys;

        let mut genes: Vec<GeneDraft> = Vec::new();
        let mut gene_key_to_id: HashMap<String, usize> = HashMap::new();
        let mut txs: Vec<TranscriptDraft> = Vec::new();
        let mut tx_key_to_id: HashMap<String, usize> = HashMap::new();

        for rec in AnnotationReader::new(reader).records() {
            let rec = rec?;

            if rec.is_one_of(&keys.gene_types) {
                let Some(key) = rec.pick_first_attr(&keys.id_keys).or_else(|| rec.pick_first_attr(&keys.gene_id_keys))
                else {
                    warn!("line {}: {} feature without an ID, ignored", rec.line_no, rec.feature_type);
                    continue;
                };
                let gid = intern_gene(&mut genes, &mut gene_key_to_id, &key, &rec);
                genes[gid].interval = genes[gid].interval.join(rec.interval);
            } else if rec.is_one_of(&keys.transcript_types) {
                let Some(key) = rec
                    .pick_first_attr(&keys.id_keys)
                    .or_else(|| rec.pick_first_attr(&keys.transcript_id_keys))
                else {
                    warn!("line {}: {} feature without an ID, ignored", rec.line_no, rec.feature_type);
                    continue;
                };
                let gene_key = rec
                    .pick_first_list(&keys.parent_keys)
                    .into_iter()
                    .next()
                    .or_else(|| rec.pick_first_attr(&keys.gene_id_keys));
                let tid = intern_tx(&mut txs, &mut tx_key_to_id, &key, &rec);
                txs[tid].interval = txs[tid].interval.join(rec.interval);
                if gene_key.is_some() {
                    txs[tid].gene_key = gene_key;
                }
            } else {
                let is_exon = rec.is_one_of(&keys.exon_types);
                let is_cds = rec.is_one_of(&keys.cds_types);
                if !is_exon && !is_cds {
                    continue;
                }

                let mut tx_keys = rec.pick_first_list(&keys.transcript_id_keys);
                if tx_keys.is_empty() {
                    tx_keys = rec.pick_first_list(&keys.parent_keys);
                }
                if tx_keys.is_empty() {
                    warn!("line {}: {} feature without a parent transcript, ignored", rec.line_no, rec.feature_type);
                    continue;
                }

                let gene_key = rec.pick_first_attr(&keys.gene_id_keys);
                for tx_key in tx_keys {
                    let tid = intern_tx(&mut txs, &mut tx_key_to_id, &tx_key, &rec);
                    let tx = &mut txs[tid];
                    if tx.gene_key.is_none() {
                        tx.gene_key = gene_key.clone();
                    }
                    if is_exon {
                        tx.exons.push(rec.interval);
                    } else {
                        tx.cds.push(rec.interval);
                    }
                }
            }
        }

        // Link transcripts into genes, creating implied (GTF) genes on the way.
        let mut children: Vec<Vec<Transcript>> = Vec::new();
        children.resize_with(genes.len(), Vec::new);

        for draft in txs {
            let Some(gene_key) = draft.gene_key.clone() else {
                warn!("transcript {} has no parent gene, ignored", draft.id);
                continue;
            };

            let gid = match gene_key_to_id.get(&gene_key) {
                Some(&gid) => gid,
                None => {
                    let gid = genes.len();
                    genes.push(GeneDraft {
                        id: gene_key.clone(),
                        seqid: draft.seqid.clone(),
                        strand: draft.strand,
                        interval: Interval::EMPTY,
                    });
                    gene_key_to_id.insert(gene_key, gid);
                    children.push(Vec::new());
                    gid
                }
            };

            if genes[gid].seqid != draft.seqid {
                warn!(
                    "transcript {} is on {} but its gene {} is on {}, ignored",
                    draft.id, draft.seqid, genes[gid].id, genes[gid].seqid
                );
                continue;
            }

            children[gid].push(finish_transcript(draft));
        }

        let mut out: Vec<Gene> = Vec::with_capacity(genes.len());
        for (draft, txs) in genes.into_iter().zip(children) {
            if txs.is_empty() {
                debug!("gene {} has no transcripts, dropped", draft.id);
                continue;
            }
            let mut gene = Gene::new(draft.id, draft.seqid, draft.interval, draft.strand);
            for tx in txs {
                gene.add_transcript(tx);
            }
            out.push(gene);
        }

        Ok(out)
    }

    /// Collect genes from a file path.
    ///
    /// - If path ends with `.gz`, uses a gzip decoder.
    /// - Otherwise reads as plain text.
    pub fn build_from_path<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Gene>, ParseError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| ParseError::IoPath {
            path: path.display().to_string(),
            source: e,
        })?;

        let is_gz = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        let result = if is_gz {
            let decoder = flate2::read::GzDecoder::new(file);
            self.build_from_reader(BufReader::new(decoder))
        } else {
            self.build_from_reader(BufReader::new(file))
        };

        result.map_err(|e| match e {
            ParseError::IoPath { source, .. } => ParseError::IoPath {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }
}

fn intern_gene(
    genes: &mut Vec<GeneDraft>,
    gene_key_to_id: &mut HashMap<String, usize>,
    key: &str,
    rec: &AnnotationRecord,
) -> usize {
    if let Some(&gid) = gene_key_to_id.get(key) {
        return gid;
    }
    let gid = genes.len();
    genes.push(GeneDraft {
        id: key.to_string(),
        seqid: rec.seqname.clone(),
        strand: rec.strand,
        interval: Interval::EMPTY,
    });
    gene_key_to_id.insert(key.to_string(), gid);
    gid
}

fn intern_tx(
    txs: &mut Vec<TranscriptDraft>,
    tx_key_to_id: &mut HashMap<String, usize>,
    key: &str,
    rec: &AnnotationRecord,
) -> usize {
    if let Some(&tid) = tx_key_to_id.get(key) {
        return tid;
    }
    let tid = txs.len();
    txs.push(TranscriptDraft {
        id: key.to_string(),
        seqid: rec.seqname.clone(),
        strand: rec.strand,
        interval: Interval::EMPTY,
        gene_key: None,
        exons: Vec::new(),
        cds: Vec::new(),
    });
    tx_key_to_id.insert(key.to_string(), tid);
    tid
}

fn finish_transcript(draft: TranscriptDraft) -> Transcript {
    let mut tx = Transcript::new(draft.id, draft.interval, draft.strand);
    let exons = if draft.exons.is_empty() { &draft.cds } else { &draft.exons };
    for &block in exons {
        tx.add_exon(block);
    }
    for &block in &draft.cds {
        tx.add_cds(block);
    }
    tx.finalize();
    tx
}

/// Cluster genes from both annotations into loci.
///
/// Genes on the same sequence whose spans overlap (directly or through a
/// chain of overlaps) share a locus, whatever their provenance. Loci come
/// back ordered by seqid, then by range.
pub fn group_loci(reference: Vec<Gene>, prediction: Vec<Gene>) -> Vec<Locus> {
    let mut tagged: Vec<(Gene, Provenance)> = reference
        .into_iter()
        .map(|g| (g, Provenance::Reference))
        .chain(prediction.into_iter().map(|g| (g, Provenance::Prediction)))
        .collect();

    tagged.sort_by(|(a, _), (b, _)| {
        (a.seqid.as_str(), a.interval.start, a.interval.end).cmp(&(b.seqid.as_str(), b.interval.start, b.interval.end))
    });

    let mut loci: Vec<Locus> = Vec::new();
    let mut current: Option<Locus> = None;

    for (gene, provenance) in tagged {
        if let Some(locus) = current
            .as_mut()
            .filter(|l| l.seqid() == gene.seqid && l.range().overlaps(gene.interval))
        {
            locus.add_gene(gene, provenance);
            continue;
        }

        if let Some(done) = current.take() {
            loci.push(done);
        }
        let mut locus = Locus::new(gene.seqid.clone());
        locus.add_gene(gene, provenance);
        current = Some(locus);
    }
    loci.extend(current);

    loci.sort_by(|a, b| a.seqid().cmp(b.seqid()).then_with(|| a.cmp_by_range(b)));
    loci
}

// -------------------- tests --------------------
