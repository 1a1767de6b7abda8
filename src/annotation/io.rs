use std::collections::HashMap;
use std::io::BufRead;

use crate::types::{Interval, Strand};

/// File dialect detected from attribute syntax.
///
/// - GFF3 typically uses: key=value;key2=value2
/// - GTF typically uses: key "value"; key2 "value2";
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Gff3,
    Gtf,
    Unknown,
}

/// A single parsed feature line from GTF/GFF3.
///
/// Coordinates are kept as written: 1-based, closed.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub line_no: usize,
    pub seqname: String,
    pub source: String,
    pub feature_type: String,
    pub interval: Interval,
    pub score: Option<f32>,
    pub strand: Strand,
    pub phase: Option<u8>,
    pub attrs: HashMap<String, String>,
    pub dialect: Dialect,
}

impl AnnotationRecord {
    /// Convenience: get an attribute value.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(|s| s.as_str())
    }

    pub fn is_one_of(&self, types: &[String]) -> bool {
        types.iter().any(|t| t == &self.feature_type)
    }

    pub fn pick_first_attr(&self, keys: &[String]) -> Option<String> {
        for k in keys {
            if let Some(v) = self.attr(k) {
                let v = v.trim();
                if !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
        None
    }

    /// Values of the first present key, split on ',' (GFF3 multi-parent).
    pub fn pick_first_list(&self, keys: &[String]) -> Vec<String> {
        match self.pick_first_attr(keys) {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Parsing errors for GTF/GFF3.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("I/O error while reading '{path}': {source}")]
    IoPath { path: String, source: std::io::Error },

    #[error("line {line_no}: malformed GTF/GFF line: {line}")]
    MalformedLine { line_no: usize, line: String },

    #[error("line {line_no}: bad coordinates: {line}")]
    BadCoordinates { line_no: usize, line: String },
}

/// Low-level streaming parser for GTF/GFF3 files.
///
/// Most users should **not** use this directly.
/// Instead, use [`crate::annotation::AnnotationBuilder`] to collect genes
/// from a file in one step.
///
/// # Example
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
/// use locus_compare::annotation::io::AnnotationReader;
///
/// let file = File::open("genes.gff3").unwrap();
/// let rdr = AnnotationReader::new(BufReader::new(file));
/// for rec in rdr.records() {
///     let rec = rec.unwrap();
///     println!("{} {}", rec.seqname, rec.interval);
/// }
/// ```
pub struct AnnotationReader<R: BufRead> {
    reader: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> AnnotationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line_no: 0,
        }
    }

    /// Returns an iterator over parsed records.
    ///
    /// - Skips blank lines
    /// - Skips comment and directive lines starting with '#'
    /// - Stops at a `##FASTA` section
    pub fn records(mut self) -> impl Iterator<Item = Result<AnnotationRecord, ParseError>> {
        std::iter::from_fn(move || loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    return Some(Err(ParseError::IoPath {
                        path: "<reader>".to_string(),
                        source: e,
                    }))
                }
            }
            self.line_no += 1;

            let line = self.buf.trim_end_matches(&['\n', '\r'][..]);
            if line.starts_with("##FASTA") {
                return None;
            }
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            return Some(parse_record_line(line, self.line_no));
        })
    }
}

/// Parse a single non-comment line into an `AnnotationRecord`.
pub fn parse_record_line(line: &str, line_no: usize) -> Result<AnnotationRecord, ParseError> {
    let malformed = || ParseError::MalformedLine {
        line_no,
        line: line.to_string(),
    };
    let bad_coords = || ParseError::BadCoordinates {
        line_no,
        line: line.to_string(),
    };

    // seqname source feature start end score strand phase attributes
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() != 9 {
        return Err(malformed());
    }

    let start: u64 = cols[3].parse().map_err(|_| bad_coords())?;
    let end: u64 = cols[4].parse().map_err(|_| bad_coords())?;
    if start == 0 || end < start {
        return Err(bad_coords());
    }

    let score = if cols[5] == "." {
        None
    } else {
        Some(cols[5].parse::<f32>().map_err(|_| malformed())?)
    };

    let strand = match cols[6] {
        "+" => Strand::Plus,
        "-" => Strand::Minus,
        "." | "?" => Strand::Unknown,
        _ => return Err(malformed()),
    };

    let phase = if cols[7] == "." {
        None
    } else {
        let p: u8 = cols[7].parse().map_err(|_| malformed())?;
        if p > 2 {
            return Err(malformed());
        }
        Some(p)
    };

    let (dialect, attrs) = parse_attributes(cols[8]);

    Ok(AnnotationRecord {
        line_no,
        seqname: cols[0].to_string(),
        source: cols[1].to_string(),
        feature_type: cols[2].to_string(),
        interval: Interval::new(start, end),
        score,
        strand,
        phase,
        attrs,
        dialect,
    })
}

/// Parse the attributes field for either GFF3 or GTF.
///
/// Heuristics:
/// - If it contains '=' => treat as GFF3
/// - Else if it contains quotes => treat as GTF
/// - Else Unknown, but parse best-effort
pub fn parse_attributes(s: &str) -> (Dialect, HashMap<String, String>) {
    let s = s.trim();

    let dialect = if s.contains('=') {
        Dialect::Gff3
    } else if s.contains('"') {
        Dialect::Gtf
    } else {
        Dialect::Unknown
    };

    let mut map = HashMap::new();

    for part in s.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let pair = match dialect {
            Dialect::Gff3 => part.split_once('='),
            Dialect::Gtf => part.split_once(char::is_whitespace),
            Dialect::Unknown => part.split_once('=').or_else(|| part.split_once(char::is_whitespace)),
        };
        let Some((key, value)) = pair else { continue };

        let key = key.trim();
        let value = unquote(value);
        if !key.is_empty() && !value.is_empty() {
            map.insert(key.to_string(), value);
        }
    }

    (dialect, map)
}

fn unquote(v: &str) -> String {
    let v = v.trim();
    let v = v.strip_prefix('"').unwrap_or(v);
    let v = v.strip_suffix('"').unwrap_or(v);
    v.to_string()
}
