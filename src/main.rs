use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use locus_compare::annotation::AnnotationBuilder;
use locus_compare::compare::{compare_loci, load_loci, CompareOptions, ComparisonSummary, LocusReport};

/// Compare a predicted gene annotation against a reference, locus by locus.
#[derive(Parser, Debug)]
#[command(name = "locus-compare")]
#[command(author, version, about)]
struct Cli {
    /// Reference annotation (.gff3/.gtf, optionally .gz)
    #[arg(long, short)]
    reference: PathBuf,

    /// Predicted annotation (.gff3/.gtf, optionally .gz)
    #[arg(long, short)]
    prediction: PathBuf,

    /// Locus filter file, one `Key = Value` per line
    #[arg(long, short)]
    filters: Option<PathBuf>,

    /// Skip loci with more transcripts than this on either side (0 = no limit)
    #[arg(long, default_value_t = locus_compare::compare::DEFAULT_MAX_TRANSCRIPTS)]
    max_transcripts: usize,

    /// Worker threads (0 = one per core)
    #[arg(long, short, default_value_t = 0)]
    threads: usize,

    /// Write one JSON object per locus instead of a TSV table
    #[arg(long)]
    json: bool,

    // -------------------------
    // Attribute key options
    // -------------------------

    /// Feature types that count as transcripts (repeatable).
    /// Default: mRNA, transcript
    #[arg(
        long = "transcript-feature-type",
        value_name = "TYPE",
        num_args = 1..,
        default_values_t = vec!["mRNA".to_string(), "transcript".to_string()]
    )]
    transcript_feature_types: Vec<String>,

    /// GFF3 child->parent linkage keys (repeatable).
    /// Default: Parent
    #[arg(
        long = "parent-key",
        value_name = "KEY",
        num_args = 1..,
        default_values_t = vec!["Parent".to_string()]
    )]
    parent_keys: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()
        .context("configuring the thread pool")?;

    let mut opts = CompareOptions {
        max_transcripts: cli.max_transcripts,
        ..CompareOptions::default()
    };
    if let Some(path) = &cli.filters {
        opts = opts
            .with_filter_file(path)
            .with_context(|| format!("reading filters from {}", path.display()))?;
    }

    let mut builder = AnnotationBuilder::new();
    builder.keys.transcript_types = cli.transcript_feature_types;
    builder.keys.parent_keys = cli.parent_keys;

    let mut loci = load_loci(&builder, &cli.reference, &cli.prediction).with_context(|| {
        format!(
            "loading annotations {} and {}",
            cli.reference.display(),
            cli.prediction.display()
        )
    })?;

    let reports = compare_loci(&mut loci, &opts);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if cli.json {
        for report in &reports {
            serde_json::to_writer(&mut out, report).context("writing JSON report")?;
            writeln!(out)?;
        }
    } else {
        writeln!(out, "{}", LocusReport::TSV_HEADER)?;
        for report in &reports {
            writeln!(out, "{report}")?;
        }
    }
    out.flush()?;

    eprintln!("{}", ComparisonSummary::from_reports(&reports));

    Ok(())
}
