use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use negex::{CueScope, Document, Finding, LineSegmenter, Pattern, PatternSpec};

#[derive(Parser, Debug)]
#[command(name = "negex")]
#[command(about = "Find pattern matches and their negation cues in a text file")]
#[command(version)]
struct Args {
    /// Text file to scan
    file: PathBuf,

    /// Inline pattern as NAME=REGEX (repeatable)
    #[arg(long = "pattern", value_name = "NAME=REGEX")]
    patterns: Vec<String>,

    /// Negation cue regex applied to every inline pattern (repeatable)
    #[arg(long = "negate", value_name = "REGEX")]
    negates: Vec<String>,

    /// Where cues must sit relative to inline pattern matches
    #[arg(long, default_value = "sentence")]
    scope: String,

    /// Maximum character gap between cue and match
    #[arg(long)]
    window: Option<usize>,

    /// JSON file holding an array of rule definitions
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Annotate each match with its negation cue, if any
    #[arg(long)]
    return_negation: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Serialize)]
struct HitLine<'a> {
    sentence: usize,
    pattern: &'a str,
    text: &'a str,
    start: usize,
    end: usize,
    negated: bool,
    cue: Option<&'a str>,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_patterns(args: &Args) -> Result<Vec<Arc<Pattern>>> {
    let mut patterns = Vec::new();

    if let Some(path) = &args.rules {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
        let specs: Vec<PatternSpec> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid rules file: {}", path.display()))?;
        for spec in &specs {
            patterns.push(Arc::new(spec.compile()?));
        }
    }

    let scope = CueScope::parse("--pattern", &args.scope, args.window).with_context(|| {
        format!("Invalid --scope '{}' / --window for inline patterns", args.scope)
    })?;
    for inline in &args.patterns {
        let Some((name, regex)) = inline.split_once('=') else {
            bail!("Inline pattern must look like NAME=REGEX: {inline}");
        };
        let pattern = args
            .negates
            .iter()
            .fold(Pattern::builder(name, regex), |builder, cue| builder.negates(cue))
            .scope(scope)
            .build()?;
        patterns.push(Arc::new(pattern));
    }

    if patterns.is_empty() {
        bail!("No patterns given: use --pattern or --rules");
    }
    Ok(patterns)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);
    info!(?args, "Parsed CLI arguments");

    if !args.file.is_file() {
        bail!("Input file does not exist: {}", args.file.display());
    }

    let patterns = load_patterns(&args)?;
    info!("Compiled {} patterns", patterns.len());

    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let name = args
        .file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string();
    let mut document = Document::new(name, text, &LineSegmenter)?;

    for sentence in document.sentences_mut() {
        // drain so each sentence records its outcome
        sentence.get_patterns(&patterns, 0, args.return_negation).for_each(drop);
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut total = 0usize;
    for (index, sentence) in document.iter().enumerate() {
        for hit in sentence.matches() {
            let line = HitLine {
                sentence: index,
                pattern: hit.pattern_name(),
                text: hit.group_text(0).unwrap_or_default(),
                start: hit.start(0).unwrap_or(sentence.start()),
                end: hit.end(0).unwrap_or(sentence.start()),
                negated: hit.is_negated(),
                cue: hit.cue_text(),
            };
            serde_json::to_writer(&mut out, &line)?;
            out.write_all(b"\n")?;
            total += 1;
        }
    }
    out.flush()?;

    info!(document = document.name(), sentences = document.len(), hits = total, "Scan complete");
    Ok(())
}
