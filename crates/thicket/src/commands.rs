use std::ops::Range;
use std::time::Duration;

use anyhow::Context;
use camino::Utf8Path;
use thicket_errors::{Renderer, diagnostics};
use thicket_grammar::Language;
use thicket_inputs::Document;
use thicket_parse::{ParseStats, Parser, ParserOptions};
use thicket_query::{Query, QueryCursor};
use thicket_tree::Tree;

use crate::ParserArgs;

pub(crate) fn generate(grammar: &Utf8Path, output: Option<&Utf8Path>) -> anyhow::Result<()> {
    let json = read_to_string(grammar)?;
    let table = thicket_generate::generate(&json)
        .with_context(|| format!("failed to generate a table from `{grammar}`"))?;
    tracing::info!(name = %table.name, states = table.states.len(), "generated table");
    let json = table.to_json()?;
    match output {
        Some(path) => std::fs::write(path, json).with_context(|| format!("failed to write `{path}`"))?,
        None => println!("{json}"),
    }
    Ok(())
}

pub(crate) fn parse(
    table: &Utf8Path,
    path: &Utf8Path,
    args: &ParserArgs,
    stats: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut parser = parser(load_language(table)?, args)?;
    let text = std::fs::read(path).with_context(|| format!("failed to read `{path}`"))?;
    let tree = parser.parse(text.as_slice(), None).with_context(|| format!("failed to parse `{path}`"))?;

    if !quiet {
        println!("{}", tree.to_sexp());
    }
    report(path, &text, &tree);
    if stats {
        print_stats(parser.last_stats(), text.len());
    }
    Ok(())
}

pub(crate) fn edit(
    table: &Utf8Path,
    path: &Utf8Path,
    range: Range<usize>,
    replacement: &str,
    args: &ParserArgs,
) -> anyhow::Result<()> {
    let mut parser = parser(load_language(table)?, args)?;
    let mut document = Document::new(path, read_to_string(path)?);
    let old = parser.parse(document.text(), None).with_context(|| format!("failed to parse `{path}`"))?;

    let edit = document.replace(range, replacement)?;
    tracing::debug!(?edit, "applying edit");
    let tree = parser.reparse(&old, &edit, document.text()).context("incremental reparse failed")?;

    print!("{tree:?}");
    report(path, document.text().as_bytes(), &tree);
    print_stats(parser.last_stats(), document.text().len());
    Ok(())
}

pub(crate) fn query(table: &Utf8Path, path: &Utf8Path, pattern: &str, args: &ParserArgs) -> anyhow::Result<()> {
    let language = load_language(table)?;
    let query = Query::new(&language, pattern).context("invalid query")?;
    let mut parser = parser(language, args)?;
    let text = std::fs::read(path).with_context(|| format!("failed to read `{path}`"))?;
    let tree = parser.parse(text.as_slice(), None).with_context(|| format!("failed to parse `{path}`"))?;

    for found in QueryCursor::new().matches(&query, tree.root_node()) {
        println!("pattern {}", found.pattern_index);
        for capture in found.captures {
            let node = capture.node;
            let name = &query.capture_names()[capture.index as usize];
            let range = node.byte_range();
            let point = node.start_point();
            match node.utf8_text(&text) {
                Ok(snippet) => println!(
                    "  @{name} {} [{}..{}] {}:{} {snippet:?}",
                    node.kind(),
                    range.start,
                    range.end,
                    point.row + 1,
                    point.column + 1
                ),
                Err(_) => println!("  @{name} {} [{}..{}]", node.kind(), range.start, range.end),
            }
        }
    }
    Ok(())
}

fn parser(language: Language, args: &ParserArgs) -> anyhow::Result<Parser> {
    let mut parser = Parser::new();
    parser.set_language(language);
    parser.set_options(parser_options(args)?);
    Ok(parser)
}

/// Loads a generated table, or generates one when given a grammar definition.
fn load_language(path: &Utf8Path) -> anyhow::Result<Language> {
    let json = read_to_string(path)?;
    let value: serde_json::Value =
        serde_json::from_str(&json).with_context(|| format!("`{path}` is not JSON"))?;
    let language = if value.get("rules").is_some() {
        thicket_generate::load(&json).with_context(|| format!("failed to generate a table from `{path}`"))?
    } else {
        Language::load(json.as_bytes()).with_context(|| format!("failed to load `{path}`"))?
    };
    tracing::debug!(language = language.name(), states = language.state_count(), "loaded language");
    Ok(language)
}

fn parser_options(args: &ParserArgs) -> anyhow::Result<ParserOptions> {
    let mut options = match &args.options {
        Some(path) => serde_json::from_str(&read_to_string(path)?)
            .with_context(|| format!("invalid parser options in `{path}`"))?,
        None => ParserOptions::default(),
    };
    if let Some(max_versions) = args.max_versions {
        options.max_versions = max_versions;
    }
    if let Some(max_steps) = args.max_steps {
        options.max_steps = Some(max_steps);
    }
    if let Some(timeout) = args.timeout_ms {
        options.timeout = Some(Duration::from_millis(timeout));
    }
    Ok(options)
}

fn read_to_string(path: &Utf8Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read `{path}`"))
}

fn report(path: &Utf8Path, text: &[u8], tree: &Tree) {
    let diagnostics = diagnostics(tree, text);
    match std::str::from_utf8(text) {
        Ok(text) => {
            let renderer = Renderer::styled();
            for diagnostic in diagnostics {
                eprintln!("{}", diagnostic.render(&renderer, path.as_str(), text));
            }
        }
        // Byte ranges would not line up with a lossily decoded text.
        Err(_) => {
            for diagnostic in diagnostics {
                let range = diagnostic.range();
                let (start, end) = (u32::from(range.start()), u32::from(range.end()));
                eprintln!("error: {} at {path}:{start}..{end}", diagnostic.message());
            }
        }
    }
}

fn print_stats(stats: ParseStats, len: usize) {
    eprintln!("steps: {}", stats.steps);
    eprintln!("lexed tokens: {}", stats.lexed_tokens);
    eprintln!(
        "reused nodes: {} ({} bytes, {:.1}%)",
        stats.reused_nodes,
        stats.reused_bytes,
        stats.reuse_rate(len) * 100.0
    );
    eprintln!("max stack versions: {}", stats.max_versions);
}
