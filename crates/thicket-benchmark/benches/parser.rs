use std::hint::black_box;

use codspeed_criterion_compat::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use thicket_inputs::Document;
use thicket_parse::Parser;

static GRAMMAR: &str = include_str!("../../thicket-parse/test_data/arithmetic/grammar.json");

const NAMES: [&str; 4] = ["total", "offset", "scale", "margin"];

fn program(statements: usize) -> String {
    (0..statements)
        .map(|index| {
            let name = NAMES[index % NAMES.len()];
            format!("{name} + {index} * width * (height ^ 2) + {index}; # step\n")
        })
        .collect()
}

fn benchmark_parser(c: &mut Criterion) {
    let language = thicket_generate::load(GRAMMAR).unwrap();
    let mut parser = Parser::new();
    parser.set_language(language);

    let sources = [("Small", program(8)), ("Large", program(400))];
    let mut group = c.benchmark_group("Parser Benchmark");

    for (name, source) in &sources {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", name), source, |b, source| {
            b.iter(|| black_box(parser.parse(source.as_str(), None).unwrap()));
        });
    }

    for (name, source) in &sources {
        // Replace one operand in the middle of the text.
        let mut document = Document::new("bench.txt", source.clone());
        let old = parser.parse(document.text(), None).unwrap();
        let middle = document.text()[source.len() / 2..].find("width").unwrap() + source.len() / 2;
        let edit = document.replace(middle..middle + "width".len(), "depth").unwrap();

        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("reparse", name), &document, |b, document| {
            b.iter(|| black_box(parser.reparse(&old, &edit, document.text()).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_parser);
criterion_main!(benches);
