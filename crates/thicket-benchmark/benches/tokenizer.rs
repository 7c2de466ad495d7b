use codspeed_criterion_compat::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use thicket_lexer::Lexer;

static GRAMMAR: &str = include_str!("../../thicket-parse/test_data/arithmetic/grammar.json");

static OPERATORS: &str = "
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
1 + 2 * 3 ^ 4; (alpha + beta) * gamma; # a comment
";

static IDENTIFIERS: &str =
    "it was the year when they finally immanentized the eschaton it was the year when they \
     finally immanentized the eschaton it was the year when they finally immanentized the \
     eschaton it was the year when they finally immanentized the eschaton it was the year when \
     they finally immanentized the eschaton it was the year when they finally immanentized the \
     eschaton it was the year when they finally immanentized the eschaton";

static CANDIDATES: [(&str, &str); 2] = [("identifiers", IDENTIFIERS), ("operators_and_comments", OPERATORS)];

fn bench_tokenize(c: &mut Criterion) {
    let language = thicket_generate::load(GRAMMAR).unwrap();
    let mut group = c.benchmark_group("tokenize");

    for (name, source) in CANDIDATES {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(name, &source, |b, &s| {
            b.iter(|| black_box(Lexer::new(&language, s.as_bytes()).tokenize()));
        });
    }
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
