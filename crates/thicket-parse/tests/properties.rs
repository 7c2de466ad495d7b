//! Property tests over the arithmetic grammar.

use std::ops::Range;
use std::sync::LazyLock;

use proptest::prelude::*;
use thicket_grammar::Language;
use thicket_inputs::Document;
use thicket_parse::Parser;
use thicket_tree::{Node, Tree, WalkEvent};

static ARITHMETIC: LazyLock<Language> = LazyLock::new(|| {
    thicket_generate::load(include_str!("../test_data/arithmetic/grammar.json")).unwrap()
});

fn parse(text: &[u8]) -> Tree {
    let mut parser = Parser::new();
    parser.set_language(ARITHMETIC.clone());
    parser.parse(text, None).unwrap()
}

fn arb_expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof!["[0-9]{1,3}", "[a-z_]{1,4}"];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), prop_oneof![Just("+"), Just("*"), Just("^")], inner.clone())
                .prop_map(|(lhs, op, rhs)| format!("{lhs} {op} {rhs}")),
            inner.prop_map(|expr| format!("({expr})")),
        ]
    })
}

fn arb_statement() -> impl Strategy<Value = String> {
    (arb_expr(), prop_oneof![Just("\n"), Just(" "), Just(" # note\n")])
        .prop_map(|(expr, separator)| format!("{expr};{separator}"))
}

fn arb_program() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_statement(), 0..6)
}

/// Byte range of each statement once `statements` are concatenated.
fn statement_ranges(statements: &[String]) -> Vec<Range<usize>> {
    let mut start = 0;
    statements
        .iter()
        .map(|statement| {
            let range = start..start + statement.len();
            start = range.end;
            range
        })
        .collect()
}

fn check_ranges(node: Node<'_>) {
    let mut previous_end = node.start_byte();
    for child in node.children() {
        assert!(child.start_byte() >= previous_end, "{child:?} overlaps its sibling");
        assert!(child.end_byte() <= node.end_byte(), "{child:?} escapes {node:?}");
        previous_end = child.end_byte();
        check_ranges(child);
    }
}

fn collect(node: Node<'_>, out: &mut Vec<(String, Range<usize>)>) {
    out.push((node.kind().to_owned(), node.byte_range()));
    for child in node.children() {
        collect(child, out);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parsing_is_deterministic(statements in arb_program()) {
        let text = statements.concat();
        prop_assert_eq!(format!("{:?}", parse(text.as_bytes())), format!("{:?}", parse(text.as_bytes())));
    }

    #[test]
    fn valid_programs_parse_cleanly(statements in arb_program()) {
        let text = statements.concat();
        let tree = parse(text.as_bytes());
        let root = tree.root_node();
        prop_assert!(!root.has_error(), "{:?}", tree);
        prop_assert_eq!(root.byte_range(), 0..text.len());
        prop_assert_eq!(root.named_children().filter(|node| node.kind() == "statement").count(), statements.len());
        check_ranges(root);
    }

    #[test]
    fn cursor_walk_matches_children(statements in arb_program()) {
        let text = statements.concat();
        let tree = parse(text.as_bytes());

        let mut expected = Vec::new();
        collect(tree.root_node(), &mut expected);
        let walked: Vec<_> = tree
            .root_node()
            .preorder()
            .filter_map(|event| match event {
                WalkEvent::Enter(node) => Some((node.kind().to_owned(), node.byte_range())),
                WalkEvent::Leave(_) => None,
            })
            .collect();
        prop_assert_eq!(walked, expected);

        let mut cursor = tree.walk();
        while cursor.goto_first_child() {}
        while cursor.goto_parent() {}
        prop_assert_eq!(cursor.node(), tree.root_node());
    }

    #[test]
    fn garbage_still_produces_a_tree(bytes in prop::collection::vec(any::<u8>(), 0..48)) {
        let tree = parse(&bytes);
        let root = tree.root_node();
        prop_assert_eq!(root.byte_range(), 0..bytes.len());
        check_ranges(root);
    }

    #[test]
    fn reparse_matches_a_fresh_parse(
        statements in arb_program(),
        replacement in arb_statement(),
        target in any::<prop::sample::Index>(),
        insert in any::<bool>(),
    ) {
        let ranges = statement_ranges(&statements);
        let text = statements.concat();
        // One past the last statement appends at the end of the text.
        let range = match ranges.get(target.index(ranges.len() + 1)) {
            Some(range) if insert => range.start..range.start,
            Some(range) => range.clone(),
            None => text.len()..text.len(),
        };

        let mut parser = Parser::new();
        parser.set_language(ARITHMETIC.clone());
        let mut document = Document::new("program.txt", text);
        let old = parser.parse(document.text(), None).unwrap();
        let edit = document.replace(range, &replacement).unwrap();
        let reparsed = parser.reparse(&old, &edit, document.text()).unwrap();

        prop_assert_eq!(format!("{:?}", reparsed), format!("{:?}", parse(document.text().as_bytes())));
    }
}
