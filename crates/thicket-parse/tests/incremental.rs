use pretty_assertions::assert_eq;
use thicket_grammar::Language;
use thicket_inputs::Document;
use thicket_parse::Parser;

const SUM: &str = r#"{
  "name": "sum",
  "rules": {
    "expr": { "type": "SEQ", "members": [
      { "type": "SYMBOL", "name": "number" },
      { "type": "STRING", "value": "+" },
      { "type": "SYMBOL", "name": "number" }
    ]},
    "number": { "type": "PATTERN", "value": "\\d+" }
  }
}"#;

fn sum() -> Language {
    thicket_generate::load(SUM).unwrap()
}

fn arithmetic() -> Language {
    thicket_generate::load(include_str!("../test_data/arithmetic/grammar.json")).unwrap()
}

#[test]
fn editing_one_operand_relexes_only_that_token() {
    let mut parser = Parser::new();
    parser.set_language(sum());

    let mut document = Document::new("sum.txt", "3+4");
    let old = parser.parse(document.text(), None).unwrap();
    assert_eq!(
        format!("{old:?}"),
        "expr [0..3]\n  number [0..1]\n  \"+\" [1..2]\n  number [2..3]\n"
    );

    let edit = document.replace(2..3, "5").unwrap();
    let new = parser.reparse(&old, &edit, document.text()).unwrap();
    let stats = parser.last_stats();

    let (old_root, new_root) = (old.root_node(), new.root_node());
    assert_eq!(format!("{new:?}"), format!("{old:?}"));
    assert_eq!(new_root.child(0).unwrap().id(), old_root.child(0).unwrap().id());
    assert_eq!(new_root.child(1).unwrap().id(), old_root.child(1).unwrap().id());
    assert_ne!(new_root.child(2).unwrap().id(), old_root.child(2).unwrap().id());
    assert_eq!(new_root.child(2).unwrap().utf8_text(document.text().as_bytes()), Ok("5"));
    assert_eq!(stats.lexed_tokens, 1);
    assert_eq!(stats.reused_nodes, 2);
}

#[test]
fn growing_a_token_keeps_the_prefix() {
    let mut parser = Parser::new();
    parser.set_language(sum());

    let mut document = Document::new("sum.txt", "3+4");
    let old = parser.parse(document.text(), None).unwrap();
    let edit = document.replace(3..3, "2").unwrap();
    let new = parser.reparse(&old, &edit, document.text()).unwrap();

    assert_eq!(
        format!("{new:?}"),
        "expr [0..4]\n  number [0..1]\n  \"+\" [1..2]\n  number [2..4]\n"
    );
    assert_eq!(new.root_node().child(0).unwrap().id(), old.root_node().child(0).unwrap().id());
}

#[test]
fn reparse_without_changes_reuses_everything() {
    let mut parser = Parser::new();
    parser.set_language(sum());

    let mut document = Document::new("sum.txt", "12 + 34");
    let old = parser.parse(document.text(), None).unwrap();
    let edit = document.replace(3..4, "+").unwrap();
    let new = parser.reparse(&old, &edit, document.text()).unwrap();

    assert_eq!(format!("{new:?}"), format!("{old:?}"));
    assert_eq!(new.root_node().child(0).unwrap().id(), old.root_node().child(0).unwrap().id());
}

#[test]
fn tree_from_another_language_is_ignored() {
    let mut parser = Parser::new();
    parser.set_language(sum());
    let old = parser.parse("1+2", None).unwrap();

    parser.set_language(sum());
    let new = parser.parse("1+2", Some(&old)).unwrap();
    assert_eq!(format!("{new:?}"), format!("{old:?}"));
    assert_eq!(parser.last_stats().reused_nodes, 0);
}

#[test]
fn appending_at_the_end_matches_a_fresh_parse() {
    let mut parser = Parser::new();
    parser.set_language(arithmetic());

    for (text, appended) in [("", "1"), ("", "1;"), ("1;", "2;"), ("1;\n", "x;")] {
        let mut document = Document::new("append.txt", text);
        let old = parser.parse(document.text(), None).unwrap();
        let edit = document.replace(text.len()..text.len(), appended).unwrap();

        let edited = old.edit(&edit).unwrap();
        assert_eq!(edited.len().to_usize(), document.text().len());

        let new = parser.reparse(&old, &edit, document.text()).unwrap();
        let fresh = parser.parse(document.text(), None).unwrap();
        assert_eq!(format!("{new:?}"), format!("{fresh:?}"), "appending {appended:?} to {text:?}");
    }
}

#[test]
fn appending_a_statement_reuses_the_first() {
    let mut parser = Parser::new();
    parser.set_language(arithmetic());

    let mut document = Document::new("append.txt", "1;");
    let old = parser.parse(document.text(), None).unwrap();
    let edit = document.replace(2..2, "2;").unwrap();
    let new = parser.reparse(&old, &edit, document.text()).unwrap();

    assert_eq!(
        format!("{new:?}"),
        "program [0..4]\n  statement [0..2]\n    expr [0..1]\n      number [0..1]\n    \";\" [1..2]\n  statement [2..4]\n    expr [2..3]\n      number [2..3]\n    \";\" [3..4]\n"
    );
    assert!(parser.last_stats().reused_nodes > 0);
}
