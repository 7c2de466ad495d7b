use std::fmt::Write as _;

use expect_test::expect;
use pretty_assertions::assert_eq;
use thicket_generate::{GenerateError, generate, load};
use thicket_grammar::{Action, GrammarTable, LANGUAGE_VERSION, Symbol};

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

const ARITHMETIC: &str = r#"{
  "name": "arithmetic",
  "rules": {
    "expr": { "type": "CHOICE", "members": [
      { "type": "PREC_LEFT", "value": 1, "content": { "type": "SEQ", "members": [
        { "type": "SYMBOL", "name": "expr" }, { "type": "STRING", "value": "+" }, { "type": "SYMBOL", "name": "expr" }
      ]}},
      { "type": "PREC_LEFT", "value": 2, "content": { "type": "SEQ", "members": [
        { "type": "SYMBOL", "name": "expr" }, { "type": "STRING", "value": "*" }, { "type": "SYMBOL", "name": "expr" }
      ]}},
      { "type": "SYMBOL", "name": "number" }
    ]},
    "number": { "type": "PATTERN", "value": "\\d+" }
  }
}"#;

fn dump(table: &GrammarTable) -> String {
    let name = |symbol: Symbol| table.symbols[symbol.index()].name.as_str();
    let mut out = String::new();
    for (index, state) in table.states.iter().enumerate() {
        write!(out, "state {index} mode {}:", state.lex_mode.0).unwrap();
        for entry in &state.actions {
            for action in &entry.actions {
                match action {
                    Action::Shift { state } => write!(out, " {} shift {}", name(entry.symbol), state.0),
                    Action::Reduce { production } => {
                        write!(out, " {} reduce {}", name(entry.symbol), production.0)
                    }
                    Action::Accept => write!(out, " {} accept", name(entry.symbol)),
                }
                .unwrap();
            }
        }
        for goto in &state.gotos {
            write!(out, " {} goto {}", name(goto.symbol), goto.state.0).unwrap();
        }
        out.push('\n');
    }
    out
}

#[test]
fn sum_table() {
    let table = generate(SUM).unwrap();
    assert_eq!(table.version, LANGUAGE_VERSION);
    let names: Vec<_> = table.symbols.iter().map(|symbol| symbol.name.as_str()).collect();
    assert_eq!(names, ["end", "ERROR", "number", "+", "expr"]);
    assert_eq!(table.start_symbol, Symbol(4));
    assert_eq!(table.lex_modes.len(), 3);
    expect![[r#"
        state 0 mode 0: number shift 1 expr goto 2
        state 1 mode 1: + shift 3
        state 2 mode 2: end accept
        state 3 mode 0: number shift 4
        state 4 mode 2: end reduce 0
    "#]]
    .assert_eq(&dump(&table));
}

#[test]
fn precedence_removes_arithmetic_conflicts() {
    let table = generate(ARITHMETIC).unwrap();
    for state in &table.states {
        for entry in &state.actions {
            assert_eq!(entry.actions.len(), 1, "conflict on {:?}", entry.symbol);
        }
    }
}

#[test]
fn ambiguity_without_precedence_is_kept() {
    let ambiguous = ARITHMETIC.replace("PREC_LEFT", "PREC");
    let table = generate(&ambiguous).unwrap();
    let conflicted = table
        .states
        .iter()
        .flat_map(|state| &state.actions)
        .filter(|entry| entry.actions.len() > 1)
        .count();
    // `expr + expr .` and `expr * expr .` on each of `+` and `*`, where only
    // the mixed cases are settled by precedence.
    assert_eq!(conflicted, 2);
}

#[test]
fn generated_tables_round_trip_through_json() {
    let table = generate(ARITHMETIC).unwrap();
    let json = table.to_json().unwrap();
    let language = thicket_grammar::Language::load(json.as_bytes()).unwrap();
    assert_eq!(language.name(), "arithmetic");
    assert_eq!(load(ARITHMETIC).unwrap().symbol_count(), language.symbol_count());
}

#[test]
fn malformed_json_is_reported() {
    assert!(matches!(generate("{"), Err(GenerateError::Json(_))));
}

#[test]
fn aliases_compile_to_renaming_productions() {
    let grammar = SUM.replace(
        r#"{ "type": "SYMBOL", "name": "number" },
      { "type": "STRING", "value": "+" }"#,
        r#"{ "type": "ALIAS", "value": "left", "named": true, "content": { "type": "SYMBOL", "name": "number" } },
      { "type": "STRING", "value": "+" }"#,
    );
    let table = generate(&grammar).unwrap();
    let name = |symbol: Symbol| table.symbols[symbol.index()].name.as_str();

    let left = table.symbols.iter().position(|symbol| symbol.name == "left").unwrap();
    assert!(table.symbols[left].named && table.symbols[left].visible);
    let renames: Vec<_> = table
        .productions
        .iter()
        .filter(|production| production.rename)
        .map(|production| (name(production.symbol), production.child_count))
        .collect();
    assert_eq!(renames, [("left", 1)]);
    assert!(table.productions.iter().any(|production| name(production.symbol) == "expr" && !production.rename));
}

#[test]
fn rule_extras_are_entered_from_every_state() {
    let grammar = r#"{
      "name": "commented",
      "extras": [{ "type": "PATTERN", "value": "\\s" }, { "type": "SYMBOL", "name": "comment" }],
      "rules": {
        "expr": { "type": "SEQ", "members": [
          { "type": "SYMBOL", "name": "number" },
          { "type": "STRING", "value": "+" },
          { "type": "SYMBOL", "name": "number" }
        ]},
        "comment": { "type": "SEQ", "members": [
          { "type": "STRING", "value": "/*" },
          { "type": "STRING", "value": "*/" }
        ]},
        "number": { "type": "PATTERN", "value": "\\d+" }
      }
    }"#;
    let table = generate(grammar).unwrap();
    let symbol = |wanted: &str| {
        Symbol(table.symbols.iter().position(|symbol| symbol.name == wanted).unwrap() as u16)
    };
    let (comment, open) = (symbol("comment"), symbol("/*"));
    assert!(table.symbols[comment.index()].extra);

    let start = &table.states[0];
    assert!(start.gotos.iter().any(|goto| goto.symbol == comment && goto.state.0 == 0));
    let shifts_open = |state: &thicket_grammar::StateTable| {
        state.actions.iter().any(|entry| {
            entry.symbol == open && matches!(entry.actions.as_slice(), [Action::Shift { .. }])
        })
    };
    assert!(shifts_open(start));

    // Every state outside the comment's own states can start a comment and
    // comes back to itself afterwards.
    let entering = table
        .states
        .iter()
        .enumerate()
        .filter(|(index, state)| {
            shifts_open(state)
                && state.gotos.iter().any(|goto| goto.symbol == comment && usize::from(goto.state.0) == *index)
        })
        .count();
    assert!(entering >= 4, "{}", dump(&table));
}
