use std::fmt::{self, Write as _};

use crate::{Node, WalkEvent};

fn label(node: Node<'_>) -> String {
    let kind = node.kind();
    let name = if node.is_named() { kind.to_owned() } else { format!("{kind:?}") };
    if node.is_missing() { format!("MISSING {name}") } else { name }
}

pub(crate) fn write_tree(root: Node<'_>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut depth = 0;
    for event in root.preorder() {
        match event {
            WalkEvent::Enter(node) => {
                let range = node.byte_range();
                writeln!(f, "{:indent$}{} [{}..{}]", "", label(node), range.start, range.end, indent = depth * 2)?;
                depth += 1;
            }
            WalkEvent::Leave(_) => depth -= 1,
        }
    }
    Ok(())
}

pub(crate) fn write_sexp(node: Node<'_>, out: &mut String) {
    if node.is_missing() {
        let _ = write!(out, "({})", label(node));
        return;
    }
    out.push('(');
    out.push_str(node.kind());
    for child in node.children() {
        if child.is_named() || child.is_missing() {
            out.push(' ');
            write_sexp(child, out);
        }
    }
    out.push(')');
}
