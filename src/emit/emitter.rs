//! Compact deterministic emitter
//!
//! Total function from a program value to engine-acceptable source text.
//! Identical program values always produce byte-identical text: entries
//! render in stored order and every encoder is locale-independent.
//! Arity/type consistency is the context's job; emission only enforces
//! its own structural invariants and fails closed with an internal error
//! when one is violated.

use crate::error::{InternalError, Result};
use crate::syntax::{
    Atom, BodyItem, BodyNode, Comment, CommentStyle, Constraint, Entry, Fact, Program, Relation,
    Rule, Term, TypeDef, TypeDefKind, Value,
};

/// Render a program to compact canonical source text
pub fn emit(program: &Program) -> Result<String> {
    let mut out = String::new();
    if let Some(comment) = program.comment() {
        push_comment(&mut out, comment);
    }
    for entry in program.entries() {
        push_entry(&mut out, entry)?;
    }
    Ok(out)
}

pub(super) fn push_entry(out: &mut String, entry: &Entry) -> Result<()> {
    match entry {
        Entry::Comment(comment) => push_comment(out, comment),
        Entry::TypeDef(def) => push_type_def(out, def),
        Entry::Relation(rel) => push_relation(out, rel),
        Entry::Fact(fact) => push_fact(out, fact),
        Entry::Rule(rule) => push_rule(out, rule)?,
    }
    Ok(())
}

pub(super) fn push_comment(out: &mut String, comment: &Comment) {
    match comment.style() {
        CommentStyle::Line => {
            for line in comment.text() {
                out.push_str("// ");
                out.push_str(line);
                out.push('\n');
            }
        }
        CommentStyle::Block => {
            out.push_str("/*\n");
            for line in comment.text() {
                out.push_str(" * ");
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(" */\n");
        }
    }
}

pub(super) fn push_type_def(out: &mut String, def: &TypeDef) {
    out.push_str(".type ");
    out.push_str(def.name());
    out.push_str(match def.kind() {
        TypeDefKind::Equivalence => " = ",
        TypeDefKind::Subtype => " <: ",
    });
    out.push_str(def.base().name());
    out.push('\n');
}

pub(super) fn push_relation(out: &mut String, rel: &Relation) {
    if let Some(comment) = rel.comment() {
        push_comment(out, comment);
    }
    push_decl_line(out, rel);
    push_io_line(out, rel);
}

pub(super) fn push_decl_line(out: &mut String, rel: &Relation) {
    out.push_str(".decl ");
    out.push_str(rel.name());
    out.push('(');
    for (i, arg) in rel.args().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(arg.name());
        out.push_str(": ");
        out.push_str(arg.ty().name());
    }
    out.push_str(")\n");
}

pub(super) fn push_io_line(out: &mut String, rel: &Relation) {
    match rel.io() {
        Some(crate::syntax::Io::Input) => {
            out.push_str(".input ");
            out.push_str(rel.name());
            out.push('\n');
        }
        Some(crate::syntax::Io::Output) => {
            out.push_str(".output ");
            out.push_str(rel.name());
            out.push('\n');
        }
        None => {}
    }
}

pub(super) fn push_fact(out: &mut String, fact: &Fact) {
    out.push_str(fact.relation());
    out.push('(');
    for (i, value) in fact.values().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_value(out, value);
    }
    out.push_str(").\n");
}

fn push_rule(out: &mut String, rule: &Rule) -> Result<()> {
    check_rule(rule)?;
    if let Some(comment) = rule.comment() {
        push_comment(out, comment);
    }
    push_heads(out, rule);
    out.push_str(" :- ");
    for (i, item) in rule.body().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_body_item(out, item);
    }
    out.push_str(".\n");
    Ok(())
}

/// Structural invariants the model cannot encode. A violation is a
/// defect in the synthesizing code path, not caller input, so it fails
/// closed as an internal error.
pub(super) fn check_rule(rule: &Rule) -> Result<()> {
    if rule.heads().is_empty() {
        return Err(InternalError("rule with no head atoms".to_string()).into());
    }
    if rule.body().is_empty() {
        return Err(InternalError("rule with empty body".to_string()).into());
    }
    Ok(())
}

pub(super) fn push_heads(out: &mut String, rule: &Rule) {
    for (i, head) in rule.heads().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_atom(out, head);
    }
}

pub(super) fn push_body_item(out: &mut String, item: &BodyItem) {
    if item.is_negated() {
        out.push('!');
    }
    match item.node() {
        BodyNode::Atom(atom) => push_atom(out, atom),
        BodyNode::Constraint(constraint) => push_constraint(out, constraint),
    }
}

pub(super) fn push_atom(out: &mut String, atom: &Atom) {
    out.push_str(atom.relation());
    out.push('(');
    for (i, term) in atom.args().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_term(out, term);
    }
    out.push(')');
}

pub(super) fn push_term(out: &mut String, term: &Term) {
    match term {
        Term::Var(name) => out.push_str(name),
        Term::Const(value) => push_value(out, value),
        Term::Wildcard => out.push('_'),
    }
}

pub(super) fn push_constraint(out: &mut String, constraint: &Constraint) {
    match constraint {
        Constraint::Binary { lhs, op, rhs } => {
            push_term(out, lhs);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            push_term(out, rhs);
        }
        Constraint::Match { pattern, target } => {
            out.push_str("match(");
            push_term(out, pattern);
            out.push_str(", ");
            push_term(out, target);
            out.push(')');
        }
        Constraint::Contains { needle, haystack } => {
            out.push_str("contains(");
            push_term(out, needle);
            out.push_str(", ");
            push_term(out, haystack);
            out.push(')');
        }
        Constraint::Boolean(value) => {
            out.push_str(if *value { "true" } else { "false" });
        }
    }
}

pub(super) fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::Str(s) => push_quoted(out, s),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Uint(n) => out.push_str(&n.to_string()),
        Value::Float(f) => push_float(out, *f),
    }
}

/// Quote and escape a string literal so it round-trips as the same
/// string inside the engine
fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Canonical float form: shortest round-trip decimal, with a forced
/// `.0` on integral values so the engine reads a float literal
pub(crate) fn push_float(out: &mut String, f: f64) {
    if f.fract() == 0.0 && f.is_finite() {
        out.push_str(&format!("{:.1}", f));
    } else {
        out.push_str(&format!("{}", f));
    }
}

/// Encode a value as a fact-file cell: same literal form as in-source,
/// minus the surrounding syntax (strings raw and unquoted)
pub(crate) fn push_cell(out: &mut String, value: &Value) {
    match value {
        Value::Str(s) => out.push_str(s),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Uint(n) => out.push_str(&n.to_string()),
        Value::Float(f) => push_float(out, *f),
    }
}
