//! Pretty-printer producing stable, diff-friendly source
//!
//! Same dialect as the compact emitter; only layout differs. Entries of
//! different kinds are separated by a blank line and rule bodies break
//! one conjunct per line. The leaf encoders are shared with the compact
//! emitter, so the two forms are semantically equivalent engine input.

use crate::error::Result;
use crate::syntax::{Entry, Program, Relation, Rule};

use super::emitter::{
    check_rule, push_body_item, push_comment, push_decl_line, push_fact, push_heads, push_io_line,
    push_type_def,
};

const INDENT: &str = "    ";

/// Appending printer tracking the previously written entry, so blank-line
/// separation stays purely mechanical
struct Printer<'a> {
    out: String,
    previous: Option<&'a Entry>,
}

impl<'a> Printer<'a> {
    fn new() -> Self {
        Printer {
            out: String::new(),
            previous: None,
        }
    }

    fn finish(self) -> String {
        self.out
    }

    /// Blank line between entries of different kinds; consecutive facts
    /// stay grouped, and a free-standing comment hugs what follows it
    fn separate(&mut self, current: &'a Entry) {
        if let Some(previous) = self.previous {
            let grouped = matches!(
                (previous, current),
                (Entry::Fact(_), Entry::Fact(_)) | (Entry::Comment(_), _)
            );
            if !grouped {
                self.out.push('\n');
            }
        }
        self.previous = Some(current);
    }

    fn entry(&mut self, entry: &'a Entry) -> Result<()> {
        self.separate(entry);
        match entry {
            Entry::Comment(comment) => push_comment(&mut self.out, comment),
            Entry::TypeDef(def) => push_type_def(&mut self.out, def),
            Entry::Relation(rel) => self.relation(rel),
            Entry::Fact(fact) => push_fact(&mut self.out, fact),
            Entry::Rule(rule) => self.rule(rule)?,
        }
        Ok(())
    }

    fn relation(&mut self, rel: &Relation) {
        if let Some(comment) = rel.comment() {
            push_comment(&mut self.out, comment);
        }
        push_decl_line(&mut self.out, rel);
        push_io_line(&mut self.out, rel);
    }

    fn rule(&mut self, rule: &Rule) -> Result<()> {
        check_rule(rule)?;
        if let Some(comment) = rule.comment() {
            push_comment(&mut self.out, comment);
        }
        push_heads(&mut self.out, rule);
        self.out.push_str(" :-\n");
        let last = rule.body().len() - 1;
        for (i, item) in rule.body().iter().enumerate() {
            self.out.push_str(INDENT);
            push_body_item(&mut self.out, item);
            self.out.push_str(if i == last { ".\n" } else { ",\n" });
        }
        Ok(())
    }
}

/// Render a program with normalized spacing and indentation. Semantics
/// match [`super::emit`] exactly; only whitespace differs.
pub fn pretty(program: &Program) -> Result<String> {
    let mut printer = Printer::new();

    if let Some(comment) = program.comment() {
        push_comment(&mut printer.out, comment);
        printer.out.push('\n');
    }

    for entry in program.entries() {
        printer.entry(entry)?;
    }

    Ok(printer.finish())
}
