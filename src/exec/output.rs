//! Working-area fact files and result-file ingestion

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::context::TypeIndex;
use crate::emit::push_cell;
use crate::error::{ExecutionError, Result};
use crate::syntax::{Entry, Io, PrimitiveType, Program, Value};

/// Fact rows destined for one input relation's `.facts` file
#[derive(Debug)]
pub(super) struct FactFile {
    pub name: String,
    pub contents: String,
}

/// Produce one fact file per input relation. The engine requires a file
/// for every `.input` declaration, so a file is produced even when it is
/// empty. With `move_facts`, facts belonging to input relations migrate
/// out of the source text into their files (rows in insertion order);
/// facts for other relations always stay inline.
pub(super) fn input_fact_files(program: Program, move_facts: bool) -> (Program, Vec<FactFile>) {
    let inputs: Vec<String> = program
        .relations()
        .filter(|rel| rel.io() == Some(Io::Input))
        .map(|rel| rel.name().to_string())
        .collect();

    let mut contents: HashMap<&str, String> = inputs
        .iter()
        .map(|name| (name.as_str(), String::new()))
        .collect();

    let program = if move_facts && !inputs.is_empty() {
        let mut kept = Vec::with_capacity(program.entries().len());
        for entry in program.entries() {
            match entry {
                Entry::Fact(fact) if contents.contains_key(fact.relation()) => {
                    let rows = contents.get_mut(fact.relation()).unwrap();
                    for (i, value) in fact.values().iter().enumerate() {
                        if i > 0 {
                            rows.push('\t');
                        }
                        push_cell(rows, value);
                    }
                    rows.push('\n');
                }
                other => kept.push(other.clone()),
            }
        }
        let rebuilt = Program::new(program.name(), kept);
        match program.comment() {
            Some(comment) => rebuilt.with_comment(comment.clone()),
            None => rebuilt,
        }
    } else {
        program
    };

    let files = inputs
        .iter()
        .map(|name| FactFile {
            contents: contents.remove(name.as_str()).unwrap(),
            name: name.clone(),
        })
        .collect();
    (program, files)
}

/// Read the result file of every output relation in declaration order.
/// An absent file means zero derived rows; real engine failures arrive
/// via the exit code, not via missing files.
pub(super) fn read_results(
    dir: &Path,
    program: &Program,
    coerce: bool,
) -> Result<HashMap<String, Vec<Vec<Value>>>> {
    let types = TypeIndex::from_program(program);
    let mut results = HashMap::new();

    for rel in program.relations().filter(|rel| rel.io() == Some(Io::Output)) {
        let path = dir.join(format!("{}.csv", rel.name()));
        let rows = if path.exists() {
            let text = fs::read_to_string(&path).map_err(ExecutionError::Io)?;
            let columns: Vec<Option<PrimitiveType>> = rel
                .args()
                .iter()
                .map(|arg| types.resolve(arg.ty()))
                .collect();
            parse_rows(rel.name(), &text, &columns, coerce)?
        } else {
            Vec::new()
        };
        tracing::debug!("relation {}: {} rows", rel.name(), rows.len());
        results.insert(rel.name().to_string(), rows);
    }

    Ok(results)
}

/// Split delimiter-separated rows, preserving the engine's row order
fn parse_rows(
    relation: &str,
    text: &str,
    columns: &[Option<PrimitiveType>],
    coerce: bool,
) -> Result<Vec<Vec<Value>>> {
    let mut rows = Vec::new();
    for line in text.lines() {
        let mut row = Vec::with_capacity(columns.len());
        for (i, cell) in line.split('\t').enumerate() {
            let ty = if coerce {
                columns.get(i).copied().flatten()
            } else {
                None
            };
            row.push(parse_cell(relation, cell, ty)?);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn parse_cell(relation: &str, cell: &str, ty: Option<PrimitiveType>) -> Result<Value> {
    let malformed = |detail: String| ExecutionError::MalformedOutput {
        relation: relation.to_string(),
        detail,
    };
    let value = match ty {
        Some(PrimitiveType::Number) => Value::Int(
            cell.parse()
                .map_err(|_| malformed(format!("expected number, got {:?}", cell)))?,
        ),
        Some(PrimitiveType::Unsigned) => Value::Uint(
            cell.parse()
                .map_err(|_| malformed(format!("expected unsigned, got {:?}", cell)))?,
        ),
        Some(PrimitiveType::Float) => Value::Float(
            cell.parse()
                .map_err(|_| malformed(format!("expected float, got {:?}", cell)))?,
        ),
        Some(PrimitiveType::Symbol) | None => Value::Str(cell.to_string()),
    };
    Ok(value)
}
