//! Append-only program builder with declaration-time validation
//!
//! A [`Context`] accumulates program entries in insertion order and keeps
//! a derived index of declared relations (name -> column signature) that
//! is consulted synchronously on every fact addition. The index exists
//! purely for validation and is never serialized.

use std::collections::HashMap;

use crate::error::{Result, UsageError};
use crate::syntax::{Comment, Entry, Fact, Io, PrimitiveType, Program, Type, TypeDef, Value};

/// Typedef resolution depth bound; chains deeper than this are treated
/// as unresolvable (covers accidental cycles)
const MAX_TYPE_DEPTH: usize = 64;

/// Declared shape of a relation, kept for validation only
#[derive(Clone, Debug)]
pub struct RelationSignature {
    columns: Vec<Type>,
    io: Option<Io>,
}

impl RelationSignature {
    pub fn columns(&self) -> &[Type] {
        &self.columns
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn io(&self) -> Option<Io> {
        self.io
    }
}

/// Index of type definitions used to resolve custom column types down to
/// their primitive base
#[derive(Clone, Debug, Default)]
pub(crate) struct TypeIndex {
    defs: HashMap<String, Type>,
}

impl TypeIndex {
    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn add(&mut self, def: &TypeDef) {
        self.defs.insert(def.name().to_string(), def.base().clone());
    }

    /// Build an index from every type definition in a program
    pub fn from_program(program: &Program) -> Self {
        let mut index = TypeIndex::default();
        for def in program.type_defs() {
            index.add(def);
        }
        index
    }

    /// Resolve a column type to its primitive base by following the
    /// typedef chain. `None` when the chain hits an unknown name or
    /// exceeds the depth bound; the engine's own type checker reports
    /// those, so validation skips the column.
    pub fn resolve(&self, ty: &Type) -> Option<PrimitiveType> {
        let mut current = ty;
        for _ in 0..MAX_TYPE_DEPTH {
            match current {
                Type::Primitive(p) => return Some(*p),
                Type::Custom(name) => current = self.defs.get(name)?,
            }
        }
        None
    }
}

/// Mutable aggregate root building a well-formed [`Program`] value
/// incrementally. Append-only; not safe for concurrent mutation. Build
/// it single-threaded, then hand it read-only to one or more executor
/// invocations.
#[derive(Clone, Debug)]
pub struct Context {
    name: String,
    comment: Option<Comment>,
    entries: Vec<Entry>,
    relations: HashMap<String, RelationSignature>,
    types: TypeIndex,
}

impl Context {
    /// Create an empty context for a named program
    pub fn new(name: impl Into<String>) -> Self {
        Context {
            name: name.into(),
            comment: None,
            entries: Vec::new(),
            relations: HashMap::new(),
            types: TypeIndex::default(),
        }
    }

    /// Attach a header comment emitted before all entries
    pub fn with_comment(mut self, comment: Comment) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up the declared signature of a relation
    pub fn relation(&self, name: &str) -> Option<&RelationSignature> {
        self.relations.get(name)
    }

    /// Append a comment, type definition, relation declaration, fact, or
    /// rule. A relation registers its signature in the validation index;
    /// redeclaring a name fails with [`UsageError::DuplicateRelation`].
    /// A fact added through here is validated exactly like `add_fact`.
    pub fn add(&mut self, entry: impl Into<Entry>) -> Result<()> {
        let entry = entry.into();
        match &entry {
            Entry::Relation(rel) => {
                if self.relations.contains_key(rel.name()) {
                    return Err(UsageError::DuplicateRelation(rel.name().to_string()).into());
                }
                self.relations.insert(
                    rel.name().to_string(),
                    RelationSignature {
                        columns: rel.args().iter().map(|a| a.ty().clone()).collect(),
                        io: rel.io(),
                    },
                );
            }
            Entry::TypeDef(def) => {
                if self.types.contains(def.name()) {
                    return Err(UsageError::DuplicateType(def.name().to_string()).into());
                }
                self.types.add(def);
            }
            Entry::Fact(fact) => {
                self.check_fact(fact.relation(), fact.values())?;
            }
            Entry::Comment(_) | Entry::Rule(_) => {}
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Append a fact for an already-declared relation. Fails with a
    /// [`UsageError`] when the relation is undeclared, the value count
    /// does not match the declared arity, or a value's shape is
    /// incompatible with its column type. Emission order equals
    /// insertion order.
    pub fn add_fact(&mut self, relation: &str, values: Vec<Value>) -> Result<()> {
        self.check_fact(relation, &values)?;
        self.entries.push(Entry::Fact(Fact::new(relation, values)));
        Ok(())
    }

    /// Like `add_fact`, with opaque caller metadata attached to the fact
    pub fn add_fact_with_meta(
        &mut self,
        relation: &str,
        values: Vec<Value>,
        metadata: serde_json::Value,
    ) -> Result<()> {
        self.check_fact(relation, &values)?;
        self.entries
            .push(Entry::Fact(Fact::new(relation, values).with_metadata(metadata)));
        Ok(())
    }

    fn check_fact(&self, relation: &str, values: &[Value]) -> std::result::Result<(), UsageError> {
        let sig = self
            .relations
            .get(relation)
            .ok_or_else(|| UsageError::UndeclaredRelation(relation.to_string()))?;

        if values.len() != sig.arity() {
            return Err(UsageError::ArityMismatch {
                relation: relation.to_string(),
                expected: sig.arity(),
                actual: values.len(),
            });
        }

        for (column, (value, ty)) in values.iter().zip(sig.columns()).enumerate() {
            // Unresolvable custom type: the engine's type checker owns it
            let Some(primitive) = self.types.resolve(ty) else {
                continue;
            };
            let compatible = match primitive {
                PrimitiveType::Symbol => !value.is_numeric(),
                PrimitiveType::Number | PrimitiveType::Unsigned | PrimitiveType::Float => {
                    value.is_numeric()
                }
            };
            if !compatible {
                return Err(UsageError::TypeMismatch {
                    relation: relation.to_string(),
                    column,
                    expected: primitive.keyword(),
                    actual: value.kind_name(),
                });
            }
            // A non-finite float has no literal the engine accepts
            if let Value::Float(f) = value {
                if !f.is_finite() {
                    return Err(UsageError::TypeMismatch {
                        relation: relation.to_string(),
                        column,
                        expected: primitive.keyword(),
                        actual: "non-finite float",
                    });
                }
            }
        }
        Ok(())
    }

    /// Clone the current entries into an immutable [`Program`] value.
    /// Repeated calls observe later additions; a snapshot taken earlier
    /// is never retroactively mutated.
    pub fn snapshot(&self) -> Program {
        let program = Program::new(self.name.clone(), self.entries.clone());
        match &self.comment {
            Some(comment) => program.with_comment(comment.clone()),
            None => program,
        }
    }
}
