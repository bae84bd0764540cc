//! Core AST types: Comment, Type, TypeDef, Relation, Fact, Atom,
//! Constraint, Rule, Program

use serde::{Deserialize, Serialize};

/// Comment style as it renders in source text
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentStyle {
    /// `// ...` one marker per line
    Line,
    /// `/* ... */` spanning all lines
    Block,
}

/// A source comment, either free-standing or attached to a relation,
/// rule, or program
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    style: CommentStyle,
    lines: Vec<String>,
}

impl Comment {
    /// Create a single-line `//` comment
    pub fn line(text: impl Into<String>) -> Self {
        Comment {
            style: CommentStyle::Line,
            lines: vec![text.into()],
        }
    }

    /// Create a multi-line `//` comment, one marker per line
    pub fn lines(lines: Vec<String>) -> Self {
        Comment {
            style: CommentStyle::Line,
            lines,
        }
    }

    /// Create a `/* ... */` block comment
    pub fn block(lines: Vec<String>) -> Self {
        Comment {
            style: CommentStyle::Block,
            lines,
        }
    }

    /// Get the comment style
    pub fn style(&self) -> CommentStyle {
        self.style
    }

    /// Get the text lines
    pub fn text(&self) -> &[String] {
        &self.lines
    }
}

/// The engine's fixed primitive type enumeration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Symbol,
    Number,
    Unsigned,
    Float,
}

impl PrimitiveType {
    /// Keyword as it appears in declarations
    pub fn keyword(&self) -> &'static str {
        match self {
            PrimitiveType::Symbol => "symbol",
            PrimitiveType::Number => "number",
            PrimitiveType::Unsigned => "unsigned",
            PrimitiveType::Float => "float",
        }
    }

    /// Check if columns of this type hold numeric values
    pub fn is_numeric(&self) -> bool {
        !matches!(self, PrimitiveType::Symbol)
    }
}

/// A type annotation on a relation column or type definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// One of the engine's built-in types
    Primitive(PrimitiveType),
    /// A named type introduced by a [`TypeDef`]
    Custom(String),
}

impl Type {
    pub fn symbol() -> Self {
        Type::Primitive(PrimitiveType::Symbol)
    }

    pub fn number() -> Self {
        Type::Primitive(PrimitiveType::Number)
    }

    pub fn unsigned() -> Self {
        Type::Primitive(PrimitiveType::Unsigned)
    }

    pub fn float() -> Self {
        Type::Primitive(PrimitiveType::Float)
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Type::Custom(name.into())
    }

    /// Name as it appears in source text
    pub fn name(&self) -> &str {
        match self {
            Type::Primitive(p) => p.keyword(),
            Type::Custom(name) => name,
        }
    }
}

/// How a type definition relates to its base type. Purely descriptive
/// metadata carried into emission; validation treats both the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDefKind {
    /// Alias, renders `.type Name = Base`
    Equivalence,
    /// Distinct but coercible, renders `.type Name <: Base`
    Subtype,
}

/// A named type definition binding a name to a base type
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    name: String,
    kind: TypeDefKind,
    base: Type,
}

impl TypeDef {
    /// Define an equivalence (alias) type
    pub fn equivalence(name: impl Into<String>, base: Type) -> Self {
        TypeDef {
            name: name.into(),
            kind: TypeDefKind::Equivalence,
            base,
        }
    }

    /// Define a subtype
    pub fn subtype(name: impl Into<String>, base: Type) -> Self {
        TypeDef {
            name: name.into(),
            kind: TypeDefKind::Subtype,
            base,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeDefKind {
        self.kind
    }

    pub fn base(&self) -> &Type {
        &self.base
    }
}

/// I/O direction of a relation: fed by external facts, or read back
/// after evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Io {
    Input,
    Output,
}

/// One typed argument of a relation declaration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationArg {
    name: String,
    ty: Type,
}

impl RelationArg {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        RelationArg {
            name: name.into(),
            ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }
}

/// Declaration of a relation: name, ordered typed arguments, optional
/// io direction, optional attached comment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    name: String,
    args: Vec<RelationArg>,
    io: Option<Io>,
    comment: Option<Comment>,
}

impl Relation {
    /// Declare a relation from (argument name, type) pairs
    pub fn new(name: impl Into<String>, args: Vec<(&str, Type)>) -> Self {
        Relation {
            name: name.into(),
            args: args
                .into_iter()
                .map(|(name, ty)| RelationArg::new(name, ty))
                .collect(),
            io: None,
            comment: None,
        }
    }

    /// Mark the relation as input or output
    pub fn with_io(mut self, io: Io) -> Self {
        self.io = Some(io);
        self
    }

    /// Attach a comment emitted above the declaration
    pub fn with_comment(mut self, comment: Comment) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[RelationArg] {
        &self.args
    }

    /// Number of columns; defines the arity contract for facts
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn io(&self) -> Option<Io> {
        self.io
    }

    pub fn comment(&self) -> Option<&Comment> {
        self.comment.as_ref()
    }
}

/// A concrete value: fact cell or constant term
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
}

impl Value {
    /// Check if this value goes into a numeric column
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Str(_))
    }

    /// Short name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "number",
            Value::Uint(_) => "unsigned",
            Value::Float(_) => "float",
        }
    }

    /// Get the string if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Uint(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

/// One concrete input row for a relation. Always attached to a declared
/// relation; use `Context::add_fact` so the values are validated against
/// the declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    relation: String,
    values: Vec<Value>,
    /// Opaque caller-supplied payload; never interpreted or emitted
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

impl Fact {
    pub fn new(relation: impl Into<String>, values: Vec<Value>) -> Self {
        Fact {
            relation: relation.into(),
            values,
            metadata: None,
        }
    }

    /// Attach opaque caller metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }
}

/// A term in an atom argument position
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Term {
    /// Capturing variable, emitted verbatim
    Var(String),
    /// Constant value
    Const(Value),
    /// Anonymous `_`, matches anything without capturing
    Wildcard,
}

impl Term {
    /// Create a variable term
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    /// Create a constant term
    pub fn constant(value: impl Into<Value>) -> Self {
        Term::Const(value.into())
    }

    /// Create a wildcard term
    pub fn wildcard() -> Self {
        Term::Wildcard
    }

    /// Check if this term is a variable
    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    /// Check if this term is a wildcard
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Term::Wildcard)
    }
}

/// A relation reference with argument terms, used in rule heads and
/// bodies. No arity check happens at construction: rules may reference
/// relations declared later or recursively, so consistency is left to
/// the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    relation: String,
    args: Vec<Term>,
}

impl Atom {
    pub fn new(relation: impl Into<String>, args: Vec<Term>) -> Self {
        Atom {
            relation: relation.into(),
            args,
        }
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

/// Comparison operator in a binary constraint, the engine's fixed set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl ConstraintOp {
    /// Symbol as it appears in source text
    pub fn symbol(&self) -> &'static str {
        match self {
            ConstraintOp::Lt => "<",
            ConstraintOp::Gt => ">",
            ConstraintOp::Le => "<=",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Eq => "=",
            ConstraintOp::Ne => "!=",
        }
    }
}

/// A boolean predicate usable in rule bodies
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// `lhs op rhs`
    Binary {
        lhs: Term,
        op: ConstraintOp,
        rhs: Term,
    },
    /// `match(pattern, target)` - regex match over symbols
    Match { pattern: Term, target: Term },
    /// `contains(needle, haystack)` - substring test over symbols
    Contains { needle: Term, haystack: Term },
    /// Literal `true` / `false`
    Boolean(bool),
}

impl Constraint {
    pub fn binary(lhs: Term, op: ConstraintOp, rhs: Term) -> Self {
        Constraint::Binary { lhs, op, rhs }
    }

    pub fn matches(pattern: Term, target: Term) -> Self {
        Constraint::Match { pattern, target }
    }

    pub fn contains(needle: Term, haystack: Term) -> Self {
        Constraint::Contains { needle, haystack }
    }

    pub fn boolean(value: bool) -> Self {
        Constraint::Boolean(value)
    }
}

/// What a body item wraps: an atom or a constraint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BodyNode {
    Atom(Atom),
    Constraint(Constraint),
}

/// One conjunct of a rule body with its negation flag
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyItem {
    node: BodyNode,
    negated: bool,
}

impl BodyItem {
    /// Positive atom conjunct
    pub fn atom(atom: Atom) -> Self {
        BodyItem {
            node: BodyNode::Atom(atom),
            negated: false,
        }
    }

    /// Positive constraint conjunct
    pub fn constraint(constraint: Constraint) -> Self {
        BodyItem {
            node: BodyNode::Constraint(constraint),
            negated: false,
        }
    }

    /// Negate this conjunct
    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    pub fn node(&self) -> &BodyNode {
        &self.node
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

/// A derivation rule: one or more heads, a conjunction of body items,
/// optional comment. Multiple heads denote one rule producing several
/// relations at once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    heads: Vec<Atom>,
    body: Vec<BodyItem>,
    comment: Option<Comment>,
}

impl Rule {
    pub fn new(heads: Vec<Atom>, body: Vec<BodyItem>) -> Self {
        Rule {
            heads,
            body,
            comment: None,
        }
    }

    /// Attach a comment emitted above the rule
    pub fn with_comment(mut self, comment: Comment) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn heads(&self) -> &[Atom] {
        &self.heads
    }

    pub fn body(&self) -> &[BodyItem] {
        &self.body
    }

    pub fn comment(&self) -> Option<&Comment> {
        self.comment.as_ref()
    }
}

/// Anything that can appear at the top level of a program
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Comment(Comment),
    TypeDef(TypeDef),
    Relation(Relation),
    Fact(Fact),
    Rule(Rule),
}

impl From<Comment> for Entry {
    fn from(c: Comment) -> Self {
        Entry::Comment(c)
    }
}

impl From<TypeDef> for Entry {
    fn from(d: TypeDef) -> Self {
        Entry::TypeDef(d)
    }
}

impl From<Relation> for Entry {
    fn from(r: Relation) -> Self {
        Entry::Relation(r)
    }
}

impl From<Fact> for Entry {
    fn from(f: Fact) -> Self {
        Entry::Fact(f)
    }
}

impl From<Rule> for Entry {
    fn from(r: Rule) -> Self {
        Entry::Rule(r)
    }
}

/// A complete program: name, optional header comment, ordered entries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Program {
    name: String,
    comment: Option<Comment>,
    entries: Vec<Entry>,
}

impl Program {
    pub fn new(name: impl Into<String>, entries: Vec<Entry>) -> Self {
        Program {
            name: name.into(),
            comment: None,
            entries,
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

    pub fn comment(&self) -> Option<&Comment> {
        self.comment.as_ref()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Iterate the relation declarations in stored order
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Relation(rel) => Some(rel),
            _ => None,
        })
    }

    /// Iterate the type definitions in stored order
    pub fn type_defs(&self) -> impl Iterator<Item = &TypeDef> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::TypeDef(def) => Some(def),
            _ => None,
        })
    }
}
