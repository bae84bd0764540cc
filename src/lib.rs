//! souffle-driver - build Soufflé Datalog programs as data and run the engine
//!
//! # Architecture
//!
//! - **Program model**: immutable AST values for comments, type
//!   definitions, relations, facts, rules
//! - **Context**: append-only builder validating every fact against the
//!   declared relation signatures
//! - **Emitter**: deterministic serializer to engine source text, with a
//!   diff-friendly pretty-printer
//! - **Executors**: blocking and async subprocess drivers with scoped
//!   working directories, released on every exit path
//!
//! # Usage example
//!
//! ```no_run
//! use souffle_driver::{
//!     Atom, BodyItem, Context, Executor, Io, Relation, Rule, Term, Type,
//! };
//!
//! # fn main() -> souffle_driver::Result<()> {
//! let mut ctx = Context::new("Reachability");
//! ctx.add(Relation::new("edge", vec![("from", Type::symbol()), ("to", Type::symbol())]))?;
//! ctx.add(Relation::new("reachable", vec![("node", Type::symbol())]).with_io(Io::Output))?;
//! ctx.add_fact("edge", vec!["A".into(), "B".into()])?;
//! ctx.add(Rule::new(
//!     vec![Atom::new("reachable", vec![Term::var("X")])],
//!     vec![BodyItem::atom(Atom::new("edge", vec![Term::var("X"), Term::wildcard()]))],
//! ))?;
//!
//! let result = Executor::new().execute(&ctx)?;
//! println!("{} reachable nodes", result.rows("reachable").unwrap().len());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod emit;
pub mod error;
pub mod exec;
pub mod syntax;

pub use context::{Context, RelationSignature};
pub use emit::{emit, pretty};
pub use error::{ExecutionError, InternalError, Result, SouffleError, UsageError};
pub use exec::{AsyncExecutor, ExecutionResult, Executor, ExecutorOptions};
pub use syntax::{
    Atom, BodyItem, BodyNode, Comment, CommentStyle, Constraint, ConstraintOp, Entry, Fact, Io,
    PrimitiveType, Program, Relation, RelationArg, Rule, Term, Type, TypeDef, TypeDefKind, Value,
};
