//! Program model for generated Soufflé source
//!
//! Immutable value types for everything that can appear in a program:
//! comments, type definitions, relation declarations, facts, atoms,
//! constraints, rules. A [`Program`] is an ordered sequence of entries;
//! order is preserved verbatim because it is semantically meaningful to
//! the engine and because emission determinism depends on it.

mod types;

pub use types::*;
