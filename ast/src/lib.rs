//! frugal-ast
//!
//! Semantic model for the Frugal IDL. A parsed `.frugal` (or `.thrift`) file
//! becomes a [`Frugal`] value owning every declaration in the file plus the
//! fully parsed sub-ASTs of its `include`s. Cross-file references travel as
//! string keys (`include.TypeName`) resolved through the owning root, so the
//! whole schema graph is a plain ownership tree with no back-pointers.
//!
//! ```
//! use frugal_ast::*;
//!
//! let t = Type::container("map", Some(Type::new("string")), Type::new("i32"));
//! assert_eq!(t.to_string(), "map<string, i32>");
//! ```

pub mod order;
pub mod resolve;
pub mod types;

pub use resolve::ResolveError;
pub use types::*;
