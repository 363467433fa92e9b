//! frugal-compiler
//!
//! This crate implements the Frugal IDL compiler front end:
//!  1) A tokenizer + parser for `.frugal`/`.thrift` IDL files,
//!  2) An AST builder (enum numbering, union optionality, prefix variables),
//!  3) Recursive include resolution with cycle detection,
//!  4) A semantic validator (naming, duplicates, method constraints),
//!  5) A schema audit engine for breaking-change detection,
//!  6) The generator contract and the intermediate Thrift writer.

pub mod audit;
pub mod builder;
pub mod compiler;
pub mod error;
pub mod generator;
pub mod includes;
pub mod parser;
pub mod thrift_writer;
pub mod tokenizer;
pub mod utils;
pub mod validator;

pub use audit::{Auditor, RecordingLogger, StdLogger, ValidationLogger};
pub use compiler::{compile, compile_source, parse_source};
pub use error::FrugalError;
pub use generator::{Config, Generator, Options};
pub use thrift_writer::{emit_intermediate, write_thrift};
pub use validator::{validate, validate_generated};
