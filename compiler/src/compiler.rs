use crate::builder::build;
use crate::error::FrugalError;
use crate::includes;
use crate::parser::parse;
use crate::tokenizer::tokenize;
use crate::validator::validate;
use frugal_ast::Frugal;
use log::debug;
use std::path::{Path, PathBuf};

/// Parses source text into an unvalidated AST. Includes are recorded but
/// not resolved; useful for tooling that works on a single file.
pub fn parse_source(text: &str, name: &str) -> Result<Frugal, FrugalError> {
    let tokens = tokenize(text, name)?;
    let statements = parse(&tokens, name)?;
    build(statements, name, PathBuf::from(format!("{}.frugal", name)))
}

/// Parses and validates source text. Includes must not be present since
/// there is no directory to resolve them against.
pub fn compile_source(text: &str, name: &str) -> Result<Frugal, FrugalError> {
    let frugal = parse_source(text, name)?;
    if let Some(include) = frugal.includes.first() {
        return Err(FrugalError::Resolution(format!(
            "cannot resolve include {} without a source directory",
            crate::utils::quote(&include.value)
        )));
    }
    validate(&frugal)?;
    Ok(frugal)
}

/// The full pipeline: read the file, parse it, recursively resolve its
/// includes, and validate the whole graph. The returned AST is final;
/// generators treat it as immutable.
pub fn compile(path: &Path) -> Result<Frugal, FrugalError> {
    let frugal = includes::load(path, Vec::new())?;
    validate(&frugal)?;
    debug!(
        "compiled {}: {} structs, {} services, {} scopes",
        frugal.name,
        frugal.structs.len(),
        frugal.services.len(),
        frugal.scopes.len()
    );
    Ok(frugal)
}
