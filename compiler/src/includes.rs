use crate::builder::build;
use crate::error::FrugalError;
use crate::parser::parse;
use crate::tokenizer::tokenize;
use frugal_ast::Frugal;
use log::debug;
use std::fs;
use std::path::Path;

/// Parses a schema file and recursively loads everything it includes.
/// `visited` carries the base names of the files currently being resolved on
/// this branch of the include graph; it is cloned per include so sibling
/// branches cannot poison each other with false cycles.
pub fn load(path: &Path, visited: Vec<String>) -> Result<Frugal, FrugalError> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let label = path.display().to_string();
    debug!("parsing {}", label);

    let text = fs::read_to_string(path)?;
    let tokens = tokenize(&text, &label)?;
    let statements = parse(&tokens, &label)?;
    let mut frugal = build(statements, &name, path.to_path_buf())?;
    resolve_includes(&mut frugal, visited)?;
    Ok(frugal)
}

/// Resolves every include of `frugal` relative to its own directory,
/// storing each parsed sub-AST under the include's base name. A base name
/// already in flight on this branch is a circular include, reported with
/// the full ordered cycle.
pub fn resolve_includes(frugal: &mut Frugal, mut visited: Vec<String>) -> Result<(), FrugalError> {
    visited.push(frugal.name.clone());
    let dir = frugal
        .path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    for include in frugal.includes.clone() {
        let target = dir.join(&include.value);
        if !target.is_file() {
            return Err(FrugalError::Resolution(format!(
                "include not found: {}",
                target.display()
            )));
        }
        if visited.iter().any(|v| *v == include.name) {
            let mut cycle = visited.clone();
            cycle.push(include.name.clone());
            return Err(FrugalError::Resolution(format!(
                "Circular include: [{}]",
                cycle.join(" ")
            )));
        }
        let sub = load(&target, visited.clone())?;
        frugal.parsed_includes.insert(include.name, sub);
    }
    Ok(())
}
