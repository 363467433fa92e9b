use crate::error::FrugalError;
use crate::utils::quote;
use frugal_ast::{Frugal, Method, Type};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    // at least two characters, leading letters, then a letter or digit
    static ref VALID_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z]+[A-Za-z0-9]").unwrap();
    static ref VALID_PREFIX_VARIABLE: Regex = Regex::new(r"^[A-Za-z]+[A-Za-z0-9]*$").unwrap();
}

/// Validates a fully resolved schema graph: naming rules, duplicate
/// identifiers, method constraints, and cross-file references. Includes are
/// validated recursively.
pub fn validate(frugal: &Frugal) -> Result<(), FrugalError> {
    validate_program(frugal)?;
    for include in frugal.parsed_includes.values() {
        validate(include)?;
    }
    Ok(())
}

fn semantic(msg: String) -> FrugalError {
    FrugalError::Semantic(msg)
}

fn check_name(file: &str, what: &str, name: &str) -> Result<(), FrugalError> {
    if VALID_IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(semantic(format!(
            "{}: {} {} is not a valid identifier",
            file,
            what,
            quote(name)
        )))
    }
}

fn check_duplicates<'a>(
    file: &str,
    what: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), FrugalError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(semantic(format!(
                "{}: duplicate {} {}",
                file,
                what,
                quote(name)
            )));
        }
    }
    Ok(())
}

fn check_field_ids(
    file: &str,
    container: &str,
    fields: &[frugal_ast::Field],
) -> Result<(), FrugalError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.id) {
            return Err(semantic(format!(
                "{}: {}: field id {} used twice (field {})",
                file,
                container,
                field.id,
                quote(&field.name)
            )));
        }
    }
    Ok(())
}

fn check_method(file: &str, service: &str, method: &Method) -> Result<(), FrugalError> {
    let container = format!("service {}: method {}", service, method.name);
    check_name(file, &container, &method.name)?;
    if method.oneway {
        if method.return_type.is_some() {
            return Err(semantic(format!(
                "{}: {}: oneway method cannot have a return type",
                file, container
            )));
        }
        if !method.exceptions.is_empty() {
            return Err(semantic(format!(
                "{}: {}: oneway method cannot declare exceptions",
                file, container
            )));
        }
    }
    for field in method.arguments.iter().chain(&method.exceptions) {
        check_name(file, &format!("{}: field", container), &field.name)?;
    }
    check_field_ids(file, &format!("{} arguments", container), &method.arguments)?;
    check_field_ids(file, &format!("{} exceptions", container), &method.exceptions)?;
    Ok(())
}

fn validate_program(f: &Frugal) -> Result<(), FrugalError> {
    let file = f.name.as_str();
    check_name(file, "file name", &f.name)?;

    check_duplicates(file, "namespace", f.namespaces.iter().map(|n| n.scope.as_str()))?;
    for ns in &f.namespaces {
        check_name(file, "namespace", &ns.value)?;
        // vendoring is language-specific, so the wildcard namespace cannot
        // carry it
        if ns.wildcard() && ns.annotation("vendor").is_some() {
            return Err(semantic(format!(
                "{}: wildcard namespace cannot be vendored",
                file
            )));
        }
    }

    check_duplicates(file, "constant", f.constants.iter().map(|c| c.name.as_str()))?;
    for constant in &f.constants {
        check_name(file, "constant", &constant.name)?;
    }

    check_duplicates(file, "typedef", f.typedefs.iter().map(|t| t.name.as_str()))?;
    for typedef in &f.typedefs {
        check_name(file, "typedef", &typedef.name)?;
        // surfaces typedef cycles and references to undeclared includes
        f.underlying_type(&typedef.typ)?;
    }

    check_duplicates(file, "enum", f.enums.iter().map(|e| e.name.as_str()))?;
    for e in &f.enums {
        check_name(file, "enum", &e.name)?;
        check_duplicates(
            file,
            &format!("value in enum {}", e.name),
            e.values.iter().map(|v| v.name.as_str()),
        )?;
        for value in &e.values {
            check_name(file, &format!("enum {}: value", e.name), &value.name)?;
        }
    }

    let struct_likes = f.structs.iter().chain(&f.exceptions).chain(&f.unions);
    check_duplicates(
        file,
        "type",
        struct_likes.clone().map(|s| s.name.as_str()),
    )?;
    for s in struct_likes {
        let container = format!("{} {}", s.typ.keyword(), s.name);
        check_name(file, &container, &s.name)?;
        for field in &s.fields {
            check_name(file, &format!("{}: field", container), &field.name)?;
        }
        check_duplicates(
            file,
            &format!("field in {}", container),
            s.fields.iter().map(|fl| fl.name.as_str()),
        )?;
        check_field_ids(file, &container, &s.fields)?;
    }

    check_duplicates(file, "service", f.services.iter().map(|s| s.name.as_str()))?;
    for service in &f.services {
        check_name(file, "service", &service.name)?;
        check_duplicates(
            file,
            &format!("method in service {}", service.name),
            service.methods.iter().map(|m| m.name.as_str()),
        )?;
        for method in &service.methods {
            check_method(file, &service.name, method)?;
        }
    }

    check_duplicates(file, "scope", f.scopes.iter().map(|s| s.name.as_str()))?;
    for scope in &f.scopes {
        check_name(file, "scope", &scope.name)?;
        check_duplicates(
            file,
            &format!("operation in scope {}", scope.name),
            scope.operations.iter().map(|o| o.name.as_str()),
        )?;
        for variable in &scope.prefix.variables {
            if !VALID_PREFIX_VARIABLE.is_match(variable) {
                return Err(semantic(format!(
                    "{}: scope {}: prefix variable {} is not a valid identifier",
                    file,
                    scope.name,
                    quote(variable)
                )));
            }
        }
        for op in &scope.operations {
            check_name(file, &format!("scope {}: operation", scope.name), &op.name)?;
            check_operation_type(f, &scope.name, &op.name, &op.typ)?;
        }
    }

    Ok(())
}

/// A scope operation's payload must resolve to a struct-shaped type defined
/// somewhere in the schema graph.
fn check_operation_type(
    f: &Frugal,
    scope: &str,
    op: &str,
    typ: &Type,
) -> Result<(), FrugalError> {
    let underlying = f.underlying_type(typ)?;
    if underlying.is_primitive() || underlying.is_container() {
        return Ok(());
    }
    if !f.contains_struct_like(&underlying.name) {
        return Err(semantic(format!(
            "{}: scope {}: operation {}: reference to undefined type {}",
            f.name,
            scope,
            op,
            quote(&underlying.name)
        )));
    }
    Ok(())
}

/// Checks a reparsed intermediate Thrift file against the schema it was
/// generated from. Namespaces must survive generation exactly, and every
/// scope operation payload of the original must still be defined somewhere
/// in the combined type graph.
pub fn validate_generated(original: &Frugal, generated: &Frugal) -> Result<(), FrugalError> {
    if original.namespaces.len() != generated.namespaces.len() {
        return Err(semantic(format!(
            "{}: generated file declares {} namespaces, expected {}",
            original.name,
            generated.namespaces.len(),
            original.namespaces.len()
        )));
    }
    for ns in &original.namespaces {
        match generated.namespaces.iter().find(|n| n.scope == ns.scope) {
            None => {
                return Err(semantic(format!(
                    "{}: generated file is missing namespace {}",
                    original.name,
                    quote(&ns.scope)
                )))
            }
            Some(gen_ns) if gen_ns.value != ns.value => {
                return Err(semantic(format!(
                    "{}: namespace {} changed from {} to {} in generated file",
                    original.name,
                    quote(&ns.scope),
                    quote(&ns.value),
                    quote(&gen_ns.value)
                )))
            }
            Some(_) => {}
        }
    }
    for scope in &original.scopes {
        for op in &scope.operations {
            let underlying = original.underlying_type(&op.typ)?;
            if underlying.is_primitive() || underlying.is_container() {
                continue;
            }
            if !original.contains_struct_like(&underlying.name)
                && !generated.contains_struct_like(&underlying.name)
            {
                return Err(semantic(format!(
                    "{}: scope {}: operation {}: reference to undefined type {}",
                    original.name,
                    scope.name,
                    op.name,
                    quote(&underlying.name)
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::parser::parse;
    use crate::tokenizer::tokenize;
    use std::path::PathBuf;

    fn validate_text(input: &str) -> Result<(), FrugalError> {
        let tokens = tokenize(input, "test").unwrap();
        let statements = parse(&tokens, "test").unwrap();
        let frugal = build(statements, "test", PathBuf::from("test.frugal")).unwrap();
        validate(&frugal)
    }

    fn expect_semantic(input: &str, needle: &str) {
        let err = validate_text(input).unwrap_err();
        assert!(
            err.to_string().contains(needle),
            "expected {:?} in {:?}",
            needle,
            err.to_string()
        );
    }

    #[test]
    fn test_valid_schema_passes() {
        validate_text(
            r#"
            namespace go events
            enum Kind { FLAT, ROUND }
            struct Event { 1: i64 id, 2: optional string message }
            service Events { Event getEvent(1: i64 id) }
            scope Stream { prefix "events.{user}" Created: Event }
            "#,
        )
        .unwrap();
    }

    #[test]
    fn test_single_letter_name_rejected() {
        expect_semantic("struct X { 1: i32 num }", "not a valid identifier");
    }

    #[test]
    fn test_leading_digit_name_rejected() {
        // a leading digit never tokenizes as an identifier, so exercise the
        // rule through a field name starting with a letter but too short
        expect_semantic("struct Event { 1: i32 a }", "not a valid identifier");
    }

    #[test]
    fn test_underscore_after_prefix_is_allowed() {
        validate_text("service Base { void base_function1() }").unwrap();
    }

    #[test]
    fn test_duplicate_field_ids_rejected() {
        expect_semantic(
            "struct Event { 1: i32 num, 1: string label }",
            "field id 1 used twice",
        );
    }

    #[test]
    fn test_duplicate_methods_rejected() {
        expect_semantic(
            "service Svc { void ping(), void ping() }",
            "duplicate method",
        );
    }

    #[test]
    fn test_oneway_with_exceptions_rejected() {
        expect_semantic(
            "service Svc { oneway void fire() throws (1: Oops err) }",
            "service Svc: method fire: oneway method cannot declare exceptions",
        );
    }

    #[test]
    fn test_oneway_with_return_type_rejected() {
        expect_semantic(
            "service Svc { oneway i32 fire() }",
            "oneway method cannot have a return type",
        );
    }

    #[test]
    fn test_wildcard_namespace_cannot_be_vendored() {
        expect_semantic(
            "namespace * shared (vendor)",
            "wildcard namespace cannot be vendored",
        );
    }

    #[test]
    fn test_vendored_language_namespace_is_fine() {
        validate_text("namespace go shared (vendor)").unwrap();
    }

    #[test]
    fn test_invalid_prefix_variable_rejected() {
        expect_semantic(
            r#"scope Events { prefix "foo.{9bad}" Created: Event }
               struct Event { 1: i32 id }"#,
            "prefix variable",
        );
    }

    #[test]
    fn test_scope_operation_with_undefined_type_rejected() {
        expect_semantic(
            "scope Events { Created: Ghost }",
            "reference to undefined type \"Ghost\"",
        );
    }

    #[test]
    fn test_typedef_cycle_rejected() {
        let err = validate_text("typedef Beta Alpha\ntypedef Alpha Beta").unwrap_err();
        assert!(matches!(err, FrugalError::Resolution(_)), "{err}");
    }

    #[test]
    fn test_validate_generated_round_trip() {
        let source = r#"
            namespace go events
            namespace java com.events
            struct Event { 1: i64 id }
            scope Stream { Created: Event }
        "#;
        let original = {
            let tokens = tokenize(source, "events").unwrap();
            let statements = parse(&tokens, "events").unwrap();
            build(statements, "events", PathBuf::from("events.frugal")).unwrap()
        };
        let thrift = crate::thrift_writer::write_thrift(&original);
        let generated = crate::compiler::parse_source(&thrift, "events").unwrap();
        validate_generated(&original, &generated).unwrap();
    }

    #[test]
    fn test_validate_generated_flags_namespace_drift() {
        let original = crate::compiler::parse_source(
            "namespace go events\nstruct Event { 1: i64 id }",
            "events",
        )
        .unwrap();
        let generated = crate::compiler::parse_source(
            "namespace go happenings\nstruct Event { 1: i64 id }",
            "events",
        )
        .unwrap();
        let err = validate_generated(&original, &generated).unwrap_err();
        assert!(err.to_string().contains("namespace \"go\" changed"), "{err}");
    }

    #[test]
    fn test_duplicate_namespace_scope_rejected() {
        expect_semantic(
            "namespace go events\nnamespace go other",
            "duplicate namespace",
        );
    }
}
