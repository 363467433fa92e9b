use crate::error::FrugalError;
use crate::parser::{RawEnum, RawInclude, RawScope, Statement};
use frugal_ast::{
    Enum, EnumValue, FieldModifier, Frugal, Include, Scope, ScopePrefix,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

lazy_static! {
    static ref PREFIX_VARIABLE: Regex = Regex::new(r"\{([^}]*)\}").unwrap();
}

/// Converts parsed statements into the semantic model. This is where
/// schema-level derived properties get computed: concrete enum values,
/// union/exception optionality, include lookup keys, and prefix variables.
/// Includes are recorded but not yet resolved.
pub fn build(
    statements: Vec<Statement>,
    name: &str,
    path: PathBuf,
) -> Result<Frugal, FrugalError> {
    let mut frugal = Frugal::new(name, path);

    for statement in statements {
        match statement {
            Statement::Include(raw) => frugal.includes.push(build_include(raw)),
            Statement::Namespace(ns) => frugal.namespaces.push(ns),
            Statement::Constant(c) => frugal.constants.push(c),
            Statement::Typedef(t) => frugal.typedefs.push(t),
            Statement::Enum(raw) => frugal.enums.push(build_enum(raw)),
            Statement::Struct(s) => frugal.structs.push(s),
            Statement::Exception(s) => frugal.exceptions.push(s),
            Statement::Union(mut s) => {
                // unions model "exactly one of": every field is optional no
                // matter how it was declared
                for field in &mut s.fields {
                    field.modifier = FieldModifier::Optional;
                }
                frugal.unions.push(s);
            }
            Statement::Service(mut s) => {
                for method in &mut s.methods {
                    for exc in &mut method.exceptions {
                        exc.modifier = FieldModifier::Optional;
                    }
                }
                frugal.services.push(s);
            }
            Statement::Scope(raw) => frugal.scopes.push(build_scope(raw)),
        }
    }

    Ok(frugal)
}

/// The include's lookup key is the base filename with the directory and the
/// `.frugal`/`.thrift` extension stripped.
pub fn include_base_name(value: &str) -> String {
    let base = value.rsplit(['/', '\\']).next().unwrap_or(value);
    base.strip_suffix(".frugal")
        .or_else(|| base.strip_suffix(".thrift"))
        .unwrap_or(base)
        .to_string()
}

fn build_include(raw: RawInclude) -> Include {
    Include {
        name:        include_base_name(&raw.value),
        value:       raw.value,
        annotations: raw.annotations,
    }
}

/// Assigns concrete integers to enum values. An omitted value gets the next
/// unassigned number: one above the highest value seen so far, starting at
/// zero. Explicit values may jump backwards without disturbing the
/// high-water mark, and collisions between explicit and auto-assigned
/// values are tolerated.
fn build_enum(raw: RawEnum) -> Enum {
    let mut next = 0i32;
    let mut values = Vec::with_capacity(raw.values.len());
    for rv in raw.values {
        let value = match rv.value {
            Some(v) => {
                next = next.max(v.saturating_add(1));
                v
            }
            None => {
                let v = next;
                next = next.saturating_add(1);
                v
            }
        };
        values.push(EnumValue {
            name:    rv.name,
            value,
            comment: rv.comment,
        });
    }
    Enum {
        name:    raw.name,
        values,
        comment: raw.comment,
    }
}

fn build_scope(raw: RawScope) -> Scope {
    let prefix_string = raw.prefix.unwrap_or_default();
    let variables = PREFIX_VARIABLE
        .captures_iter(&prefix_string)
        .map(|c| c[1].to_string())
        .collect();
    Scope {
        name:       raw.name,
        prefix:     ScopePrefix {
            string: prefix_string,
            variables,
        },
        operations: raw.operations,
        comment:    raw.comment,
    }
}
