use crate::error::FrugalError;
use crate::utils::quote;
use frugal_ast::{ConstValue, Field, FieldModifier, Frugal, StructType};
use std::fs;
use std::path::{Path, PathBuf};

/// Renders the schema back as plain Thrift with every Frugal-only
/// construct (scopes) stripped. Works from the name-sorted view, so the
/// output is byte-stable across runs. This is the intermediate artifact
/// handed to the base Thrift toolchain.
pub fn write_thrift(frugal: &Frugal) -> String {
    let ordered = frugal.ordered();
    let mut out = String::new();

    for include in &ordered.includes {
        // included .frugal files are themselves compiled to .thrift
        let value = include
            .value
            .strip_suffix(".frugal")
            .map(|v| format!("{}.thrift", v))
            .unwrap_or_else(|| include.value.clone());
        out.push_str(&format!("include {}\n", quote(&value)));
    }
    if !ordered.includes.is_empty() {
        out.push('\n');
    }

    for ns in &ordered.namespaces {
        out.push_str(&format!("namespace {} {}\n", ns.scope, ns.value));
    }
    if !ordered.namespaces.is_empty() {
        out.push('\n');
    }

    for typedef in &ordered.typedefs {
        out.push_str(&format!("typedef {} {}\n", typedef.typ, typedef.name));
    }
    if !ordered.typedefs.is_empty() {
        out.push('\n');
    }

    for constant in &ordered.constants {
        out.push_str(&format!(
            "const {} {} = {}\n",
            constant.typ,
            constant.name,
            render_const(&constant.value)
        ));
    }
    if !ordered.constants.is_empty() {
        out.push('\n');
    }

    for e in &ordered.enums {
        out.push_str(&format!("enum {} {{\n", e.name));
        for value in &e.values {
            out.push_str(&format!("    {} = {},\n", value.name, value.value));
        }
        out.push_str("}\n\n");
    }

    for s in ordered
        .structs
        .iter()
        .chain(&ordered.unions)
        .chain(&ordered.exceptions)
    {
        out.push_str(&format!("{} {} {{\n", s.typ.keyword(), s.name));
        for field in &s.fields {
            out.push_str(&format!("    {},\n", render_field(field, s.typ)));
        }
        out.push_str("}\n\n");
    }

    for service in &ordered.services {
        match &service.extends {
            Some(parent) => out.push_str(&format!(
                "service {} extends {} {{\n",
                service.name, parent
            )),
            None => out.push_str(&format!("service {} {{\n", service.name)),
        }
        for method in &service.methods {
            let oneway = if method.oneway { "oneway " } else { "" };
            let return_type = method
                .return_type
                .as_ref()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "void".to_string());
            let arguments = method
                .arguments
                .iter()
                .map(|f| render_field(f, StructType::Struct))
                .collect::<Vec<_>>()
                .join(", ");
            let throws = if method.exceptions.is_empty() {
                String::new()
            } else {
                let exceptions = method
                    .exceptions
                    .iter()
                    .map(|f| render_field(f, StructType::Struct))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(" throws ({})", exceptions)
            };
            out.push_str(&format!(
                "    {}{} {}({}){},\n",
                oneway, return_type, method.name, arguments, throws
            ));
        }
        out.push_str("}\n\n");
    }

    out
}

fn render_field(field: &Field, owner: StructType) -> String {
    // Thrift rejects requiredness keywords inside unions; the optionality
    // is implied there anyway
    let modifier = match (owner, field.modifier) {
        (StructType::Union, _) => "",
        (_, FieldModifier::Required) => "required ",
        (_, FieldModifier::Optional) => "optional ",
        (_, FieldModifier::Default) => "",
    };
    let default = field
        .default
        .as_ref()
        .map(|v| format!(" = {}", render_const(v)))
        .unwrap_or_default();
    format!("{}: {}{} {}{}", field.id, modifier, field.typ, field.name, default)
}

fn render_const(value: &ConstValue) -> String {
    match value {
        ConstValue::Int(v) => v.to_string(),
        ConstValue::Double(v) => v.to_string(),
        ConstValue::String(v) => quote(v),
        ConstValue::Identifier(v) => v.clone(),
        ConstValue::List(values) => {
            let parts: Vec<String> = values.iter().map(render_const).collect();
            format!("[{}]", parts.join(", "))
        }
        ConstValue::Map(entries) => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", render_const(k), render_const(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

/// Writes the intermediate Thrift file next to the generated output,
/// returning its path. The caller removes it with [`remove_intermediate`]
/// once the base toolchain has consumed it, unless it was asked to keep it.
pub fn emit_intermediate(frugal: &Frugal, out_dir: &Path) -> Result<PathBuf, FrugalError> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{}.thrift", frugal.name));
    fs::write(&path, write_thrift(frugal))?;
    Ok(path)
}

pub fn remove_intermediate(path: &Path) -> Result<(), FrugalError> {
    fs::remove_file(path)?;
    Ok(())
}
