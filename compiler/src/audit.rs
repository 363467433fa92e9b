use crate::compiler::compile;
use crate::error::FrugalError;
use crate::utils::quote;
use frugal_ast::{Enum, Field, FieldModifier, Frugal, Scope, Service, Struct, Type};
use log::{error, warn};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::path::Path;

/// Sink for audit findings. Warnings are informational; the audit as a
/// whole fails iff at least one error was logged.
pub trait ValidationLogger {
    fn log_warning(&self, msg: &str);
    fn log_error(&self, msg: &str);
    fn errors_logged(&self) -> bool;
}

/// Default logger: forwards findings to the `log` crate, reporting each
/// distinct message once.
#[derive(Default)]
pub struct StdLogger {
    seen:    RefCell<HashSet<String>>,
    errored: Cell<bool>,
}

impl StdLogger {
    pub fn new() -> StdLogger {
        StdLogger::default()
    }
}

impl ValidationLogger for StdLogger {
    fn log_warning(&self, msg: &str) {
        if self.seen.borrow_mut().insert(msg.to_string()) {
            warn!("{}", msg);
        }
    }

    fn log_error(&self, msg: &str) {
        if self.seen.borrow_mut().insert(msg.to_string()) {
            error!("{}", msg);
        }
        self.errored.set(true);
    }

    fn errors_logged(&self) -> bool {
        self.errored.get()
    }
}

/// Collects findings in memory. Used by tests and by callers that want to
/// render findings themselves.
#[derive(Default)]
pub struct RecordingLogger {
    pub warnings: RefCell<Vec<String>>,
    pub errors:   RefCell<Vec<String>>,
}

impl RecordingLogger {
    pub fn new() -> RecordingLogger {
        RecordingLogger::default()
    }
}

impl ValidationLogger for RecordingLogger {
    fn log_warning(&self, msg: &str) {
        let mut warnings = self.warnings.borrow_mut();
        if !warnings.iter().any(|w| w == msg) {
            warnings.push(msg.to_string());
        }
    }

    fn log_error(&self, msg: &str) {
        let mut errors = self.errors.borrow_mut();
        if !errors.iter().any(|e| e == msg) {
            errors.push(msg.to_string());
        }
    }

    fn errors_logged(&self) -> bool {
        !self.errors.borrow().is_empty()
    }
}

/// Compares two revisions of a schema and reports breaking changes as
/// errors and benign ones as warnings.
pub struct Auditor<'a> {
    logger: &'a dyn ValidationLogger,
}

impl<'a> Auditor<'a> {
    pub fn new(logger: &'a dyn ValidationLogger) -> Auditor<'a> {
        Auditor { logger }
    }

    /// Compiles both files through the full pipeline, then diffs them.
    pub fn audit(&self, old_path: &Path, new_path: &Path) -> Result<(), FrugalError> {
        let old = compile(old_path)?;
        let new = compile(new_path)?;
        self.audit_parsed(&old, &new)
    }

    pub fn audit_parsed(&self, old: &Frugal, new: &Frugal) -> Result<(), FrugalError> {
        let diff = Diff {
            old,
            new,
            logger: self.logger,
        };
        diff.check_namespaces();
        diff.check_constants();
        diff.check_enums();
        diff.check_struct_category(&old.structs, &new.structs);
        diff.check_struct_category(&old.exceptions, &new.exceptions);
        diff.check_struct_category(&old.unions, &new.unions);
        diff.check_services();
        diff.check_scopes();
        if self.logger.errors_logged() {
            Err(FrugalError::AuditFailure)
        } else {
            Ok(())
        }
    }
}

struct Diff<'a> {
    old:    &'a Frugal,
    new:    &'a Frugal,
    logger: &'a dyn ValidationLogger,
}

impl<'a> Diff<'a> {
    /// Compares underlying types, recursing into container key/value types.
    /// Typedef names may change freely as long as the underlying types
    /// agree.
    fn types_match(&self, old_t: &Type, new_t: &Type) -> bool {
        let old_u = self.old.underlying_type(old_t).unwrap_or(old_t);
        let new_u = self.new.underlying_type(new_t).unwrap_or(new_t);
        if old_u.name != new_u.name {
            return false;
        }
        match (&old_u.key_type, &new_u.key_type) {
            (Some(a), Some(b)) if !self.types_match(a, b) => return false,
            (Some(_), None) | (None, Some(_)) => return false,
            _ => {}
        }
        match (&old_u.value_type, &new_u.value_type) {
            (Some(a), Some(b)) if !self.types_match(a, b) => return false,
            (Some(_), None) | (None, Some(_)) => return false,
            _ => {}
        }
        true
    }

    fn check_namespaces(&self) {
        for old_ns in &self.old.namespaces {
            match self.new.namespaces.iter().find(|n| n.scope == old_ns.scope) {
                None => self.logger.log_warning(&format!(
                    "namespace {} removed",
                    quote(&old_ns.scope)
                )),
                Some(new_ns) if new_ns.value != old_ns.value => {
                    self.logger.log_warning(&format!(
                        "namespace {} changed from {} to {}",
                        quote(&old_ns.scope),
                        quote(&old_ns.value),
                        quote(&new_ns.value)
                    ))
                }
                Some(_) => {}
            }
        }
    }

    fn check_constants(&self) {
        for old_c in &self.old.constants {
            match self.new.constant(&old_c.name) {
                None => self
                    .logger
                    .log_warning(&format!("constant {} removed", quote(&old_c.name))),
                Some(new_c) => {
                    if !self.types_match(&old_c.typ, &new_c.typ) {
                        self.logger.log_warning(&format!(
                            "constant {} changed type from {} to {}",
                            quote(&old_c.name),
                            old_c.typ,
                            new_c.typ
                        ));
                    } else if new_c.value != old_c.value {
                        self.logger.log_warning(&format!(
                            "constant {} changed value",
                            quote(&old_c.name)
                        ));
                    }
                }
            }
        }
    }

    fn check_enums(&self) {
        for old_e in &self.old.enums {
            match self.new.enum_def(&old_e.name) {
                None => self
                    .logger
                    .log_error(&format!("enum {} removed", quote(&old_e.name))),
                Some(new_e) => self.check_enum_values(old_e, new_e),
            }
        }
    }

    /// The wire format carries the integer, so identity is the numeric
    /// value: a missing number is breaking, a renamed one is not.
    fn check_enum_values(&self, old_e: &Enum, new_e: &Enum) {
        for old_v in &old_e.values {
            match new_e.value_by_number(old_v.value) {
                None => self.logger.log_error(&format!(
                    "enum {}: value {} ({}) removed",
                    quote(&old_e.name),
                    quote(&old_v.name),
                    old_v.value
                )),
                Some(new_v) if new_v.name != old_v.name => {
                    self.logger.log_warning(&format!(
                        "enum {}: value {} renamed to {}",
                        quote(&old_e.name),
                        quote(&old_v.name),
                        quote(&new_v.name)
                    ))
                }
                Some(_) => {}
            }
        }
    }

    fn check_struct_category(&self, old_list: &[Struct], new_list: &[Struct]) {
        for old_s in old_list {
            let ctx = format!("{} {}", old_s.typ.keyword(), quote(&old_s.name));
            match new_list.iter().find(|s| s.name == old_s.name) {
                None => self.logger.log_error(&format!("{} removed", ctx)),
                Some(new_s) => {
                    self.check_field_lists(&ctx, &old_s.fields, &new_s.fields, false)
                }
            }
        }
    }

    /// Fields are keyed by their numeric ID. `warn_names` enables the
    /// rename warning used for method arguments and exceptions, where the
    /// generated signatures embed the names.
    fn check_field_lists(&self, ctx: &str, old: &[Field], new: &[Field], warn_names: bool) {
        let min_id = old.iter().map(|f| f.id).min();
        let max_id = old.iter().map(|f| f.id).max();

        for old_f in old {
            match new.iter().find(|f| f.id == old_f.id) {
                None => {
                    // dropping an optional field is the one safe removal
                    if old_f.modifier != FieldModifier::Optional {
                        self.logger.log_error(&format!(
                            "{}: field {} removed",
                            ctx,
                            quote(&old_f.name)
                        ));
                    }
                }
                Some(new_f) => {
                    if !self.types_match(&old_f.typ, &new_f.typ) {
                        self.logger.log_error(&format!(
                            "{}: field {} changed type from {} to {}",
                            ctx,
                            quote(&old_f.name),
                            old_f.typ,
                            new_f.typ
                        ));
                    }
                    if (old_f.modifier == FieldModifier::Required)
                        != (new_f.modifier == FieldModifier::Required)
                    {
                        self.logger.log_error(&format!(
                            "{}: field {} changed presence modifier",
                            ctx,
                            quote(&old_f.name)
                        ));
                    }
                    if warn_names && new_f.name != old_f.name {
                        self.logger.log_warning(&format!(
                            "{}: field {} renamed to {}",
                            ctx,
                            quote(&old_f.name),
                            quote(&new_f.name)
                        ));
                    }
                }
            }
        }

        for new_f in new {
            if old.iter().any(|f| f.id == new_f.id) {
                continue;
            }
            if new_f.modifier == FieldModifier::Required {
                self.logger.log_error(&format!(
                    "{}: new field {} is required",
                    ctx,
                    quote(&new_f.name)
                ));
            }
            // an ID strictly inside the old range suggests a reused tag
            if let (Some(min), Some(max)) = (min_id, max_id) {
                if new_f.id > min && new_f.id < max {
                    self.logger.log_warning(&format!(
                        "{}: field {} added in the middle of the id range",
                        ctx,
                        quote(&new_f.name)
                    ));
                }
            }
        }
    }

    fn check_services(&self) {
        for old_s in &self.old.services {
            match self.new.service(&old_s.name) {
                None => self
                    .logger
                    .log_error(&format!("service {} removed", quote(&old_s.name))),
                Some(new_s) => self.check_service(old_s, new_s),
            }
        }
    }

    fn check_service(&self, old_s: &Service, new_s: &Service) {
        if old_s.extends.is_some() && new_s.extends != old_s.extends {
            self.logger.log_error(&format!(
                "service {} no longer extends {}",
                quote(&old_s.name),
                quote(old_s.extends.as_deref().unwrap_or(""))
            ));
        }
        for old_m in &old_s.methods {
            let ctx = format!(
                "service {}: method {}",
                quote(&old_s.name),
                quote(&old_m.name)
            );
            let Some(new_m) = new_s.method(&old_m.name) else {
                self.logger.log_error(&format!("{} removed", ctx));
                continue;
            };
            if new_m.oneway != old_m.oneway {
                self.logger
                    .log_error(&format!("{} changed oneway modifier", ctx));
            }
            match (&old_m.return_type, &new_m.return_type) {
                (None, None) => {
                    // the response shape of a void method is fixed by
                    // whether it can throw at all
                    if old_m.exceptions.is_empty() != new_m.exceptions.is_empty() {
                        self.logger.log_error(&format!(
                            "{} changed its exception channel",
                            ctx
                        ));
                    }
                }
                (Some(old_t), Some(new_t)) => {
                    if !self.types_match(old_t, new_t) {
                        self.logger.log_error(&format!(
                            "{} changed return type from {} to {}",
                            ctx, old_t, new_t
                        ));
                    }
                }
                _ => self
                    .logger
                    .log_error(&format!("{} changed return type", ctx)),
            }
            self.check_field_lists(&ctx, &old_m.arguments, &new_m.arguments, true);
            self.check_field_lists(&ctx, &old_m.exceptions, &new_m.exceptions, true);
        }
    }

    fn check_scopes(&self) {
        for old_s in &self.old.scopes {
            match self.new.scope_def(&old_s.name) {
                None => self
                    .logger
                    .log_error(&format!("scope {} removed", quote(&old_s.name))),
                Some(new_s) => self.check_scope(old_s, new_s),
            }
        }
    }

    /// Placeholder names may change freely; the prefix structure may not.
    fn check_scope(&self, old_s: &Scope, new_s: &Scope) {
        if old_s.prefix.normalized() != new_s.prefix.normalized() {
            self.logger.log_error(&format!(
                "scope {}: prefix changed from {} to {}",
                quote(&old_s.name),
                quote(&old_s.prefix.string),
                quote(&new_s.prefix.string)
            ));
        }
        for old_op in &old_s.operations {
            match new_s.operation(&old_op.name) {
                None => self.logger.log_error(&format!(
                    "scope {}: operation {} removed",
                    quote(&old_s.name),
                    quote(&old_op.name)
                )),
                Some(new_op) => {
                    if !self.types_match(&old_op.typ, &new_op.typ) {
                        self.logger.log_error(&format!(
                            "scope {}: operation {} changed type from {} to {}",
                            quote(&old_s.name),
                            quote(&old_op.name),
                            old_op.typ,
                            new_op.typ
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_source;

    fn audit_texts(old: &str, new: &str) -> (Vec<String>, Vec<String>) {
        let old = compile_source(old, "old").unwrap();
        let new = compile_source(new, "new").unwrap();
        let logger = RecordingLogger::new();
        let _ = Auditor::new(&logger).audit_parsed(&old, &new);
        let errors = logger.errors.borrow().clone();
        let warnings = logger.warnings.borrow().clone();
        (errors, warnings)
    }

    #[test]
    fn test_audit_against_self_is_clean() {
        let schema = r#"
            namespace go events
            const i32 LIMIT = 10
            enum Kind { FLAT, ROUND = 5 }
            struct Event { 1: i64 id, 2: optional string message }
            service Events { Event getEvent(1: i64 id) throws (1: Missing err) }
            exception Missing { 1: string reason }
            scope Stream { prefix "events.{user}" Created: Event }
        "#;
        let (errors, warnings) = audit_texts(schema, schema);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_optional_field_removal_is_silent() {
        let (errors, warnings) = audit_texts(
            "struct Event { 1: i64 id, 2: optional string message }",
            "struct Event { 1: i64 id }",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_default_field_removal_is_an_error() {
        let (errors, _) = audit_texts(
            "struct Event { 1: i64 id, 2: string message }",
            "struct Event { 1: i64 id }",
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("field \"message\" removed"), "{errors:?}");
    }

    #[test]
    fn test_required_flip_is_an_error() {
        let (errors, _) = audit_texts(
            "struct Event { 1: required i64 id }",
            "struct Event { 1: i64 id }",
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("presence modifier"), "{errors:?}");
    }

    #[test]
    fn test_field_type_change_is_an_error() {
        let (errors, _) = audit_texts(
            "struct Event { 1: i64 id }",
            "struct Event { 1: string id }",
        );
        assert!(errors[0].contains("changed type from i64 to string"), "{errors:?}");
    }

    #[test]
    fn test_typedef_rename_with_same_underlying_type_is_clean() {
        let (errors, warnings) = audit_texts(
            "typedef i64 Id\nstruct Event { 1: Id id }",
            "typedef i64 Identifier\nstruct Event { 1: Identifier id }",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_new_required_field_is_an_error() {
        let (errors, _) = audit_texts(
            "struct Event { 1: i64 id }",
            "struct Event { 1: i64 id, 2: required string tag }",
        );
        assert!(errors[0].contains("new field \"tag\" is required"), "{errors:?}");
    }

    #[test]
    fn test_field_added_in_the_middle_is_a_warning() {
        let (errors, warnings) = audit_texts(
            "struct Event { 1: i64 id, 5: string tag }",
            "struct Event { 1: i64 id, 3: optional i32 extra, 5: string tag }",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("added in the middle"), "{warnings:?}");
    }

    #[test]
    fn test_field_added_at_range_bounds_is_silent() {
        // strictly-between semantics: appending above the max is clean
        let (errors, warnings) = audit_texts(
            "struct Event { 1: i64 id, 5: string tag }",
            "struct Event { 1: i64 id, 5: string tag, 6: optional i32 extra }",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_enum_value_removed_is_an_error_and_rename_is_a_warning() {
        let (errors, warnings) = audit_texts(
            "enum Kind { FLAT, ROUND, POINTED }",
            "enum Kind { FLAT, CIRCULAR }",
        );
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("value \"POINTED\" (2) removed"), "{errors:?}");
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("\"ROUND\" renamed to \"CIRCULAR\""), "{warnings:?}");
    }

    #[test]
    fn test_namespace_change_is_a_warning() {
        let (errors, warnings) = audit_texts(
            "namespace go events\nnamespace java com.events",
            "namespace go happenings",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(warnings.len(), 2, "{warnings:?}");
    }

    #[test]
    fn test_constant_change_is_a_warning() {
        let (errors, warnings) = audit_texts(
            "const i32 LIMIT = 10",
            "const i32 LIMIT = 20",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(warnings.len(), 1, "{warnings:?}");
    }

    #[test]
    fn test_method_removed_and_oneway_flip_are_errors() {
        let (errors, _) = audit_texts(
            "service Svc { void ping(), oneway void fire() }",
            "service Svc { void fire() }",
        );
        assert_eq!(errors.len(), 2, "{errors:?}");
    }

    #[test]
    fn test_void_method_gaining_exceptions_is_an_error() {
        let (errors, _) = audit_texts(
            "service Svc { void ping() }",
            "exception Oops { 1: string msg }\nservice Svc { void ping() throws (1: Oops err) }",
        );
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("exception channel"), "{errors:?}");
    }

    #[test]
    fn test_extends_change_is_an_error() {
        let (errors, _) = audit_texts(
            "service Child extends Parent {}\nservice Parent {}",
            "service Child {}\nservice Parent {}",
        );
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("no longer extends"), "{errors:?}");
    }

    #[test]
    fn test_argument_rename_is_a_warning() {
        let (errors, warnings) = audit_texts(
            "service Svc { void ping(1: i32 count) }",
            "service Svc { void ping(1: i32 total) }",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(warnings.len(), 1, "{warnings:?}");
    }

    #[test]
    fn test_scope_prefix_placeholder_rename_is_clean() {
        let (errors, warnings) = audit_texts(
            r#"struct Event { 1: i64 id } scope S { prefix "foo.{a}.bar" Created: Event }"#,
            r#"struct Event { 1: i64 id } scope S { prefix "foo.{b}.bar" Created: Event }"#,
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_scope_prefix_structure_change_is_an_error() {
        let (errors, _) = audit_texts(
            r#"struct Event { 1: i64 id } scope S { prefix "foo.{a}.bar" Created: Event }"#,
            r#"struct Event { 1: i64 id } scope S { prefix "foo.{a}.{b}.bar" Created: Event }"#,
        );
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("prefix changed"), "{errors:?}");
    }

    #[test]
    fn test_exception_field_changes_are_audited_like_struct_fields() {
        let (errors, _) = audit_texts(
            "exception Oops { 1: string reason }",
            "exception Oops { 1: i32 reason }",
        );
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("exception \"Oops\""), "{errors:?}");
    }

    #[test]
    fn test_struct_removed_is_an_error() {
        let (errors, _) = audit_texts(
            "struct Event { 1: i64 id }\nstruct Extra { 1: i64 id }",
            "struct Event { 1: i64 id }",
        );
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("struct \"Extra\" removed"), "{errors:?}");
    }

    #[test]
    fn test_argument_added_in_the_middle_is_a_warning() {
        let (errors, warnings) = audit_texts(
            "service Svc { void ping(1: i32 first, 5: i32 last) }",
            "service Svc { void ping(1: i32 first, 3: i32 inserted, 5: i32 last) }",
        );
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("added in the middle"), "{warnings:?}");
    }

    #[test]
    fn test_recording_logger_dedups_identical_messages() {
        let logger = RecordingLogger::new();
        logger.log_error("same finding");
        logger.log_error("same finding");
        logger.log_warning("same note");
        logger.log_warning("same note");
        assert_eq!(logger.errors.borrow().len(), 1);
        assert_eq!(logger.warnings.borrow().len(), 1);
        assert!(logger.errors_logged());
    }

    #[test]
    fn test_scope_operation_removed_is_an_error() {
        let (errors, _) = audit_texts(
            r#"struct Event { 1: i64 id } scope S { Created: Event Deleted: Event }"#,
            r#"struct Event { 1: i64 id } scope S { Created: Event }"#,
        );
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].contains("operation \"Deleted\" removed"), "{errors:?}");
    }
}
