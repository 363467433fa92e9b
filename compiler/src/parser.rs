use crate::error::FrugalError;
use crate::tokenizer::{Token, TokenKind};
use crate::utils::quote;
use frugal_ast::{
    Annotation, ConstValue, Constant, Field, FieldModifier, Method, Namespace, Operation,
    Service, Struct, StructType, Type, TypeDef,
};

/// An enum value before auto-numbering has been applied.
#[derive(Debug, PartialEq)]
pub struct RawEnumValue {
    pub name:    String,
    pub value:   Option<i32>,
    pub comment: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub struct RawEnum {
    pub name:    String,
    pub values:  Vec<RawEnumValue>,
    pub comment: Vec<String>,
}

/// A scope before prefix variables have been extracted.
#[derive(Debug, PartialEq)]
pub struct RawScope {
    pub name:       String,
    pub prefix:     Option<String>,
    pub operations: Vec<Operation>,
    pub comment:    Vec<String>,
}

#[derive(Debug, PartialEq)]
pub struct RawInclude {
    pub value:       String,
    pub annotations: Vec<Annotation>,
}

/// One top-level declaration. Enums, scopes, and includes come out in raw
/// form; everything else is already the AST shape.
#[derive(Debug, PartialEq)]
pub enum Statement {
    Include(RawInclude),
    Namespace(Namespace),
    Constant(Constant),
    Typedef(TypeDef),
    Enum(RawEnum),
    Struct(Struct),
    Union(Struct),
    Exception(Struct),
    Service(Service),
    Scope(RawScope),
}

/// Parses a token stream into top-level statements. Ordered-choice with
/// save/restore backtracking: the first alternative that matches wins, and
/// a failed alternative leaves the position untouched. Any failure aborts
/// the whole parse with a single positioned syntax error.
pub fn parse(tokens: &[Token], file: &str) -> Result<Vec<Statement>, FrugalError> {
    Parser {
        tokens,
        pos: 0,
        file,
    }
    .parse_program()
}

/// Turns a `/** ... */` token into trimmed comment lines, dropping the
/// decorative leading `*` convention.
fn format_doc(raw: &str) -> Vec<String> {
    let body = raw
        .trim_start_matches("/**")
        .trim_end_matches("*/");
    let mut lines: Vec<String> = body
        .lines()
        .map(|l| {
            let l = l.trim_start();
            let l = l.strip_prefix('*').unwrap_or(l);
            l.strip_prefix(' ').unwrap_or(l).trim_end().to_string()
        })
        .collect();
    while lines.first().map(|l| l.is_empty()).unwrap_or(false) {
        lines.remove(0);
    }
    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos:    usize,
    file:   &'a str,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &'a Token {
        // the tokenizer guarantees a trailing EOF token
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn syntax_error(&self, msg: &str) -> FrugalError {
        let tok = self.current();
        FrugalError::Syntax {
            file:   self.file.to_string(),
            line:   tok.line,
            column: tok.column,
            msg:    msg.to_string(),
        }
    }

    fn unexpected_token(&self) -> FrugalError {
        self.syntax_error(&format!("unexpected token {}", quote(&self.current().text)))
    }

    fn eat_symbol(&mut self, sym: &str) -> bool {
        let tok = self.current();
        if tok.kind == TokenKind::Symbol && tok.text == sym {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let tok = self.current();
        if tok.kind == TokenKind::Identifier && tok.text == keyword {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<(), FrugalError> {
        if self.eat_symbol(sym) {
            Ok(())
        } else {
            Err(self.syntax_error(&format!(
                "expected {} but found {}",
                quote(sym),
                quote(&self.current().text)
            )))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, FrugalError> {
        let tok = self.current();
        if tok.kind == TokenKind::Identifier {
            self.pos += 1;
            Ok(tok.text.clone())
        } else {
            Err(self.syntax_error(&format!(
                "expected {} but found {}",
                what,
                quote(&tok.text)
            )))
        }
    }

    fn expect_int(&mut self, what: &str) -> Result<i32, FrugalError> {
        let tok = self.current();
        if tok.kind == TokenKind::Number {
            if let Ok(v) = tok.text.parse::<i32>() {
                self.pos += 1;
                return Ok(v);
            }
        }
        Err(self.syntax_error(&format!(
            "expected {} but found {}",
            what,
            quote(&tok.text)
        )))
    }

    /// `,` and `;` are interchangeable, optional separators everywhere.
    fn skip_separators(&mut self) {
        while self.eat_symbol(",") || self.eat_symbol(";") {}
    }

    /// Consumes any doc comments in front of the next declaration. The last
    /// one wins when several are stacked.
    fn parse_doc(&mut self) -> Vec<String> {
        let mut doc = Vec::new();
        while self.current().kind == TokenKind::DocComment {
            doc = format_doc(&self.current().text);
            self.pos += 1;
        }
        doc
    }

    fn parse_program(&mut self) -> Result<Vec<Statement>, FrugalError> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            let comment = self.parse_doc();
            if self.at_eof() {
                break;
            }
            statements.push(self.parse_statement(comment)?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self, comment: Vec<String>) -> Result<Statement, FrugalError> {
        let tok = self.current();
        if tok.kind != TokenKind::Identifier {
            return Err(self.unexpected_token());
        }
        match tok.text.as_str() {
            "include" => self.parse_include(),
            "namespace" => self.parse_namespace(),
            "const" => self.parse_const(comment),
            "typedef" => self.parse_typedef(comment),
            "enum" => self.parse_enum(comment),
            "struct" => self.parse_struct(StructType::Struct, comment),
            "union" => self.parse_struct(StructType::Union, comment),
            "exception" => self.parse_struct(StructType::Exception, comment),
            "service" => self.parse_service(comment),
            "scope" => self.parse_scope(comment),
            _ => Err(self.unexpected_token()),
        }
    }

    fn parse_include(&mut self) -> Result<Statement, FrugalError> {
        self.pos += 1;
        let tok = self.current();
        if tok.kind != TokenKind::StringLit {
            return Err(self.syntax_error(&format!(
                "expected include path but found {}",
                quote(&tok.text)
            )));
        }
        let value = tok.text.clone();
        self.pos += 1;
        let annotations = self.parse_annotations()?;
        Ok(Statement::Include(RawInclude { value, annotations }))
    }

    fn parse_namespace(&mut self) -> Result<Statement, FrugalError> {
        self.pos += 1;
        let scope = if self.eat_symbol("*") {
            "*".to_string()
        } else {
            self.expect_identifier("namespace scope")?
        };
        let tok = self.current();
        let value = match tok.kind {
            TokenKind::Identifier | TokenKind::StringLit => {
                self.pos += 1;
                tok.text.clone()
            }
            _ => {
                return Err(self.syntax_error(&format!(
                    "expected namespace value but found {}",
                    quote(&tok.text)
                )))
            }
        };
        let annotations = self.parse_annotations()?;
        Ok(Statement::Namespace(Namespace {
            scope,
            value,
            annotations,
        }))
    }

    fn parse_annotations(&mut self) -> Result<Vec<Annotation>, FrugalError> {
        let mut annotations = Vec::new();
        if !self.eat_symbol("(") {
            return Ok(annotations);
        }
        loop {
            if self.eat_symbol(")") {
                break;
            }
            if self.at_eof() {
                return Err(self.syntax_error("expected \")\" to close annotations"));
            }
            let name = self.expect_identifier("annotation name")?;
            let value = if self.eat_symbol("=") {
                let tok = self.current();
                match tok.kind {
                    TokenKind::StringLit | TokenKind::Identifier | TokenKind::Number => {
                        self.pos += 1;
                        tok.text.clone()
                    }
                    _ => {
                        return Err(self.syntax_error(&format!(
                            "expected annotation value but found {}",
                            quote(&tok.text)
                        )))
                    }
                }
            } else {
                String::new()
            };
            annotations.push(Annotation { name, value });
            self.eat_symbol(",");
        }
        Ok(annotations)
    }

    fn parse_const(&mut self, comment: Vec<String>) -> Result<Statement, FrugalError> {
        self.pos += 1;
        let typ = self.parse_field_type()?;
        let name = self.expect_identifier("constant name")?;
        self.expect_symbol("=")?;
        let value = self.parse_const_value()?;
        Ok(Statement::Constant(Constant {
            name,
            typ,
            value,
            comment,
        }))
    }

    fn parse_typedef(&mut self, comment: Vec<String>) -> Result<Statement, FrugalError> {
        self.pos += 1;
        let typ = self.parse_field_type()?;
        let name = self.expect_identifier("typedef name")?;
        Ok(Statement::Typedef(TypeDef { name, typ, comment }))
    }

    fn parse_enum(&mut self, comment: Vec<String>) -> Result<Statement, FrugalError> {
        self.pos += 1;
        let name = self.expect_identifier("enum name")?;
        self.expect_symbol("{")?;
        let mut values = Vec::new();
        loop {
            self.skip_separators();
            let doc = self.parse_doc();
            if self.eat_symbol("}") {
                break;
            }
            let value_name = self.expect_identifier("enum value name")?;
            let value = if self.eat_symbol("=") {
                Some(self.expect_int("integer")?)
            } else {
                None
            };
            values.push(RawEnumValue {
                name:    value_name,
                value,
                comment: doc,
            });
        }
        Ok(Statement::Enum(RawEnum {
            name,
            values,
            comment,
        }))
    }

    fn parse_struct(
        &mut self,
        typ: StructType,
        comment: Vec<String>,
    ) -> Result<Statement, FrugalError> {
        self.pos += 1;
        let name = self.expect_identifier(&format!("{} name", typ.keyword()))?;
        self.expect_symbol("{")?;
        let fields = self.parse_fields("}")?;
        let parsed = Struct {
            name,
            typ,
            fields,
            comment,
        };
        Ok(match typ {
            StructType::Struct => Statement::Struct(parsed),
            StructType::Union => Statement::Union(parsed),
            StructType::Exception => Statement::Exception(parsed),
        })
    }

    /// Parses fields up to (and including) the closing terminator symbol.
    fn parse_fields(&mut self, terminator: &str) -> Result<Vec<Field>, FrugalError> {
        let mut fields = Vec::new();
        loop {
            self.skip_separators();
            let doc = self.parse_doc();
            if self.eat_symbol(terminator) {
                break;
            }
            fields.push(self.parse_field(doc)?);
        }
        Ok(fields)
    }

    fn parse_field(&mut self, comment: Vec<String>) -> Result<Field, FrugalError> {
        let id = self.expect_int("field id")?;
        self.expect_symbol(":")?;
        let modifier = if self.eat_keyword("required") {
            FieldModifier::Required
        } else if self.eat_keyword("optional") {
            FieldModifier::Optional
        } else {
            FieldModifier::Default
        };
        let typ = self.parse_field_type()?;
        let name = self.expect_identifier("field name")?;
        let default = if self.eat_symbol("=") {
            Some(self.parse_const_value()?)
        } else {
            None
        };
        Ok(Field {
            id,
            name,
            modifier,
            typ,
            default,
            comment,
        })
    }

    fn parse_field_type(&mut self) -> Result<Type, FrugalError> {
        let tok = self.current();
        if tok.kind != TokenKind::Identifier {
            return Err(self.syntax_error(&format!(
                "expected type but found {}",
                quote(&tok.text)
            )));
        }
        match tok.text.as_str() {
            "map" => {
                self.pos += 1;
                self.expect_symbol("<")?;
                let key = self.parse_field_type()?;
                self.expect_symbol(",")?;
                let value = self.parse_field_type()?;
                self.expect_symbol(">")?;
                Ok(Type::container("map", Some(key), value))
            }
            "list" | "set" => {
                let name = tok.text.clone();
                self.pos += 1;
                self.expect_symbol("<")?;
                let value = self.parse_field_type()?;
                self.expect_symbol(">")?;
                Ok(Type::container(&name, None, value))
            }
            _ => {
                self.pos += 1;
                Ok(Type::new(&tok.text))
            }
        }
    }

    fn parse_const_value(&mut self) -> Result<ConstValue, FrugalError> {
        let tok = self.current();
        match tok.kind {
            TokenKind::Number => {
                self.pos += 1;
                if tok.text.contains(['.', 'e', 'E']) {
                    tok.text.parse::<f64>().map(ConstValue::Double).map_err(|_| {
                        self.syntax_error(&format!("invalid double {}", quote(&tok.text)))
                    })
                } else {
                    tok.text.parse::<i64>().map(ConstValue::Int).map_err(|_| {
                        self.syntax_error(&format!("invalid integer {}", quote(&tok.text)))
                    })
                }
            }
            TokenKind::StringLit => {
                self.pos += 1;
                Ok(ConstValue::String(tok.text.clone()))
            }
            TokenKind::Identifier => {
                self.pos += 1;
                Ok(ConstValue::Identifier(tok.text.clone()))
            }
            TokenKind::Symbol if tok.text == "[" => {
                self.pos += 1;
                let mut values = Vec::new();
                loop {
                    if self.eat_symbol("]") {
                        break;
                    }
                    if self.at_eof() {
                        return Err(self.syntax_error("expected \"]\" to close list constant"));
                    }
                    values.push(self.parse_const_value()?);
                    self.eat_symbol(",");
                }
                Ok(ConstValue::List(values))
            }
            TokenKind::Symbol if tok.text == "{" => {
                self.pos += 1;
                let mut entries = Vec::new();
                loop {
                    if self.eat_symbol("}") {
                        break;
                    }
                    if self.at_eof() {
                        return Err(self.syntax_error("expected \"}\" to close map constant"));
                    }
                    let key = self.parse_const_value()?;
                    self.expect_symbol(":")?;
                    let value = self.parse_const_value()?;
                    entries.push((key, value));
                    self.eat_symbol(",");
                }
                Ok(ConstValue::Map(entries))
            }
            _ => Err(self.syntax_error(&format!(
                "expected constant value but found {}",
                quote(&tok.text)
            ))),
        }
    }

    fn parse_service(&mut self, comment: Vec<String>) -> Result<Statement, FrugalError> {
        self.pos += 1;
        let name = self.expect_identifier("service name")?;
        let extends = if self.eat_keyword("extends") {
            Some(self.expect_identifier("service to extend")?)
        } else {
            None
        };
        self.expect_symbol("{")?;
        let mut methods = Vec::new();
        loop {
            self.skip_separators();
            let doc = self.parse_doc();
            if self.eat_symbol("}") {
                break;
            }
            // ordered choice: a member that is not a method means the body
            // ended without its closing brace
            let start = self.pos;
            match self.parse_method(doc) {
                Ok(m) => methods.push(m),
                Err(_) => {
                    self.pos = start;
                    return Err(self.syntax_error("expected end of service"));
                }
            }
        }
        Ok(Statement::Service(Service {
            name,
            extends,
            methods,
            comment,
        }))
    }

    fn parse_method(&mut self, comment: Vec<String>) -> Result<Method, FrugalError> {
        let oneway = self.eat_keyword("oneway");
        let return_type = if self.eat_keyword("void") {
            None
        } else {
            Some(self.parse_field_type()?)
        };
        let name = self.expect_identifier("method name")?;
        self.expect_symbol("(")?;
        let arguments = self.parse_fields(")")?;
        let exceptions = if self.eat_keyword("throws") {
            self.expect_symbol("(")?;
            self.parse_fields(")")?
        } else {
            Vec::new()
        };
        Ok(Method {
            name,
            oneway,
            return_type,
            arguments,
            exceptions,
            comment,
        })
    }

    fn parse_scope(&mut self, comment: Vec<String>) -> Result<Statement, FrugalError> {
        self.pos += 1;
        let name = self.expect_identifier("scope name")?;
        self.expect_symbol("{")?;
        let prefix = if self.eat_keyword("prefix") {
            let tok = self.current();
            if tok.kind != TokenKind::StringLit {
                return Err(self.syntax_error(&format!(
                    "expected prefix literal but found {}",
                    quote(&tok.text)
                )));
            }
            self.pos += 1;
            Some(tok.text.clone())
        } else {
            None
        };
        let mut operations = Vec::new();
        loop {
            self.skip_separators();
            let doc = self.parse_doc();
            if self.eat_symbol("}") {
                break;
            }
            let start = self.pos;
            match self.parse_operation(doc) {
                Ok(op) => operations.push(op),
                Err(_) => {
                    self.pos = start;
                    return Err(self.syntax_error("expected end of scope"));
                }
            }
        }
        Ok(Statement::Scope(RawScope {
            name,
            prefix,
            operations,
            comment,
        }))
    }

    fn parse_operation(&mut self, comment: Vec<String>) -> Result<Operation, FrugalError> {
        let name = self.expect_identifier("operation name")?;
        self.expect_symbol(":")?;
        let typ = self.parse_field_type()?;
        Ok(Operation { name, typ, comment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse_text(input: &str) -> Result<Vec<Statement>, FrugalError> {
        let tokens = tokenize(input, "test").unwrap();
        parse(&tokens, "test")
    }

    #[test]
    fn test_parse_struct_with_modifiers_and_defaults() {
        let got = parse_text(
            r#"
            struct Event {
                1: i64 id,
                2: optional string message = "hello";
                3: required map<string, list<i32>> tags
            }
            "#,
        )
        .unwrap();
        assert_eq!(got.len(), 1);
        let Statement::Struct(s) = &got[0] else {
            panic!("expected a struct");
        };
        assert_eq!(s.name, "Event");
        assert_eq!(s.fields.len(), 3);
        assert_eq!(s.fields[0].modifier, FieldModifier::Default);
        assert_eq!(s.fields[1].modifier, FieldModifier::Optional);
        assert_eq!(
            s.fields[1].default,
            Some(ConstValue::String("hello".to_string()))
        );
        assert_eq!(s.fields[2].modifier, FieldModifier::Required);
        assert_eq!(s.fields[2].typ.to_string(), "map<string, list<i32>>");
    }

    #[test]
    fn test_parse_doc_comments_attach_to_declarations() {
        let got = parse_text(
            "/**\n * Space stuff.\n */\nstruct Planet {\n  /** km */\n  1: i32 radius\n}",
        )
        .unwrap();
        let Statement::Struct(s) = &got[0] else {
            panic!("expected a struct");
        };
        assert_eq!(s.comment, vec!["Space stuff."]);
        assert_eq!(s.fields[0].comment, vec!["km"]);
    }

    #[test]
    fn test_parse_enum_with_and_without_values() {
        let got = parse_text("enum Kind { FLAT, ROUND = 5; POINTED }").unwrap();
        let Statement::Enum(e) = &got[0] else {
            panic!("expected an enum");
        };
        assert_eq!(e.values[0].value, None);
        assert_eq!(e.values[1].value, Some(5));
        assert_eq!(e.values[2].value, None);
    }

    #[test]
    fn test_parse_service_full() {
        let got = parse_text(
            r#"
            service Music extends base.Songs {
                Track getTrack(1: string id) throws (1: NotFound err),
                oneway void ping(),
            }
            "#,
        )
        .unwrap();
        let Statement::Service(s) = &got[0] else {
            panic!("expected a service");
        };
        assert_eq!(s.extends.as_deref(), Some("base.Songs"));
        assert_eq!(s.methods.len(), 2);
        let get = &s.methods[0];
        assert_eq!(get.return_type.as_ref().unwrap().name, "Track");
        assert_eq!(get.arguments.len(), 1);
        assert_eq!(get.exceptions.len(), 1);
        let ping = &s.methods[1];
        assert!(ping.oneway);
        assert!(ping.return_type.is_none());
    }

    #[test]
    fn test_parse_scope_with_prefix() {
        let got = parse_text(
            r#"
            scope Events {
                prefix "foo.{user}.bar"
                EventCreated: Event
                EventDeleted: base.Tombstone
            }
            "#,
        )
        .unwrap();
        let Statement::Scope(s) = &got[0] else {
            panic!("expected a scope");
        };
        assert_eq!(s.prefix.as_deref(), Some("foo.{user}.bar"));
        assert_eq!(s.operations.len(), 2);
        assert_eq!(s.operations[1].typ.name, "base.Tombstone");
    }

    #[test]
    fn test_parse_const_values() {
        let got = parse_text(
            r#"
            const list<i32> PRIMES = [2, 3, 5]
            const map<string, double> WEIGHTS = {"a": 1.5, "b": 2e3}
            const string GREETING = 'hi'
            const i32 FALLBACK = Defaults.LIMIT
            "#,
        )
        .unwrap();
        let Statement::Constant(primes) = &got[0] else {
            panic!("expected a constant");
        };
        assert_eq!(
            primes.value,
            ConstValue::List(vec![
                ConstValue::Int(2),
                ConstValue::Int(3),
                ConstValue::Int(5)
            ])
        );
        let Statement::Constant(weights) = &got[1] else {
            panic!("expected a constant");
        };
        let ConstValue::Map(entries) = &weights.value else {
            panic!("expected a map constant");
        };
        assert_eq!(entries[1].1, ConstValue::Double(2e3));
        let Statement::Constant(fallback) = &got[3] else {
            panic!("expected a constant");
        };
        assert_eq!(
            fallback.value,
            ConstValue::Identifier("Defaults.LIMIT".to_string())
        );
    }

    #[test]
    fn test_parse_include_and_namespace() {
        let got = parse_text(
            r#"
            include "shared/base.frugal"
            namespace go events
            namespace * shared
            namespace java com.example.events (vendor)
            "#,
        )
        .unwrap();
        let Statement::Include(inc) = &got[0] else {
            panic!("expected an include");
        };
        assert_eq!(inc.value, "shared/base.frugal");
        let Statement::Namespace(star) = &got[2] else {
            panic!("expected a namespace");
        };
        assert_eq!(star.scope, "*");
        let Statement::Namespace(java) = &got[3] else {
            panic!("expected a namespace");
        };
        assert_eq!(java.value, "com.example.events");
        assert_eq!(java.annotations[0].name, "vendor");
    }

    #[test]
    fn test_parse_missing_service_brace_is_named_error() {
        let err = parse_text("service Broken {\n  void ping()\n").unwrap_err();
        assert!(err.to_string().contains("expected end of service"), "{err}");
    }

    #[test]
    fn test_parse_missing_scope_brace_is_named_error() {
        let err = parse_text("scope Broken {\n  Created: Event\n").unwrap_err();
        assert!(err.to_string().contains("expected end of scope"), "{err}");
    }

    #[test]
    fn test_parse_trailing_garbage_is_an_error() {
        let err = parse_text("struct Fine {}\n]").unwrap_err();
        assert!(err.to_string().contains("unexpected token"), "{err}");
    }
}
