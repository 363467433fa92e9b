use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Thrift base types. Everything else is a container or a named reference.
pub const PRIMITIVES: [&str; 9] = [
    "bool", "byte", "i8", "i16", "i32", "i64", "double", "string", "binary",
];

/// A type reference as written in the schema: a primitive keyword, a
/// container (`list`/`set`/`map`), or a named reference which may be
/// qualified with an include name (`base.NotFound`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Type {
    pub name:       String,
    pub key_type:   Option<Box<Type>>,
    pub value_type: Option<Box<Type>>,
}

impl Type {
    pub fn new(name: &str) -> Type {
        Type {
            name:       name.to_string(),
            key_type:   None,
            value_type: None,
        }
    }

    pub fn container(name: &str, key: Option<Type>, value: Type) -> Type {
        Type {
            name:       name.to_string(),
            key_type:   key.map(Box::new),
            value_type: Some(Box::new(value)),
        }
    }

    pub fn is_primitive(&self) -> bool {
        PRIMITIVES.contains(&self.name.as_str())
    }

    pub fn is_container(&self) -> bool {
        matches!(self.name.as_str(), "list" | "set" | "map")
    }

    /// The include qualifier of a dotted reference (`base` in
    /// `base.NotFound`), if any.
    pub fn include_name(&self) -> Option<&str> {
        if self.is_primitive() || self.is_container() {
            return None;
        }
        self.name.split_once('.').map(|(inc, _)| inc)
    }

    /// The unqualified part of the reference (`NotFound` in `base.NotFound`,
    /// or the whole name when unqualified).
    pub fn param_name(&self) -> &str {
        match self.name.split_once('.') {
            Some((_, rest)) => rest,
            None => &self.name,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.key_type, &self.value_type) {
            (Some(k), Some(v)) => write!(f, "{}<{}, {}>", self.name, k, v),
            (None, Some(v)) => write!(f, "{}<{}>", self.name, v),
            _ => write!(f, "{}", self.name),
        }
    }
}

/// Field presence semantics. `Default` is the modifier of a field declared
/// with neither `required` nor `optional`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldModifier {
    Required,
    Optional,
    Default,
}

/// A constant literal. Identifiers (including dotted `Enum.VALUE` and
/// `include.CONST` references) are kept textual and resolved by generators,
/// never by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstValue {
    Int(i64),
    Double(f64),
    String(String),
    Identifier(String),
    List(Vec<ConstValue>),
    Map(Vec<(ConstValue, ConstValue)>),
}

/// A typed, numbered member of a struct, argument list, or exception list.
/// Field IDs are wire tags and must be unique within their owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub id:       i32,
    pub name:     String,
    pub modifier: FieldModifier,
    pub typ:      Type,
    pub default:  Option<ConstValue>,
    pub comment:  Vec<String>,
}

/// Discriminates the three struct-shaped declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StructType {
    Struct,
    Exception,
    Union,
}

impl StructType {
    pub fn keyword(&self) -> &'static str {
        match self {
            StructType::Struct => "struct",
            StructType::Exception => "exception",
            StructType::Union => "union",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Struct {
    pub name:    String,
    pub typ:     StructType,
    pub fields:  Vec<Field>,
    pub comment: Vec<String>,
}

impl Struct {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_id(&self, id: i32) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValue {
    pub name:    String,
    pub value:   i32,
    pub comment: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enum {
    pub name:    String,
    pub values:  Vec<EnumValue>,
    pub comment: Vec<String>,
}

impl Enum {
    pub fn value_by_number(&self, value: i32) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.value == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constant {
    pub name:    String,
    pub typ:     Type,
    pub value:   ConstValue,
    pub comment: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDef {
    pub name:    String,
    pub typ:     Type,
    pub comment: Vec<String>,
}

/// An RPC method. `return_type` of `None` means void. Exceptions are always
/// optional fields of the method's result struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Method {
    pub name:        String,
    pub oneway:      bool,
    pub return_type: Option<Type>,
    pub arguments:   Vec<Field>,
    pub exceptions:  Vec<Field>,
    pub comment:     Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub name:    String,
    pub extends: Option<String>,
    pub methods: Vec<Method>,
    pub comment: Vec<String>,
}

impl Service {
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// A pub/sub topic template. `variables` holds the `{placeholder}` names in
/// order of appearance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopePrefix {
    pub string:    String,
    pub variables: Vec<String>,
}

impl ScopePrefix {
    /// Renders the prefix with the configured topic-segment separator.
    /// Placeholders are left intact; generators substitute them positionally
    /// at publish/subscribe time.
    pub fn template(&self, separator: &str) -> String {
        self.string
            .split(|c| c == '.' || c == '/')
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Collapses every `{placeholder}` to an anonymous wildcard so two
    /// prefixes compare equal whenever only the variable names differ.
    pub fn normalized(&self) -> String {
        let mut out = String::with_capacity(self.string.len());
        let mut rest = self.string.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            match rest[start..].find('}') {
                Some(end) => {
                    out.push_str("{}");
                    rest = &rest[start + end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// One pub/sub event within a scope: a name paired with its payload type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub name:    String,
    pub typ:     Type,
    pub comment: Vec<String>,
}

/// A pub/sub channel declaration grouping operations under a topic prefix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scope {
    pub name:       String,
    pub prefix:     ScopePrefix,
    pub operations: Vec<Operation>,
    pub comment:    Vec<String>,
}

impl Scope {
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|o| o.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub name:  String,
    pub value: String,
}

/// Maps a target-language tag (or the `"*"` wildcard) to a package name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Namespace {
    pub scope:       String,
    pub value:       String,
    pub annotations: Vec<Annotation>,
}

impl Namespace {
    pub fn wildcard(&self) -> bool {
        self.scope == "*"
    }

    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }
}

/// An `include` statement. `name` is the lookup key (base filename with the
/// `.frugal`/`.thrift` extension and any directory stripped), `value` is the
/// path exactly as written in the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Include {
    pub name:        String,
    pub value:       String,
    pub annotations: Vec<Annotation>,
}

impl Include {
    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }
}

/// The root of a parsed schema file. Declarations are kept in source order;
/// [`Frugal::ordered`](crate::order) produces the name-sorted view consumed
/// by generators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frugal {
    pub name:            String,
    pub path:            PathBuf,
    pub includes:        Vec<Include>,
    pub namespaces:      Vec<Namespace>,
    pub typedefs:        Vec<TypeDef>,
    pub constants:       Vec<Constant>,
    pub enums:           Vec<Enum>,
    pub structs:         Vec<Struct>,
    pub exceptions:      Vec<Struct>,
    pub unions:          Vec<Struct>,
    pub services:        Vec<Service>,
    pub scopes:          Vec<Scope>,
    pub parsed_includes: BTreeMap<String, Frugal>,
}

impl Frugal {
    pub fn new(name: &str, path: PathBuf) -> Frugal {
        Frugal {
            name:            name.to_string(),
            path,
            includes:        Vec::new(),
            namespaces:      Vec::new(),
            typedefs:        Vec::new(),
            constants:       Vec::new(),
            enums:           Vec::new(),
            structs:         Vec::new(),
            exceptions:      Vec::new(),
            unions:          Vec::new(),
            services:        Vec::new(),
            scopes:          Vec::new(),
            parsed_includes: BTreeMap::new(),
        }
    }
}
