use crate::types::{Constant, Enum, Frugal, Namespace, Scope, Service, Struct, Type, TypeDef};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("reference to unknown include \"{0}\"")]
    UnknownInclude(String),

    #[error("typedef cycle detected: [{0}]")]
    TypedefCycle(String),
}

impl Frugal {
    /// The namespace for a target-language tag, falling back to the `"*"`
    /// wildcard namespace when no language-specific one is declared.
    pub fn namespace_for(&self, lang: &str) -> Option<&Namespace> {
        self.namespaces
            .iter()
            .find(|n| n.scope == lang)
            .or_else(|| self.namespaces.iter().find(|n| n.wildcard()))
    }

    pub fn typedef(&self, name: &str) -> Option<&TypeDef> {
        self.typedefs.iter().find(|t| t.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&Enum> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn struct_def(&self, name: &str) -> Option<&Struct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn exception_def(&self, name: &str) -> Option<&Struct> {
        self.exceptions.iter().find(|s| s.name == name)
    }

    pub fn union_def(&self, name: &str) -> Option<&Struct> {
        self.unions.iter().find(|s| s.name == name)
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn scope_def(&self, name: &str) -> Option<&Scope> {
        self.scopes.iter().find(|s| s.name == name)
    }

    /// The parsed sub-AST of an include, by base name.
    pub fn include(&self, name: &str) -> Option<&Frugal> {
        self.parsed_includes.get(name)
    }

    /// Any struct-shaped declaration (struct, exception, or union) with the
    /// given unqualified name in this file.
    pub fn struct_like(&self, name: &str) -> Option<&Struct> {
        self.struct_def(name)
            .or_else(|| self.exception_def(name))
            .or_else(|| self.union_def(name))
    }

    /// Whether a possibly include-qualified name refers to a struct-shaped
    /// declaration anywhere in the schema graph rooted here.
    pub fn contains_struct_like(&self, name: &str) -> bool {
        match name.split_once('.') {
            Some((inc, rest)) => self
                .include(inc)
                .map(|f| f.contains_struct_like(rest))
                .unwrap_or(false),
            None => self.struct_like(name).is_some(),
        }
    }

    /// Follows typedef chains (across includes) until a non-typedef type is
    /// reached. Primitives, containers, and names that resolve to structs,
    /// enums, or nothing at all are returned as-is; only the typedef
    /// indirection is peeled off. A typedef that eventually refers back to
    /// itself is an error.
    pub fn underlying_type<'a>(&'a self, typ: &'a Type) -> Result<&'a Type, ResolveError> {
        let mut seen: Vec<String> = Vec::new();
        let mut owner = self;
        let mut current = typ;

        loop {
            if current.is_primitive() || current.is_container() {
                return Ok(current);
            }
            let (next_owner, bare) = match current.include_name() {
                Some(inc) => {
                    let f = owner
                        .include(inc)
                        .ok_or_else(|| ResolveError::UnknownInclude(inc.to_string()))?;
                    (f, current.param_name())
                }
                None => (owner, current.name.as_str()),
            };
            match next_owner.typedef(bare) {
                Some(td) => {
                    let key = format!("{}.{}", next_owner.name, bare);
                    if seen.contains(&key) {
                        seen.push(key);
                        return Err(ResolveError::TypedefCycle(seen.join(" ")));
                    }
                    seen.push(key);
                    owner = next_owner;
                    current = &td.typ;
                }
                None => return Ok(current),
            }
        }
    }
}
