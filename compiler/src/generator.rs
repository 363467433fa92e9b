use crate::error::FrugalError;
use frugal_ast::{Constant, Enum, Frugal, Scope, Service, Struct, TypeDef};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Per-invocation generator options (`"async"`, `"package_prefix=..."`,
/// ...). Keys a generator does not recognize are ignored, never errors.
pub type Options = HashMap<String, String>;

/// Compilation settings, constructed once at the entry point and threaded
/// through explicitly. There is no process-global configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Separator between rendered topic segments of a scope prefix.
    pub topic_delimiter:   String,
    /// Target backend plus comma-separated options (`"dart:use_vendor"`).
    pub gen:               String,
    /// Output directory; a generator's default applies when unset.
    pub out:               Option<PathBuf>,
    /// Retain the intermediate Thrift artifact after generation.
    pub keep_intermediate: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            topic_delimiter:   ".".to_string(),
            gen:               String::new(),
            out:               None,
            keep_intermediate: false,
        }
    }
}

impl Config {
    /// Splits `gen` into the backend name and its option map.
    pub fn gen_options(&self) -> (String, Options) {
        let (name, rest) = match self.gen.split_once(':') {
            Some((name, rest)) => (name, rest),
            None => (self.gen.as_str(), ""),
        };
        let mut options = Options::new();
        for part in rest.split(',').filter(|p| !p.is_empty()) {
            match part.split_once('=') {
                Some((k, v)) => options.insert(k.to_string(), v.to_string()),
                None => options.insert(part.to_string(), String::new()),
            };
        }
        (name.to_string(), options)
    }
}

/// The contract every language backend implements against the resolved
/// AST. Backends live outside this crate; the compiler only drives the
/// hooks in a fixed, deterministic order (see [`generate`]).
pub trait Generator {
    fn setup_generator(&mut self, out_dir: &Path) -> Result<(), FrugalError>;
    fn teardown_generator(&mut self) -> Result<(), FrugalError>;

    fn generate_constants(&mut self, frugal: &Frugal, constants: &[Constant])
        -> Result<(), FrugalError>;
    fn generate_typedef(&mut self, typedef: &TypeDef) -> Result<(), FrugalError>;
    fn generate_enum(&mut self, e: &Enum) -> Result<(), FrugalError>;
    fn generate_struct(&mut self, s: &Struct) -> Result<(), FrugalError>;
    fn generate_union(&mut self, s: &Struct) -> Result<(), FrugalError>;
    fn generate_exception(&mut self, s: &Struct) -> Result<(), FrugalError>;
    fn generate_service(&mut self, service: &Service) -> Result<(), FrugalError>;
    fn generate_scope_publisher(&mut self, scope: &Scope) -> Result<(), FrugalError>;
    fn generate_scope_subscriber(&mut self, scope: &Scope) -> Result<(), FrugalError>;

    fn post_process(&mut self, file: &Path) -> Result<(), FrugalError>;
    fn get_output_dir(&self, base: &Path, frugal: &Frugal) -> PathBuf;
    fn default_output_dir(&self) -> PathBuf;
}

/// Drives a generator over the name-sorted view of the AST. Declaration
/// categories are emitted in a fixed order so output is byte-stable across
/// runs.
pub fn generate(
    frugal: &Frugal,
    generator: &mut dyn Generator,
    config: &Config,
) -> Result<(), FrugalError> {
    let ordered = frugal.ordered();
    let base = config
        .out
        .clone()
        .unwrap_or_else(|| generator.default_output_dir());
    let out_dir = generator.get_output_dir(&base, &ordered);

    generator.setup_generator(&out_dir)?;
    generator.generate_constants(&ordered, &ordered.constants)?;
    for typedef in &ordered.typedefs {
        generator.generate_typedef(typedef)?;
    }
    for e in &ordered.enums {
        generator.generate_enum(e)?;
    }
    for s in &ordered.structs {
        generator.generate_struct(s)?;
    }
    for s in &ordered.unions {
        generator.generate_union(s)?;
    }
    for s in &ordered.exceptions {
        generator.generate_exception(s)?;
    }
    for service in &ordered.services {
        generator.generate_service(service)?;
    }
    for scope in &ordered.scopes {
        generator.generate_scope_publisher(scope)?;
        generator.generate_scope_subscriber(scope)?;
    }
    generator.teardown_generator()
}
