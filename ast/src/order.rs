use crate::types::Frugal;

impl Frugal {
    /// A deep copy with every declaration list sorted by name, methods and
    /// operations included. Generators consume only this view so repeated
    /// runs over the same schema produce byte-identical output.
    pub fn ordered(&self) -> Frugal {
        let mut out = self.clone();
        out.includes.sort_by(|a, b| a.name.cmp(&b.name));
        out.namespaces.sort_by(|a, b| a.scope.cmp(&b.scope));
        out.typedefs.sort_by(|a, b| a.name.cmp(&b.name));
        out.constants.sort_by(|a, b| a.name.cmp(&b.name));
        out.enums.sort_by(|a, b| a.name.cmp(&b.name));
        out.structs.sort_by(|a, b| a.name.cmp(&b.name));
        out.exceptions.sort_by(|a, b| a.name.cmp(&b.name));
        out.unions.sort_by(|a, b| a.name.cmp(&b.name));
        out.services.sort_by(|a, b| a.name.cmp(&b.name));
        out.scopes.sort_by(|a, b| a.name.cmp(&b.name));
        for service in &mut out.services {
            service.methods.sort_by(|a, b| a.name.cmp(&b.name));
        }
        for scope in &mut out.scopes {
            scope.operations.sort_by(|a, b| a.name.cmp(&b.name));
        }
        out.parsed_includes = out
            .parsed_includes
            .iter()
            .map(|(k, v)| (k.clone(), v.ordered()))
            .collect();
        out
    }
}
