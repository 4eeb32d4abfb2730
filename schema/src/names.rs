use serde::Serialize;

use std::collections::BTreeMap;

/// Target identifier chosen for one schema declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedName {
    /// Identifier used in generated source.
    pub ident: String,
    /// Schema name kept for serialization when it differs from `ident`.
    pub alias: Option<String>,
}

impl ResolvedName {
    pub fn plain(ident: impl Into<String>) -> Self {
        ResolvedName { ident: ident.into(), alias: None }
    }
}

/// Returned when a path is resolved twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyResolved(pub String);

/// Fully-qualified schema path to resolved identifier.
///
/// Paths look like `pkg.Outer.Inner` for types, `pkg.Msg.field_name` for
/// fields and `pkg.Enum.VALUE_NAME` for enum values. Each path can be
/// written once; the table is read-only once resolution finishes.
#[derive(Debug, Default, Serialize)]
pub struct NameTable {
    names: BTreeMap<String, ResolvedName>,
}

impl NameTable {
    pub fn new() -> Self {
        NameTable::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, name: ResolvedName) -> Result<(), AlreadyResolved> {
        let path = path.into();
        if self.names.contains_key(&path) {
            return Err(AlreadyResolved(path));
        }
        self.names.insert(path, name);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&ResolvedName> {
        self.names.get(path)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
