use crate::DceError;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use wasmprune_module::{FuncIndex, Module};

/// Maps function names to their index in the module.
///
/// Names come from the module's `name` section and from the field names of
/// function imports. The front end adds the names of the functions it
/// compiled with [`SymbolTable::insert`].
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    funcs: HashMap<String, FuncIndex>,
}

impl SymbolTable {
    /// Create an empty table.
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Build the table of a decoded module.
    ///
    /// Debug names take precedence over import field names, and the first
    /// function to claim a name keeps it.
    pub fn from_module(module: &Module) -> SymbolTable {
        let mut table = SymbolTable::new();
        for f in module.names().functions() {
            table.insert_if_absent(&f.name, f.index);
        }
        for (index, import) in module.imported_funcs() {
            table.insert_if_absent(&import.name, index);
        }
        log::debug!("symbol table has {} names", table.len());
        table
    }

    fn insert_if_absent(&mut self, name: &str, index: FuncIndex) {
        match self.funcs.entry(name.to_string()) {
            Entry::Occupied(e) => {
                if *e.get() != index {
                    log::trace!("`{name}` already names {}, ignoring {index}", e.get());
                }
            }
            Entry::Vacant(e) => {
                e.insert(index);
            }
        }
    }

    /// Name function `index`, replacing any previous mapping of `name`.
    pub fn insert(&mut self, name: impl Into<String>, index: FuncIndex) -> Option<FuncIndex> {
        self.funcs.insert(name.into(), index)
    }

    /// Look up `name`.
    pub fn get(&self, name: &str) -> Option<FuncIndex> {
        self.funcs.get(name).copied()
    }

    /// Look up `name`, failing if it is unknown.
    pub fn resolve(&self, name: &str) -> Result<FuncIndex, DceError> {
        self.get(name)
            .ok_or_else(|| DceError::UnresolvedFunction(name.to_string()))
    }

    /// Number of names.
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_from_module() -> anyhow::Result<()> {
        let wasm = wat::parse_str(
            r#"
(module
  (import "env" "opa_abort" (func $abort (param i32)))
  (import "env" "mem" (memory 1))
  (import "env" "opa_println" (func))
  (func $eval)
  (func $opa_abort))
"#,
        )?;
        let module = Module::parse(&wasm)?;
        let table = SymbolTable::from_module(&module);

        assert_eq!(table.get("abort"), Some(FuncIndex::from_u32(0)));
        assert_eq!(table.get("opa_println"), Some(FuncIndex::from_u32(1)));
        assert_eq!(table.get("eval"), Some(FuncIndex::from_u32(2)));
        // the debug name of function 3 wins over the import field name
        assert_eq!(table.get("opa_abort"), Some(FuncIndex::from_u32(3)));
        assert_eq!(table.get("mem"), None);
        Ok(())
    }

    #[test]
    fn unknown_names_fail_to_resolve() {
        let mut table = SymbolTable::new();
        table.insert("f", FuncIndex::from_u32(7));
        assert_eq!(table.resolve("f").unwrap(), FuncIndex::from_u32(7));
        assert!(matches!(
            table.resolve("g"),
            Err(DceError::UnresolvedFunction(name)) if name == "g"
        ));
    }
}
