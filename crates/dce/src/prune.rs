use crate::{CompiledFunc, DceError, ReachableSet, SymbolTable};
use wasmprune_module::{CodeEntry, FuncIndex, Function, Module};

/// What [`prune`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneSummary {
    /// Number of functions in the module, imported and defined.
    pub functions: usize,
    /// Number of reachable functions.
    pub reachable: usize,
    /// Functions whose bodies were replaced with a trap.
    pub stubbed: Vec<FuncIndex>,
    /// Number of entries removed from the function name table.
    pub names_removed: usize,
    /// Number of compiled functions dropped.
    pub compiled_removed: usize,
}

/// Rewrite `module` so that only the `reachable` functions keep their code.
///
/// Function names of unreachable functions are dropped, as are unreachable
/// entries of `compiled`. The body of every unreachable defined function is
/// replaced with a lone `unreachable`; no code entry is ever removed, so all
/// function indices stay valid.
///
/// All names are resolved before anything is modified: on error, neither
/// `module` nor `compiled` has changed.
pub fn prune(
    module: &mut Module,
    compiled: &mut Vec<CompiledFunc>,
    symbols: &SymbolTable,
    reachable: &ReachableSet,
) -> Result<PruneSummary, DceError> {
    let compiled_indices = compiled
        .iter()
        .map(|func| symbols.resolve(&func.name))
        .collect::<Result<Vec<_>, _>>()?;
    let stub = CodeEntry::from_function(&Function::trap_stub());

    let names_removed = module
        .names_mut()
        .retain_functions(|name| reachable.contains(name.index));

    let before = compiled.len();
    let mut keep = compiled_indices.into_iter().map(|i| reachable.contains(i));
    compiled.retain(|_| keep.next().unwrap_or(true));
    let compiled_removed = before - compiled.len();

    let dead: Vec<_> = module
        .code_entries()
        .map(|(defined, _)| defined)
        .filter(|defined| !reachable.contains(module.func_index(*defined)))
        .collect();
    let mut stubbed = Vec::with_capacity(dead.len());
    for defined in dead {
        log::trace!("stubbing {}", module.func_index(defined));
        module.replace_body(defined, stub.clone());
        stubbed.push(module.func_index(defined));
    }

    Ok(PruneSummary {
        functions: module.num_funcs(),
        reachable: reachable.len(),
        stubbed,
        names_removed,
        compiled_removed,
    })
}
