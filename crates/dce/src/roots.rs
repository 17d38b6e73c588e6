use crate::{CompiledFunc, DceError, SymbolTable};
use wasmprune_module::{FuncIndex, Module};

/// Collect the functions that must be kept regardless of the call graph:
///
/// * every imported function,
/// * every exported function,
/// * every freshly compiled function,
/// * every function placed in a table by an element segment, since it may be
///   called indirectly,
/// * the start function,
/// * every function named in `extra`.
///
/// The result may contain duplicates.
pub fn collect_roots(
    module: &Module,
    compiled: &[CompiledFunc],
    symbols: &SymbolTable,
    extra: &[String],
) -> Result<Vec<FuncIndex>, DceError> {
    let mut roots = Vec::new();

    roots.extend(module.imported_funcs().map(|(index, _)| index));
    roots.extend(module.exports().iter().filter_map(|e| e.func()));
    for func in compiled {
        roots.push(symbols.resolve(&func.name)?);
    }
    for segment in module.elements() {
        roots.extend_from_slice(&segment.functions);
    }
    roots.extend(module.start());
    for name in extra {
        roots.push(symbols.resolve(name)?);
    }

    log::debug!("collected {} roots", roots.len());
    Ok(roots)
}
