use crate::module::{CodeEntry, ElementSegment, Export, ExportKind, Import, ImportKind, Section};
use crate::names::Names;
use crate::{FuncIndex, Module};
use anyhow::{Context, bail};
use wasmparser::{Encoding, Parser};

impl Module {
    /// Parse the given Wasm bytes into a `Module`.
    ///
    /// Components are rejected. A `name` section that fails to decode is
    /// kept verbatim and the module is treated as having no names.
    pub fn parse(full_wasm: &[u8]) -> anyhow::Result<Module> {
        log::debug!("Parsing the input Wasm");

        let mut module = Module::default();

        for payload in Parser::new(0).parse_all(full_wasm) {
            use wasmparser::Payload::*;

            let payload = payload.context("failed to parse Wasm")?;
            let raw = payload.as_section();

            match payload {
                Version {
                    encoding: Encoding::Component,
                    ..
                } => {
                    bail!("expected a core module, found a component");
                }
                ImportSection(imports) => import_section(&mut module, imports)?,
                ExportSection(exports) => export_section(&mut module, exports)?,
                ElementSection(elements) => element_section(&mut module, elements)?,
                StartSection { func, .. } => module.start = Some(FuncIndex::from_wasm(func)?),
                CodeSectionStart { count, .. } => {
                    module.code.reserve_exact(count as usize);
                    module.sections.push(Section::Code);
                    continue;
                }
                CodeSectionEntry(body) => {
                    let bytes = &full_wasm[body.range()];
                    module.code.push(CodeEntry::new(bytes.to_vec()));
                    continue;
                }
                CustomSection(reader) if reader.name() == "name" => {
                    match Names::parse(reader.data(), reader.data_offset()) {
                        Ok(names) => {
                            module.names = names;
                            module.sections.push(Section::Names);
                            continue;
                        }
                        Err(e) => {
                            log::warn!("ignoring malformed `name` section: {e:#}");
                        }
                    }
                }
                End { .. } => break,
                _ => {}
            }

            if let Some((id, range)) = raw {
                module.sections.push(Section::Raw {
                    id,
                    data: full_wasm[range].to_vec(),
                });
            }
        }

        log::debug!(
            "Parsed {} imported and {} defined functions",
            module.num_imported_funcs,
            module.code.len()
        );
        Ok(module)
    }
}

fn import_section(
    module: &mut Module,
    imports: wasmparser::ImportSectionReader<'_>,
) -> anyhow::Result<()> {
    for imp in imports.into_imports() {
        let imp = imp?;
        let kind = match imp.ty {
            wasmparser::TypeRef::Func(ty) | wasmparser::TypeRef::FuncExact(ty) => {
                module.num_imported_funcs += 1;
                ImportKind::Function(ty)
            }
            _ => ImportKind::Other,
        };
        module.imports.push(Import {
            module: imp.module.to_string(),
            name: imp.name.to_string(),
            kind,
        });
    }
    Ok(())
}

fn export_section(
    module: &mut Module,
    exports: wasmparser::ExportSectionReader<'_>,
) -> anyhow::Result<()> {
    for export in exports {
        let export = export?;
        let kind = match export.kind {
            wasmparser::ExternalKind::Func | wasmparser::ExternalKind::FuncExact => {
                FuncIndex::from_wasm(export.index)
                    .with_context(|| format!("invalid export `{}`", export.name))?;
                ExportKind::Function
            }
            wasmparser::ExternalKind::Tag
            | wasmparser::ExternalKind::Table
            | wasmparser::ExternalKind::Memory
            | wasmparser::ExternalKind::Global => ExportKind::Other,
        };
        module.exports.push(Export {
            name: export.name.to_string(),
            kind,
            index: export.index,
        });
    }
    Ok(())
}

fn element_section(
    module: &mut Module,
    elements: wasmparser::ElementSectionReader<'_>,
) -> anyhow::Result<()> {
    for element in elements {
        let element = element?;
        let mut segment = ElementSegment::default();
        match element.items {
            wasmparser::ElementItems::Functions(funcs) => {
                for func in funcs {
                    segment.functions.push(FuncIndex::from_wasm(func?)?);
                }
            }
            wasmparser::ElementItems::Expressions(_ty, exprs) => {
                for expr in exprs {
                    let mut ops = expr?.get_operators_reader();
                    while !ops.eof() {
                        if let wasmparser::Operator::RefFunc { function_index } = ops.read()? {
                            segment.functions.push(FuncIndex::from_wasm(function_index)?);
                        }
                    }
                }
            }
        }
        module.elements.push(segment);
    }
    Ok(())
}
