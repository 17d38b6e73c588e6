//! The `name` custom section.

use crate::FuncIndex;
use anyhow::{Context, Result, bail};
use wasm_encoder::Encode;

const FUNCTION_SUBSECTION: u8 = 1;

/// A debug name attached to a function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionName {
    /// The named function.
    pub index: FuncIndex,
    /// Its name.
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Subsection {
    Functions,
    Raw { id: u8, data: Vec<u8> },
}

/// The debug names of a module.
///
/// Only the function-name subsection is decoded; all other subsections are
/// kept as raw bytes and re-emitted unchanged, in their original order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Names {
    subsections: Vec<Subsection>,
    functions: Vec<FunctionName>,
}

impl Names {
    /// The function names, in the order they appear in the section.
    pub fn functions(&self) -> &[FunctionName] {
        &self.functions
    }

    /// The name given to function `index`, if any.
    pub fn function_name(&self, index: FuncIndex) -> Option<&str> {
        self.functions
            .iter()
            .find(|f| f.index == index)
            .map(|f| f.name.as_str())
    }

    /// Keep only the function names for which `keep` returns `true`.
    /// Returns how many names were removed.
    pub fn retain_functions(&mut self, mut keep: impl FnMut(&FunctionName) -> bool) -> usize {
        let before = self.functions.len();
        self.functions.retain(|f| keep(f));
        before - self.functions.len()
    }

    /// Name function `index`, replacing any existing name.
    pub fn set_function_name(&mut self, index: FuncIndex, name: impl Into<String>) {
        let name = name.into();
        match self.functions.iter_mut().find(|f| f.index == index) {
            Some(existing) => existing.name = name,
            None => {
                if !self.subsections.contains(&Subsection::Functions) {
                    let at = self
                        .subsections
                        .iter()
                        .position(|s| {
                            matches!(s, Subsection::Raw { id, .. } if *id > FUNCTION_SUBSECTION)
                        })
                        .unwrap_or(self.subsections.len());
                    self.subsections.insert(at, Subsection::Functions);
                }
                let at = self.functions.partition_point(|f| f.index < index);
                self.functions.insert(at, FunctionName { index, name });
            }
        }
    }

    /// Decode the payload of a `name` custom section. `offset` is the
    /// payload's position in the module, used for error messages.
    pub(crate) fn parse(data: &[u8], offset: usize) -> Result<Names> {
        let mut reader = wasmparser::BinaryReader::new(data, offset);
        let mut names = Names::default();
        while !reader.eof() {
            let position = reader.original_position();
            let id = reader.read_u8()?;
            let size = reader.read_var_u32()?;
            let payload = reader
                .read_bytes(size as usize)
                .with_context(|| format!("truncated name subsection at offset {position:#x}"))?;
            if id != FUNCTION_SUBSECTION {
                names.subsections.push(Subsection::Raw {
                    id,
                    data: payload.to_vec(),
                });
                continue;
            }
            if names.subsections.contains(&Subsection::Functions) {
                bail!("duplicate function name subsection at offset {position:#x}");
            }
            names.subsections.push(Subsection::Functions);

            let payload_offset = reader.original_position() - payload.len();
            let mut map = wasmparser::BinaryReader::new(payload, payload_offset);
            let count = map.read_var_u32()?;
            for _ in 0..count {
                let index = FuncIndex::from_wasm(map.read_var_u32()?)?;
                let name = map.read_string()?.to_string();
                names.functions.push(FunctionName { index, name });
            }
            if !map.eof() {
                bail!(
                    "trailing bytes in function name subsection at offset {:#x}",
                    map.original_position()
                );
            }
        }
        Ok(names)
    }

    /// Whether encoding would produce an empty section.
    pub fn is_empty(&self) -> bool {
        self.subsections.is_empty()
    }

    /// Encode the payload of the `name` custom section.
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for subsection in &self.subsections {
            match subsection {
                Subsection::Functions => {
                    let mut map = Vec::new();
                    self.functions.len().encode(&mut map);
                    for f in &self.functions {
                        f.index.as_u32().encode(&mut map);
                        f.name.as_str().encode(&mut map);
                    }
                    out.push(FUNCTION_SUBSECTION);
                    map.as_slice().encode(&mut out);
                }
                Subsection::Raw { id, data } => {
                    out.push(*id);
                    data.as_slice().encode(&mut out);
                }
            }
        }
        out
    }
}
