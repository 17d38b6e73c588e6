use crate::Module;
use crate::module::Section;
use std::borrow::Cow;

impl Module {
    /// Encode this module into the Wasm binary format.
    ///
    /// Sections are emitted in their original order. Only the code section
    /// and the `name` section are re-encoded; every other section is copied
    /// byte for byte.
    pub fn encode(&self) -> Vec<u8> {
        log::debug!("Encoding the output Wasm");

        let mut encoder = wasm_encoder::Module::new();
        let mut wrote_names = false;

        for section in &self.sections {
            match section {
                Section::Raw { id, data } => {
                    encoder.section(&wasm_encoder::RawSection { id: *id, data });
                }
                Section::Code => {
                    let mut code = wasm_encoder::CodeSection::new();
                    for (_, entry) in self.code.iter() {
                        code.raw(entry.bytes());
                    }
                    encoder.section(&code);
                }
                Section::Names => {
                    encoder.section(&self.name_section());
                    wrote_names = true;
                }
            }
        }

        if !wrote_names && !self.names.is_empty() {
            encoder.section(&self.name_section());
        }

        encoder.finish()
    }

    fn name_section(&self) -> wasm_encoder::CustomSection<'static> {
        wasm_encoder::CustomSection {
            name: Cow::Borrowed("name"),
            data: Cow::Owned(self.names.encode()),
        }
    }
}
