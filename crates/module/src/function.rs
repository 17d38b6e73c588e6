use crate::instruction::{BlockType, Instruction, encode_sequence};
use anyhow::{Context, Result, bail};
use std::mem;

/// A value type of a local.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValType {
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl ValType {
    pub(crate) fn from_wasmparser(ty: wasmparser::ValType) -> Result<ValType> {
        Ok(match ty {
            wasmparser::ValType::I32 => ValType::I32,
            wasmparser::ValType::I64 => ValType::I64,
            wasmparser::ValType::F32 => ValType::F32,
            wasmparser::ValType::F64 => ValType::F64,
            other => bail!("unsupported value type `{other:?}`"),
        })
    }
}

impl From<ValType> for wasm_encoder::ValType {
    fn from(ty: ValType) -> wasm_encoder::ValType {
        match ty {
            ValType::I32 => wasm_encoder::ValType::I32,
            ValType::I64 => wasm_encoder::ValType::I64,
            ValType::F32 => wasm_encoder::ValType::F32,
            ValType::F64 => wasm_encoder::ValType::F64,
        }
    }
}

/// A decoded function body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Function {
    /// Local declarations, as `(count, type)` runs.
    pub locals: Vec<(u32, ValType)>,
    /// The body's instructions, without the final `end`.
    pub instructions: Vec<Instruction>,
}

impl Function {
    /// Create a function body from its locals and instructions.
    pub fn new(locals: Vec<(u32, ValType)>, instructions: Vec<Instruction>) -> Function {
        Function {
            locals,
            instructions,
        }
    }

    /// The smallest valid body: no locals and a single `unreachable`.
    ///
    /// Bodies of functions that can never be called are replaced with this,
    /// since an empty body does not validate.
    pub fn trap_stub() -> Function {
        Function::new(Vec::new(), vec![Instruction::Unreachable])
    }

    /// Whether this is exactly [`Function::trap_stub`].
    pub fn is_trap_stub(&self) -> bool {
        self.locals.is_empty() && self.instructions == [Instruction::Unreachable]
    }

    /// Encode this function into the raw body bytes stored in a code section
    /// entry (locals and expression, without the size prefix).
    pub fn encode(&self) -> Vec<u8> {
        let mut func = wasm_encoder::Function::new(
            self.locals.iter().map(|(count, ty)| (*count, (*ty).into())),
        );
        encode_sequence(&self.instructions, &mut func);
        func.instruction(&wasm_encoder::Instruction::End);
        func.into_raw_body()
    }

    /// Decode raw body bytes as produced by [`Function::encode`] or found in a
    /// code section entry.
    pub fn decode(bytes: &[u8]) -> Result<Function> {
        let body = wasmparser::FunctionBody::new(wasmparser::BinaryReader::new(bytes, 0));

        let mut locals = Vec::new();
        let mut reader = body.get_locals_reader()?;
        for _ in 0..reader.get_count() {
            let (count, ty) = reader.read()?;
            locals.push((count, ValType::from_wasmparser(ty)?));
        }

        let mut builder = TreeBuilder::default();
        let mut ops = body.get_operators_reader()?;
        while !ops.eof() {
            let offset = ops.original_position();
            let op = ops.read()?;
            let raw = &bytes[offset..ops.original_position()];
            builder
                .push(op, raw)
                .with_context(|| format!("failed to decode instruction at offset {offset:#x}"))?;
        }

        Ok(Function {
            locals,
            instructions: builder.finish()?,
        })
    }
}

/// Rebuilds the instruction tree from the flat operator stream.
#[derive(Default)]
struct TreeBuilder {
    /// Open control frames; empty before the first operator and after the
    /// body's final `end`.
    frames: Vec<Frame>,
    body: Option<Vec<Instruction>>,
}

enum FrameKind {
    Body,
    Block(BlockType),
    Loop(BlockType),
    If {
        ty: BlockType,
        then: Option<Vec<Instruction>>,
    },
}

struct Frame {
    kind: FrameKind,
    instructions: Vec<Instruction>,
}

impl TreeBuilder {
    fn open(&mut self, kind: FrameKind) {
        self.frames.push(Frame {
            kind,
            instructions: Vec::new(),
        });
    }

    fn innermost(&mut self) -> Result<&mut Frame> {
        self.frames
            .last_mut()
            .context("instruction outside of any control frame")
    }

    fn push(&mut self, op: wasmparser::Operator<'_>, raw: &[u8]) -> Result<()> {
        use wasmparser::Operator;

        if self.body.is_some() {
            bail!("operators after the end of the function body");
        }
        if self.frames.is_empty() {
            self.open(FrameKind::Body);
        }

        match op {
            Operator::Block { blockty } => {
                self.open(FrameKind::Block(BlockType::from_wasmparser(blockty)?))
            }
            Operator::Loop { blockty } => {
                self.open(FrameKind::Loop(BlockType::from_wasmparser(blockty)?))
            }
            Operator::If { blockty } => self.open(FrameKind::If {
                ty: BlockType::from_wasmparser(blockty)?,
                then: None,
            }),
            Operator::Else => {
                let frame = self.innermost()?;
                match &mut frame.kind {
                    FrameKind::If { then, .. } if then.is_none() => {
                        *then = Some(mem::take(&mut frame.instructions));
                    }
                    _ => bail!("`else` outside of an `if`"),
                }
            }
            Operator::End => {
                let Some(frame) = self.frames.pop() else {
                    bail!("unbalanced `end`");
                };
                let instruction = match frame.kind {
                    FrameKind::Body => {
                        self.body = Some(frame.instructions);
                        return Ok(());
                    }
                    FrameKind::Block(ty) => Instruction::Block {
                        ty,
                        body: frame.instructions,
                    },
                    FrameKind::Loop(ty) => Instruction::Loop {
                        ty,
                        body: frame.instructions,
                    },
                    FrameKind::If { ty, then: None } => Instruction::If {
                        ty,
                        then: frame.instructions,
                        otherwise: Vec::new(),
                    },
                    FrameKind::If {
                        ty,
                        then: Some(then),
                    } => Instruction::If {
                        ty,
                        then,
                        otherwise: frame.instructions,
                    },
                };
                self.innermost()?.instructions.push(instruction);
            }
            other => {
                let instruction = Instruction::from_operator(other, raw)?;
                self.innermost()?.instructions.push(instruction);
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<Instruction>> {
        match self.body {
            Some(body) => Ok(body),
            None => bail!("function body is missing its final `end`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FuncIndex;

    #[test]
    fn trap_stub_round_trips() -> Result<()> {
        let bytes = Function::trap_stub().encode();
        // no locals, `unreachable`, `end`
        assert_eq!(bytes, [0x00, 0x00, 0x0b]);
        let func = Function::decode(&bytes)?;
        assert!(func.is_trap_stub());
        Ok(())
    }

    #[test]
    fn nested_structure_survives_encoding() -> Result<()> {
        let func = Function::new(
            vec![(2, ValType::I32), (1, ValType::I64)],
            vec![
                Instruction::Block {
                    ty: BlockType::Empty,
                    body: vec![
                        Instruction::LocalGet(0),
                        Instruction::BrIf(0),
                        Instruction::Loop {
                            ty: BlockType::Value(ValType::I32),
                            body: vec![Instruction::Call(FuncIndex::from_u32(3))],
                        },
                        Instruction::Drop,
                    ],
                },
                Instruction::I32Const(1),
                Instruction::If {
                    ty: BlockType::Empty,
                    then: vec![Instruction::Call(FuncIndex::from_u32(4))],
                    otherwise: vec![Instruction::Nop],
                },
            ],
        );
        assert_eq!(Function::decode(&func.encode())?, func);
        Ok(())
    }

    #[test]
    fn reserved_call_target_is_an_error() {
        // `call 0xffff_ffff`
        let bytes = [0x00, 0x10, 0xff, 0xff, 0xff, 0xff, 0x0f, 0x0b];
        let err = Function::decode(&bytes).unwrap_err();
        assert!(format!("{err:#}").contains("out of range"), "{err:#}");
    }

    #[test]
    fn exception_handling_is_rejected_by_name() {
        // `try_table` with no catch clauses
        let bytes = [0x00, 0x1f, 0x40, 0x00, 0x0b, 0x0b];
        let err = Function::decode(&bytes).unwrap_err();
        assert!(format!("{err:#}").contains("exception handling"), "{err:#}");
    }

    #[test]
    fn opaque_operators_keep_their_bytes() -> Result<()> {
        // `i64.const 1`, `i64.const 2`, `i64.le_s`, `drop`
        let bytes = [0x00, 0x42, 0x01, 0x42, 0x02, 0x57, 0x1a, 0x0b];
        let func = Function::decode(&bytes)?;
        assert_eq!(
            func.instructions,
            [
                Instruction::I64Const(1),
                Instruction::I64Const(2),
                Instruction::Other(vec![0x57]),
                Instruction::Drop,
            ]
        );
        assert_eq!(func.encode(), bytes);
        Ok(())
    }

    #[test]
    fn unbalanced_body_is_rejected() {
        // `block` without a matching `end` before the function's `end`
        let bytes = [0x00, 0x02, 0x40, 0x0b];
        assert!(Function::decode(&bytes).is_err());
    }
}
