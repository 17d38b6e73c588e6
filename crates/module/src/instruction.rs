//! The instruction tree.
//!
//! Unlike the flat operator stream of the binary format, structured control
//! instructions (`block`, `loop`, `if`) own their nested instruction
//! sequences here, so `end` and `else` never appear as instructions.

use crate::FuncIndex;
use crate::function::ValType;
use anyhow::{Result, bail};
use std::borrow::Cow;

/// The type of a structured control instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockType {
    /// No parameters, no results.
    Empty,
    /// No parameters, a single result.
    Value(ValType),
    /// Parameters and results described by a type-section entry.
    Func(u32),
}

impl BlockType {
    pub(crate) fn from_wasmparser(ty: wasmparser::BlockType) -> Result<BlockType> {
        Ok(match ty {
            wasmparser::BlockType::Empty => BlockType::Empty,
            wasmparser::BlockType::Type(ty) => BlockType::Value(ValType::from_wasmparser(ty)?),
            wasmparser::BlockType::FuncType(index) => BlockType::Func(index),
        })
    }
}

impl From<BlockType> for wasm_encoder::BlockType {
    fn from(ty: BlockType) -> wasm_encoder::BlockType {
        match ty {
            BlockType::Empty => wasm_encoder::BlockType::Empty,
            BlockType::Value(ty) => wasm_encoder::BlockType::Result(ty.into()),
            BlockType::Func(index) => wasm_encoder::BlockType::FunctionType(index),
        }
    }
}

/// The immediate of a load or store.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemArg {
    /// Static offset added to the dynamic address.
    pub offset: u64,
    /// Alignment hint, as a power of two.
    pub align: u32,
    /// The memory being accessed.
    pub memory: u32,
}

impl From<wasmparser::MemArg> for MemArg {
    fn from(arg: wasmparser::MemArg) -> MemArg {
        MemArg {
            offset: arg.offset,
            align: u32::from(arg.align),
            memory: arg.memory,
        }
    }
}

impl From<MemArg> for wasm_encoder::MemArg {
    fn from(arg: MemArg) -> wasm_encoder::MemArg {
        wasm_encoder::MemArg {
            offset: arg.offset,
            align: arg.align,
            memory_index: arg.memory,
        }
    }
}

/// Defines [`Instruction`] along with its conversions from
/// `wasmparser::Operator` and to `wasm_encoder::Instruction`.
///
/// `plain` instructions take no immediates and `memory` instructions take a
/// single [`MemArg`]; their names are identical in all three enums.
macro_rules! define_instruction {
    (
        plain: [$($plain:ident)*]
        memory: [$($memory:ident)*]
    ) => {
        /// A single instruction of a function body.
        ///
        /// Control flow, calls, locals, globals and the integer and memory
        /// instructions a policy code generator emits most often are
        /// decoded. Every other operator is an opaque [`Instruction::Other`]
        /// leaf that re-encodes to exactly the bytes it was read from.
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub enum Instruction {
            $(
                #[doc = concat!("The `", stringify!($plain), "` instruction.")]
                $plain,
            )*
            $(
                #[doc = concat!("The `", stringify!($memory), "` instruction.")]
                $memory(MemArg),
            )*
            /// A `block` and its body.
            Block {
                /// The block's type.
                ty: BlockType,
                /// Instructions nested in the block.
                body: Vec<Instruction>,
            },
            /// A `loop` and its body.
            Loop {
                /// The loop's type.
                ty: BlockType,
                /// Instructions nested in the loop.
                body: Vec<Instruction>,
            },
            /// An `if` with its two arms; `otherwise` is empty when
            /// there was no `else`.
            If {
                /// The conditional's type.
                ty: BlockType,
                /// Instructions run when the condition is non-zero.
                then: Vec<Instruction>,
                /// Instructions run when the condition is zero.
                otherwise: Vec<Instruction>,
            },
            /// Unconditional branch to an enclosing label.
            Br(u32),
            /// Conditional branch to an enclosing label.
            BrIf(u32),
            /// Indexed branch to one of several enclosing labels.
            BrTable {
                /// Labels selected by the operand.
                targets: Vec<u32>,
                /// Label taken when the operand is out of range.
                default: u32,
            },
            /// Direct call of a function.
            Call(FuncIndex),
            /// Direct tail call of a function.
            ReturnCall(FuncIndex),
            /// Call through a table.
            CallIndirect {
                /// Expected signature of the callee.
                type_index: u32,
                /// Table holding the callee.
                table_index: u32,
            },
            /// `local.get`
            LocalGet(u32),
            /// `local.set`
            LocalSet(u32),
            /// `local.tee`
            LocalTee(u32),
            /// `global.get`
            GlobalGet(u32),
            /// `global.set`
            GlobalSet(u32),
            /// `i32.const`
            I32Const(i32),
            /// `i64.const`
            I64Const(i64),
            /// Any other operator, as its encoded bytes including the
            /// opcode. It has no nested instructions and no function index.
            Other(Vec<u8>),
        }

        impl Instruction {
            /// Converts an operator without nested structure; `raw` is its
            /// encoding. Structured operators, `else` and `end` are handled
            /// by the caller.
            pub(crate) fn from_operator(
                op: wasmparser::Operator<'_>,
                raw: &[u8],
            ) -> Result<Instruction> {
                use wasmparser::Operator;
                Ok(match op {
                    $(Operator::$plain => Instruction::$plain,)*
                    $(Operator::$memory { memarg } => Instruction::$memory(memarg.into()),)*
                    Operator::Br { relative_depth } => Instruction::Br(relative_depth),
                    Operator::BrIf { relative_depth } => Instruction::BrIf(relative_depth),
                    Operator::BrTable { targets } => Instruction::BrTable {
                        default: targets.default(),
                        targets: targets.targets().collect::<Result<_, _>>()?,
                    },
                    Operator::Call { function_index } => {
                        Instruction::Call(FuncIndex::from_wasm(function_index)?)
                    }
                    Operator::ReturnCall { function_index } => {
                        Instruction::ReturnCall(FuncIndex::from_wasm(function_index)?)
                    }
                    Operator::CallIndirect { type_index, table_index, .. } => {
                        Instruction::CallIndirect { type_index, table_index }
                    }
                    Operator::LocalGet { local_index } => Instruction::LocalGet(local_index),
                    Operator::LocalSet { local_index } => Instruction::LocalSet(local_index),
                    Operator::LocalTee { local_index } => Instruction::LocalTee(local_index),
                    Operator::GlobalGet { global_index } => Instruction::GlobalGet(global_index),
                    Operator::GlobalSet { global_index } => Instruction::GlobalSet(global_index),
                    Operator::I32Const { value } => Instruction::I32Const(value),
                    Operator::I64Const { value } => Instruction::I64Const(value),
                    // These open or split a control frame of their own, so an
                    // opaque leaf would unbalance the tree.
                    Operator::Try { .. }
                    | Operator::TryTable { .. }
                    | Operator::Catch { .. }
                    | Operator::CatchAll
                    | Operator::Delegate { .. } => {
                        bail!("unsupported exception handling instruction `{op:?}`")
                    }
                    _ => Instruction::Other(raw.to_vec()),
                })
            }

            /// Appends this instruction, including any nested
            /// instructions and their closing `end`, to `func`.
            pub(crate) fn encode(&self, func: &mut wasm_encoder::Function) {
                use wasm_encoder::Instruction as I;
                match self {
                    $(Instruction::$plain => {
                        func.instruction(&I::$plain);
                    })*
                    $(Instruction::$memory(memarg) => {
                        func.instruction(&I::$memory((*memarg).into()));
                    })*
                    Instruction::Block { ty, body } => {
                        func.instruction(&I::Block((*ty).into()));
                        encode_sequence(body, func);
                        func.instruction(&I::End);
                    }
                    Instruction::Loop { ty, body } => {
                        func.instruction(&I::Loop((*ty).into()));
                        encode_sequence(body, func);
                        func.instruction(&I::End);
                    }
                    Instruction::If { ty, then, otherwise } => {
                        func.instruction(&I::If((*ty).into()));
                        encode_sequence(then, func);
                        if !otherwise.is_empty() {
                            func.instruction(&I::Else);
                            encode_sequence(otherwise, func);
                        }
                        func.instruction(&I::End);
                    }
                    Instruction::Br(depth) => {
                        func.instruction(&I::Br(*depth));
                    }
                    Instruction::BrIf(depth) => {
                        func.instruction(&I::BrIf(*depth));
                    }
                    Instruction::BrTable { targets, default } => {
                        func.instruction(&I::BrTable(Cow::Borrowed(targets.as_slice()), *default));
                    }
                    Instruction::Call(index) => {
                        func.instruction(&I::Call(index.as_u32()));
                    }
                    Instruction::ReturnCall(index) => {
                        func.instruction(&I::ReturnCall(index.as_u32()));
                    }
                    Instruction::CallIndirect { type_index, table_index } => {
                        func.instruction(&I::CallIndirect {
                            type_index: *type_index,
                            table_index: *table_index,
                        });
                    }
                    Instruction::LocalGet(index) => {
                        func.instruction(&I::LocalGet(*index));
                    }
                    Instruction::LocalSet(index) => {
                        func.instruction(&I::LocalSet(*index));
                    }
                    Instruction::LocalTee(index) => {
                        func.instruction(&I::LocalTee(*index));
                    }
                    Instruction::GlobalGet(index) => {
                        func.instruction(&I::GlobalGet(*index));
                    }
                    Instruction::GlobalSet(index) => {
                        func.instruction(&I::GlobalSet(*index));
                    }
                    Instruction::I32Const(value) => {
                        func.instruction(&I::I32Const(*value));
                    }
                    Instruction::I64Const(value) => {
                        func.instruction(&I::I64Const(*value));
                    }
                    Instruction::Other(bytes) => {
                        func.raw(bytes.iter().copied());
                    }
                }
            }
        }
    };
}

define_instruction! {
    plain: [
        Unreachable Nop Return Drop Select
        I32Eqz I32Eq I32Ne I32LtS I32LtU I32GtS I32GtU I32LeS I32LeU I32GeS I32GeU
        I64Eqz I64Eq I64Ne I64LtS I64LtU I64GtS I64GtU
        I32Add I32Sub I32Mul I32DivS I32DivU I32RemS I32RemU
        I32And I32Or I32Xor I32Shl I32ShrS I32ShrU
        I64Add I64Sub I64Mul I64And I64Or I64Xor I64Shl I64ShrU
        I32WrapI64 I64ExtendI32S I64ExtendI32U
    ]
    memory: [
        I32Load I64Load I32Load8S I32Load8U
        I32Store I64Store I32Store8
    ]
}

impl Instruction {
    /// Whether this is a `block`, `loop` or `if`, i.e. an instruction with
    /// nested instruction sequences.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            Instruction::Block { .. } | Instruction::Loop { .. } | Instruction::If { .. }
        )
    }
}

pub(crate) fn encode_sequence(instructions: &[Instruction], func: &mut wasm_encoder::Function) {
    for instruction in instructions {
        instruction.encode(func);
    }
}
