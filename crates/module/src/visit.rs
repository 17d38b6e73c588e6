//! Traversal of instruction trees.
//!
//! Implementors of [`Visitor`] override [`Visitor::visit_instruction`] and call
//! [`walk_instruction`] from it to keep descending into nested `block`,
//! `loop` and `if` bodies. The default implementation does exactly that, so a
//! visitor that only inspects leaves never has to deal with nesting itself.

use crate::Instruction;

/// A visitor over a tree of [`Instruction`]s.
pub trait Visitor {
    /// Visit a single instruction. The default descends into nested
    /// instruction sequences.
    fn visit_instruction(&mut self, instruction: &Instruction) {
        walk_instruction(self, instruction);
    }
}

/// Visit every instruction of `instructions`, in order.
pub fn walk_instructions<V: Visitor + ?Sized>(visitor: &mut V, instructions: &[Instruction]) {
    for instruction in instructions {
        visitor.visit_instruction(instruction);
    }
}

/// Visit the instructions nested inside `instruction`, if any. For an `if`
/// the `then` arm is visited before the `else` arm.
pub fn walk_instruction<V: Visitor + ?Sized>(visitor: &mut V, instruction: &Instruction) {
    match instruction {
        Instruction::Block { body, .. } | Instruction::Loop { body, .. } => {
            walk_instructions(visitor, body);
        }
        Instruction::If {
            then, otherwise, ..
        } => {
            walk_instructions(visitor, then);
            walk_instructions(visitor, otherwise);
        }
        _ => {}
    }
}
