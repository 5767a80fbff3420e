//! The function builder: four append-only operations that grow a
//! [`Function`]'s buffers while preserving its structural invariants. A
//! builder holds `&mut` onto the function it appends to for its entire
//! lifetime, so "not usable from two threads on the same function at
//! once" falls out of the borrow checker rather than a runtime flag.

use diag::Fault;

use crate::function::{BasicBlock, Function, Value};
use crate::ids::{DataType, LocationIdx};
use crate::opcode::{pack_header, Opcode};
use crate::operand::Operand;

/// Appends values, basic blocks, block parameters, and instructions onto
/// one [`Function`].
pub struct FunctionBuilder<'f> {
  function: &'f mut Function,
}

impl<'f> FunctionBuilder<'f> {
  pub fn new(function: &'f mut Function) -> Self {
    FunctionBuilder { function }
  }

  /// `value_add(data_type) → Operand{VALUE, idx}`.
  pub fn value_add(&mut self, ty: DataType) -> Operand {
    self.check_capacity("values", self.function.values.len(), self.function.values_cap);
    let idx = self.function.values.len() as u32;
    self.function.values.push(Value { ty });
    Operand::value(idx)
  }

  /// `basic_block_add(loc) → Operand{BASIC_BLOCK, idx}`, with the
  /// implicit fall-through fixup.
  pub fn basic_block_add(&mut self, loc: LocationIdx) -> Operand {
    self.check_capacity(
      "basic_blocks",
      self.function.basic_blocks.len(),
      self.function.basic_blocks_cap,
    );
    let new_idx = self.function.basic_blocks.len() as u32;
    if new_idx > 0 && !self.function.basic_blocks[new_idx as usize - 1].has_branch_or_return {
      self.emit_fallthrough_branch(loc, new_idx);
    }

    let word_offset = self.function.words.len() as u32;
    let params_start = self.function.basic_block_params.len() as u32;
    self.function.basic_blocks.push(BasicBlock {
      word_offset,
      params_start,
      params_count: 0,
      has_branch_or_return: false,
    });

    self.reserve_words(3);
    self.function.words.push(pack_header(Opcode::BasicBlock, 1));
    self.function.words.push(loc.0);
    self.function.words.push(Operand::basic_block(new_idx).raw());

    Operand::basic_block(new_idx)
  }

  fn emit_fallthrough_branch(&mut self, loc: LocationIdx, target_block_idx: u32) {
    self.reserve_words(3);
    self.function.words.push(pack_header(Opcode::Branch, 1));
    self.function.words.push(loc.0);
    self.function.words.push(Operand::basic_block(target_block_idx).raw());
    self.function.basic_blocks.last_mut().unwrap().has_branch_or_return = true;
  }

  /// `basic_block_param_add(data_type) → Operand{BASIC_BLOCK_PARAM, idx}`.
  /// Must immediately follow `basic_block_add`, before any instruction is
  /// appended to that block — enforced here by checking that the word
  /// stream hasn't moved past the block's header since it was opened,
  /// rather than by a separate state flag.
  pub fn basic_block_param_add(&mut self, ty: DataType) -> Operand {
    let block_idx = self.function.basic_blocks.len() - 1;
    let block_word_offset = self.function.basic_blocks[block_idx].word_offset as usize;
    if self.function.words.len() != block_word_offset + 3 {
      Fault::ParamAfterInstruction { block: block_idx as u32 }.abort();
    }
    self.check_capacity(
      "basic_block_params",
      self.function.basic_block_params.len(),
      self.function.basic_block_params_cap,
    );

    let idx = self.function.basic_block_params.len() as u32;
    self.function.basic_block_params.push(Value { ty });
    self.function.basic_blocks[block_idx].params_count += 1;

    Operand::basic_block_param(idx)
  }

  /// `instr_add(loc, op, operand_count) → &mut [Operand; operand_count]`.
  /// Reserves the words, writes the header and location, and hands back a
  /// mutable view over the reserved operand slots for the caller to fill.
  pub fn instr_add(&mut self, loc: LocationIdx, op: Opcode, operand_count: u32) -> &mut [Operand] {
    self.reserve_words(2 + operand_count as usize);
    self.function.words.push(pack_header(op, operand_count));
    self.function.words.push(loc.0);

    let start = self.function.words.len();
    self.function.words.resize(start + operand_count as usize, 0);

    if op.marks_terminator() {
      if let Some(last) = self.function.basic_blocks.last_mut() {
        last.has_branch_or_return = true;
      }
    }

    let words = &mut self.function.words[start..start + operand_count as usize];
    // SAFETY: `Operand` is `repr(transparent)` over `u32`, so a `&mut
    // [u32]` and a `&mut [Operand]` of the same length share a layout.
    unsafe { std::slice::from_raw_parts_mut(words.as_mut_ptr().cast::<Operand>(), words.len()) }
  }

  /// Counts never exceed the capacities reserved at `alloc` time. A
  /// caller that undersized `max_instrs` for the instructions it goes on
  /// to append is a compiler bug, not a recoverable condition — abort
  /// rather than let the backing `Vec` silently reallocate past the size
  /// class the allocator committed for this function.
  fn check_capacity(&self, buffer: &'static str, len: usize, cap: usize) {
    if len >= cap {
      Fault::CapacityExceeded { buffer, cap }.abort();
    }
  }

  /// Same check as [`Self::check_capacity`], sized for a multi-word
  /// reservation (an instruction's header + location + operands, or a
  /// `BASIC_BLOCK`/fall-through `BRANCH`'s fixed 3 words) rather than a
  /// single push.
  fn reserve_words(&self, additional: usize) {
    if self.function.words.len() + additional > self.function.words_cap {
      Fault::CapacityExceeded {
        buffer: "words",
        cap: self.function.words_cap,
      }
      .abort();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alloc::{Allocator, ceil_log2};
  use crate::config::{AllocatorConfig, PoolConfig};
  use crate::ids::FunctionDecl;

  fn fresh_function() -> Box<Function> {
    let allocator = Allocator::new(PoolConfig::default(), AllocatorConfig::default());
    allocator.alloc(FunctionDecl(0), 8).unwrap()
  }

  #[test]
  fn empty_function_scenario() {
    let mut function = fresh_function();
    let mut builder = FunctionBuilder::new(&mut function);
    builder.basic_block_add(LocationIdx(0));
    builder.instr_add(LocationIdx(0), Opcode::Return, 0);

    assert_eq!(function.basic_blocks.len(), 1);
    assert!(function.basic_blocks[0].has_branch_or_return);
    assert_eq!(function.words.len(), 5);
  }

  #[test]
  fn implicit_fallthrough_emits_branch() {
    let mut function = fresh_function();
    let mut builder = FunctionBuilder::new(&mut function);
    builder.basic_block_add(LocationIdx(0));
    builder.basic_block_add(LocationIdx(0));
    builder.instr_add(LocationIdx(0), Opcode::Return, 0);

    assert_eq!(function.basic_blocks.len(), 2);
    assert!(function.basic_blocks[0].has_branch_or_return);

    let (op, _) = crate::opcode::unpack_header(function.words[3]);
    assert_eq!(op, Opcode::Branch);
    let branch_target = Operand::from_raw(function.words[5]);
    assert_eq!(branch_target.aux(), 1);
  }

  #[test]
  fn param_after_block_add_updates_params_count() {
    let mut function = fresh_function();
    let mut builder = FunctionBuilder::new(&mut function);
    builder.basic_block_add(LocationIdx(0));
    let param = builder.basic_block_param_add(DataType(0));
    assert_eq!(param.aux(), 0);
    assert_eq!(function.basic_blocks[0].params_count, 1);
    assert_eq!(function.basic_blocks[0].params_start, 0);
  }

  #[test]
  fn add_with_ssa_result_fills_operands() {
    let mut function = fresh_function();
    let mut builder = FunctionBuilder::new(&mut function);
    builder.basic_block_add(LocationIdx(0));
    let v0 = builder.value_add(DataType(0));
    let ops = builder.instr_add(LocationIdx(0), Opcode::Add, 3);
    ops[0] = Operand::value(1);
    ops[1] = v0;
    ops[2] = Operand::constant(crate::ids::ConstantId(0));

    assert_eq!(ops[0].aux(), 1);
  }

  #[test]
  fn size_class_recovers_k() {
    let function = fresh_function();
    assert_eq!(function.size_class(), ceil_log2(8).max(crate::config::K_MIN));
  }
}
