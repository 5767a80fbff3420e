//! The `Function` record. A function's state lives in four growable
//! buffers plus the free-list link the allocator threads through it;
//! everything else (the instruction stream's layout, basic block
//! bookkeeping) is a view over those buffers.

use crate::ids::{DataType, FunctionDecl, StringId};

/// One SSA value defined somewhere in the function: either a function
/// parameter, a basic block parameter, or an instruction's result.
#[derive(Clone, Copy, Debug)]
pub struct Value {
  pub ty: DataType,
}

/// A basic block's bookkeeping. The instructions themselves live in
/// [`Function::words`]; this just records where the block starts and
/// which slice of [`Function::basic_block_params`] it opens with.
#[derive(Clone, Debug)]
pub struct BasicBlock {
  /// Offset, in words, of this block's first instruction header in
  /// [`Function::words`].
  pub word_offset: u32,
  /// Index into [`Function::basic_block_params`] of this block's first
  /// parameter.
  pub params_start: u32,
  pub params_count: u32,
  /// Set once an instruction with [`crate::opcode::Opcode::marks_terminator`]
  /// is appended to this block. Used to detect and fix up the implicit
  /// fall-through edge when a new block is opened on top of one that
  /// never got one.
  pub has_branch_or_return: bool,
}

/// A function under construction. Lives behind `Box<Function>` once
/// handed out by [`crate::alloc::Allocator`]; the raw `next_free` pointer
/// exists solely to thread it through the allocator's intrusive free
/// list and must never be read except by the allocator.
pub struct Function {
  pub decl: FunctionDecl,
  pub identifier: Option<StringId>,
  /// Number of leading entries in [`Function::values`] that represent
  /// this function's parameters.
  pub params_count: u32,

  /// The packed instruction word stream: `(opcode, operands_count)`
  /// header, a source-location index word, then `operands_count` operand
  /// words, repeated.
  pub words: Vec<u32>,
  pub values: Vec<Value>,
  pub basic_blocks: Vec<BasicBlock>,
  pub basic_block_params: Vec<Value>,

  /// Capacities reserved from the pools at alloc time. `dealloc` recovers
  /// the size class from `words_cap / W` rounded up to a power of two,
  /// rather than storing `k` redundantly.
  pub(crate) words_cap: usize,
  pub(crate) values_cap: usize,
  pub(crate) basic_blocks_cap: usize,
  pub(crate) basic_block_params_cap: usize,

  /// Intrusive free-list link. `null` while the function is live and
  /// owned by a caller; set only while parked on the allocator's free
  /// list awaiting reuse.
  pub(crate) next_free: *mut Function,
}

impl Function {
  pub(crate) fn with_capacity(
    decl: FunctionDecl,
    words_cap: usize,
    values_cap: usize,
    basic_blocks_cap: usize,
    basic_block_params_cap: usize,
  ) -> Self {
    Function {
      decl,
      identifier: None,
      params_count: 0,
      words: Vec::with_capacity(words_cap),
      values: Vec::with_capacity(values_cap),
      basic_blocks: Vec::with_capacity(basic_blocks_cap),
      basic_block_params: Vec::with_capacity(basic_block_params_cap),
      words_cap,
      values_cap,
      basic_blocks_cap,
      basic_block_params_cap,
      next_free: std::ptr::null_mut(),
    }
  }

  /// Reset a reused function's scalar fields and counts to empty without
  /// touching its reserved capacity. Contents are reset on re-allocation,
  /// not on deallocation.
  pub(crate) fn reset(&mut self, decl: FunctionDecl) {
    self.decl = decl;
    self.identifier = None;
    self.params_count = 0;
    self.words.clear();
    self.values.clear();
    self.basic_blocks.clear();
    self.basic_block_params.clear();
  }

  pub fn value(&self, idx: u32) -> Value {
    self.values[idx as usize]
  }

  pub fn basic_block(&self, idx: u32) -> &BasicBlock {
    &self.basic_blocks[idx as usize]
  }

  pub fn basic_block_param(&self, idx: u32) -> Value {
    self.basic_block_params[idx as usize]
  }

  /// Recovers `k` from the reserved words capacity: `words_cap` is
  /// always `2^k * W` words, laid down once at alloc time.
  pub fn size_class(&self) -> u32 {
    crate::alloc::ceil_log2((self.words_cap as u32).div_ceil(crate::config::W))
  }
}
