//! The compilation-unit registry: the stable `FunctionDecl → Box<
//! Function>` mapping, plus the append-only source-location table every
//! instruction's second word indexes into. The AML core owns this index
//! space and storage — the content and rendering of a `Span` stays
//! external; only the registry that hands out and resolves `LocationIdx`
//! lives here.

use indexmap::IndexMap;
use span::Span;

use diag::Fault;

use crate::alloc::Allocator;
use crate::config::{AllocatorConfig, PoolConfig};
use crate::function::Function;
use crate::ids::{FunctionDecl, LocationIdx};

/// Slots below this index are implementation intrinsics: the printer and
/// other iteration consumers skip them. A fresh `CompilationUnit`
/// reserves them up front so user-declared functions never collide with
/// an intrinsic's `FunctionDecl`.
pub const USER_START: u32 = 1;

/// Append-only table of `Span`s, indexed by the `LocationIdx` every
/// instruction's second word stores.
#[derive(Default)]
pub struct SourceLocationRegistry {
  spans: Vec<Span>,
}

impl SourceLocationRegistry {
  pub fn new() -> Self {
    SourceLocationRegistry { spans: Vec::new() }
  }

  pub fn push(&mut self, span: Span) -> LocationIdx {
    let idx = self.spans.len() as u32;
    self.spans.push(span);
    LocationIdx(idx)
  }

  pub fn get(&self, idx: LocationIdx) -> Span {
    self.spans[idx.0 as usize]
  }

  pub fn len(&self) -> usize {
    self.spans.len()
  }

  pub fn is_empty(&self) -> bool {
    self.spans.is_empty()
  }
}

/// Owns every live `Function` in one compilation, keyed by `FunctionDecl`,
/// plus the allocator they were drawn from and the source-location
/// registry their instructions index into. Ordered by first insertion, so
/// the printer's `cu.functions[USER_START..]` walk is just "skip the
/// decls below `USER_START`" over the map in iteration order.
pub struct CompilationUnit {
  allocator: Allocator,
  functions: IndexMap<FunctionDecl, Box<Function>>,
  pub locations: SourceLocationRegistry,
}

impl CompilationUnit {
  pub fn new(pool_config: PoolConfig, allocator_config: AllocatorConfig) -> Self {
    CompilationUnit {
      allocator: Allocator::new(pool_config, allocator_config),
      functions: IndexMap::new(),
      locations: SourceLocationRegistry::new(),
    }
  }

  /// Draws a function from the allocator and installs it at `decl`'s
  /// registry slot.
  pub fn alloc(&mut self, decl: FunctionDecl, max_instrs: u32) -> Result<&mut Function, Fault> {
    let function = self.allocator.alloc(decl, max_instrs)?;
    let (idx, _) = self.functions.insert_full(decl, function);
    Ok(self.functions.get_index_mut(idx).unwrap().1)
  }

  /// Vacates `decl`'s registry slot and returns the function to the
  /// allocator's free list. A no-op if the slot was already vacant — a
  /// redundant dealloc on an already-freed decl is a caller bug the
  /// allocator doesn't need to detect here. Uses `shift_remove` rather
  /// than `swap_remove` so the remaining functions keep their declaration
  /// order — the printer and tests both rely on it.
  pub fn dealloc(&mut self, decl: FunctionDecl) {
    if let Some(function) = self.functions.shift_remove(&decl) {
      self.allocator.dealloc(function);
    }
  }

  pub fn function(&self, decl: FunctionDecl) -> Option<&Function> {
    self.functions.get(&decl).map(Box::as_ref)
  }

  pub fn function_mut(&mut self, decl: FunctionDecl) -> Option<&mut Function> {
    self.functions.get_mut(&decl).map(Box::as_mut)
  }

  /// Every live, user-declared function, in registry order.
  pub fn user_functions(&self) -> impl Iterator<Item = (FunctionDecl, &Function)> {
    self
      .functions
      .iter()
      .filter(|(decl, _)| decl.0 >= USER_START)
      .map(|(decl, function)| (*decl, function.as_ref()))
  }
}
