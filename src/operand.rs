//! Tagged operand encoding.
//!
//! An [`Operand`] is a dense 32-bit word at rest: the low 4 bits hold its
//! [`OperandKind`], the high 28 bits hold `aux` — an index into whichever
//! table that kind resolves against. Densely packing into one word (rather
//! than a fat enum) is what lets the instruction stream store operands
//! inline alongside the opcode header: dense tagged word in the stream,
//! sum type at the API.

use std::fmt;

use diag::Fault;

use crate::collab::Collaborators;
use crate::function::Function;
use crate::ids::{ConstantId, DataType, FunctionDecl, GlobalVarDecl};

const KIND_BITS: u32 = 4;
const KIND_MASK: u32 = (1 << KIND_BITS) - 1;

/// The operand's tag.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum OperandKind {
  Value = 0,
  Constant = 1,
  BasicBlock = 2,
  BasicBlockParam = 3,
  DeclGlobalVariable = 4,
  DeclFunction = 5,
  DeclEnumValue = 6,
  /// Invalid at the AML level — locals must be promoted to SSA values by
  /// the lowering pass before it ever calls into the builder.
  DeclLocalVariable = 7,
  /// The operand's `aux` field is itself a raw [`DataType`] id.
  DataType = 8,
}

impl OperandKind {
  const ALL: [OperandKind; 9] = [
    OperandKind::Value,
    OperandKind::Constant,
    OperandKind::BasicBlock,
    OperandKind::BasicBlockParam,
    OperandKind::DeclGlobalVariable,
    OperandKind::DeclFunction,
    OperandKind::DeclEnumValue,
    OperandKind::DeclLocalVariable,
    OperandKind::DataType,
  ];

  fn from_tag(tag: u32) -> OperandKind {
    Self::ALL
      .get(tag as usize)
      .copied()
      .unwrap_or_else(|| panic!("corrupt operand tag {tag}"))
  }
}

/// A tagged operand. `Copy` and dense enough to store inline in the
/// word stream; `repr(transparent)` so a run of operand words in the
/// stream can be reinterpreted as `&mut [Operand]` without a copy (used by
/// [`crate::builder::FunctionBuilder::instr_add`]).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Operand(u32);

impl Operand {
  pub fn pack(kind: OperandKind, aux: u32) -> Self {
    debug_assert!(
      aux <= (u32::MAX >> KIND_BITS),
      "aux {aux} does not fit in {} bits",
      32 - KIND_BITS
    );
    Operand((kind as u32) | (aux << KIND_BITS))
  }

  pub fn kind(self) -> OperandKind {
    OperandKind::from_tag(self.0 & KIND_MASK)
  }

  pub fn aux(self) -> u32 {
    self.0 >> KIND_BITS
  }

  pub fn raw(self) -> u32 {
    self.0
  }

  pub fn from_raw(raw: u32) -> Self {
    Operand(raw)
  }

  pub fn value(idx: u32) -> Self {
    Self::pack(OperandKind::Value, idx)
  }

  pub fn constant(id: crate::ids::ConstantId) -> Self {
    Self::pack(OperandKind::Constant, id.0)
  }

  pub fn basic_block(idx: u32) -> Self {
    Self::pack(OperandKind::BasicBlock, idx)
  }

  pub fn basic_block_param(idx: u32) -> Self {
    Self::pack(OperandKind::BasicBlockParam, idx)
  }

  pub fn decl_global_variable(decl: crate::ids::GlobalVarDecl) -> Self {
    Self::pack(OperandKind::DeclGlobalVariable, decl.0)
  }

  pub fn decl_function(decl: crate::ids::FunctionDecl) -> Self {
    Self::pack(OperandKind::DeclFunction, decl.0)
  }

  pub fn decl_enum_value(decl: crate::ids::EnumValueDecl) -> Self {
    Self::pack(OperandKind::DeclEnumValue, decl.0)
  }

  pub fn data_type(ty: DataType) -> Self {
    Self::pack(OperandKind::DataType, ty.0)
  }
}

/// Resolves an operand to the data type it carries, dispatching on its
/// kind to whichever collaborator owns that answer. `BASIC_BLOCK` and
/// `DECL_LOCAL_VARIABLE` are fatal — neither is typed at the AML level.
/// Aborts the process on either; see [`try_operand_data_type`] for a
/// checkable variant used in tests.
pub fn operand_data_type(function: &Function, collab: &Collaborators, operand: Operand) -> DataType {
  match try_operand_data_type(function, collab, operand) {
    Ok(ty) => ty,
    Err(fault) => fault.abort(),
  }
}

/// Non-aborting core of [`operand_data_type`].
pub fn try_operand_data_type(
  function: &Function,
  collab: &Collaborators,
  operand: Operand,
) -> Result<DataType, Fault> {
  Ok(match operand.kind() {
    OperandKind::Value => function.value(operand.aux()).ty,
    OperandKind::Constant => collab.constants.constant_data_type(ConstantId(operand.aux())),
    OperandKind::BasicBlock => return Err(Fault::InvalidOperand { operand: "BASIC_BLOCK" }),
    OperandKind::BasicBlockParam => function.basic_block_param(operand.aux()).ty,
    OperandKind::DeclGlobalVariable => {
      collab.globals.global_variable_data_type(GlobalVarDecl(operand.aux()))
    }
    OperandKind::DeclFunction => collab.functions.function_signature_type(FunctionDecl(operand.aux())),
    OperandKind::DeclEnumValue => collab.data_types.basic_signed_integer_type(),
    OperandKind::DeclLocalVariable => {
      return Err(Fault::InvalidOperand { operand: "DECL_LOCAL_VARIABLE" })
    }
    OperandKind::DataType => DataType(operand.aux()),
  })
}

impl fmt::Debug for Operand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Operand")
      .field("kind", &self.kind())
      .field("aux", &self.aux())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_every_kind() {
    let cases = [
      Operand::value(0),
      Operand::value(0x0FFF_FFFF),
      Operand::constant(crate::ids::ConstantId(7)),
      Operand::basic_block(3),
      Operand::basic_block_param(1),
      Operand::decl_global_variable(crate::ids::GlobalVarDecl(9)),
      Operand::decl_function(crate::ids::FunctionDecl(2)),
      Operand::decl_enum_value(crate::ids::EnumValueDecl(4)),
      Operand::data_type(DataType(11)),
    ];
    for op in cases {
      let round_tripped = Operand::from_raw(op.raw());
      assert_eq!(round_tripped.kind(), op.kind());
      assert_eq!(round_tripped.aux(), op.aux());
    }
  }

  #[test]
  fn max_aux_fits() {
    let op = Operand::value(u32::MAX >> KIND_BITS);
    assert_eq!(op.aux(), u32::MAX >> KIND_BITS);
  }

  #[test]
  fn operand_data_type_resolves_value_kind() {
    use crate::collab::fixtures::*;
    use crate::ids::FunctionDecl;

    let allocator = crate::alloc::Allocator::new(
      crate::config::PoolConfig::default(),
      crate::config::AllocatorConfig::default(),
    );
    let mut function = allocator.alloc(FunctionDecl(0), 4).unwrap();
    function.values.push(crate::function::Value { ty: DataType(7) });

    let constants = FakeConstants::default();
    let strings = FakeStrings::default();
    let globals = FakeGlobals;
    let functions = FakeFunctions;
    let enum_values = FakeEnumValues;
    let data_types = FakeDataTypes::default();
    let collab = Collaborators {
      constants: &constants,
      strings: &strings,
      globals: &globals,
      functions: &functions,
      enum_values: &enum_values,
      data_types: &data_types,
    };

    let ty = operand_data_type(&function, &collab, Operand::value(0));
    assert_eq!(ty, DataType(7));
  }

  #[test]
  fn operand_data_type_rejects_basic_block_and_local_variable() {
    use crate::collab::fixtures::*;
    use crate::ids::FunctionDecl;

    let allocator = crate::alloc::Allocator::new(
      crate::config::PoolConfig::default(),
      crate::config::AllocatorConfig::default(),
    );
    let function = allocator.alloc(FunctionDecl(0), 4).unwrap();

    let constants = FakeConstants::default();
    let strings = FakeStrings::default();
    let globals = FakeGlobals;
    let functions = FakeFunctions;
    let enum_values = FakeEnumValues;
    let data_types = FakeDataTypes::default();
    let collab = Collaborators {
      constants: &constants,
      strings: &strings,
      globals: &globals,
      functions: &functions,
      enum_values: &enum_values,
      data_types: &data_types,
    };

    assert!(matches!(
      try_operand_data_type(&function, &collab, Operand::basic_block(0)),
      Err(Fault::InvalidOperand { operand: "BASIC_BLOCK" })
    ));
    assert!(matches!(
      try_operand_data_type(&function, &collab, Operand::pack(OperandKind::DeclLocalVariable, 0)),
      Err(Fault::InvalidOperand { operand: "DECL_LOCAL_VARIABLE" })
    ));
  }
}
