//! The opcode table. `define_opcodes!` is a small declarative macro: list
//! the variants once, get the enum plus its metadata (`name`,
//! `has_return_value`, `marks_terminator`) generated alongside it instead
//! of kept in sync by hand across four match statements.

use paste::paste;

macro_rules! define_opcodes {
  ( $( $variant:ident ),* $(,)? ) => {
    paste! {
      /// An instruction's operation. Stored as the low byte of an
      /// instruction's header word.
      #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
      #[repr(u8)]
      pub enum Opcode {
        $( $variant, )*
      }

      impl Opcode {
        pub const ALL: &'static [Opcode] = &[
          $( Opcode::$variant, )*
        ];

        /// The name the printer emits: the spec's screaming-snake-case
        /// spelling (`BASIC_BLOCK`, `PTR_STATIC_ALLOC`, ...), not the
        /// PascalCase Rust variant name.
        pub fn name(self) -> &'static str {
          match self {
            $( Opcode::$variant => stringify!([<$variant:snake:upper>]), )*
          }
        }

        pub fn from_u8(byte: u8) -> Option<Opcode> {
          Self::ALL.get(byte as usize).copied()
        }
      }
    }
  };
}

define_opcodes! {
  NoOp,
  PtrStaticAlloc,
  PtrLoad,
  PtrStore,
  PtrAccessChain,
  PtrAccessChainInBounds,
  CompositeInit,
  CompositeAccessChainGet,
  CompositeAccessChainSet,
  BasicBlock,
  Branch,
  BranchConditional,
  Switch,
  Add,
  Subtract,
  Multiply,
  Divide,
  Modulo,
  BitAnd,
  BitOr,
  BitXor,
  BitShiftLeft,
  BitShiftRight,
  Equal,
  NotEqual,
  LessThan,
  LessThanOrEqual,
  GreaterThan,
  GreaterThanOrEqual,
  Negate,
  Convert,
  Bitcast,
  Call,
  Return,
  IntrinsicCall,
  Unreachable,
  Select,
}

impl Opcode {
  /// Whether operand slot 0 is the instruction's produced value. When
  /// false every operand slot is an input.
  pub fn has_return_value(self) -> bool {
    !matches!(
      self,
      Opcode::NoOp
        | Opcode::PtrStore
        | Opcode::CompositeAccessChainSet
        | Opcode::BasicBlock
        | Opcode::Branch
        | Opcode::BranchConditional
        | Opcode::Switch
        | Opcode::Return
        | Opcode::Unreachable
    )
  }

  /// Whether appending this instruction marks the current block's
  /// `has_branch_or_return`: `BRANCH`, `BRANCH_CONDITIONAL`, `SWITCH`,
  /// `RETURN`. `UNREACHABLE` is a terminator in the ordinary compiler
  /// sense but is deliberately *not* in this list — see `DESIGN.md` for
  /// why the fall-through fixup still runs after an `UNREACHABLE`.
  pub fn marks_terminator(self) -> bool {
    matches!(
      self,
      Opcode::Branch | Opcode::BranchConditional | Opcode::Switch | Opcode::Return
    )
  }
}

/// Packs an instruction header word: opcode in the low byte, operand
/// count in the next three bytes.
pub fn pack_header(opcode: Opcode, operands_count: u32) -> u32 {
  debug_assert!(operands_count <= 0x00FF_FFFF, "operand count overflow");
  (opcode as u32) | (operands_count << 8)
}

pub fn unpack_header(word: u32) -> (Opcode, u32) {
  let opcode = Opcode::from_u8((word & 0xFF) as u8).expect("corrupt opcode byte");
  let operands_count = word >> 8;
  (opcode, operands_count)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header_round_trips() {
    for &op in Opcode::ALL {
      let word = pack_header(op, 5);
      let (decoded_op, count) = unpack_header(word);
      assert_eq!(decoded_op, op);
      assert_eq!(count, 5);
    }
  }

  #[test]
  fn has_return_value_matches_known_exceptions() {
    let no_return = [
      Opcode::NoOp,
      Opcode::PtrStore,
      Opcode::CompositeAccessChainSet,
      Opcode::Branch,
      Opcode::BranchConditional,
      Opcode::Switch,
      Opcode::Return,
      Opcode::Unreachable,
    ];
    for &op in Opcode::ALL {
      assert_eq!(op.has_return_value(), !no_return.contains(&op), "{op:?}");
    }
  }

  #[test]
  fn marks_terminator_is_exactly_four_opcodes() {
    let terminators: Vec<_> = Opcode::ALL.iter().copied().filter(|o| o.marks_terminator()).collect();
    assert_eq!(
      terminators,
      vec![Opcode::Branch, Opcode::BranchConditional, Opcode::Switch, Opcode::Return]
    );
  }

  #[test]
  fn name_matches_spec_spelling() {
    assert_eq!(Opcode::BitShiftLeft.name(), "BIT_SHIFT_LEFT");
    assert_eq!(Opcode::BasicBlock.name(), "BASIC_BLOCK");
    assert_eq!(Opcode::PtrStaticAlloc.name(), "PTR_STATIC_ALLOC");
    assert_eq!(Opcode::Return.name(), "RETURN");
    assert_eq!(Opcode::Add.name(), "ADD");
  }
}
