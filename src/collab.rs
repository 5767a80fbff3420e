//! External collaborator traits. The AML core never owns a constant
//! table, string interner, AST declaration tables, or a data-type system
//! — it only calls into whatever the front end plugs in. These traits are
//! the seam; a caller supplies one implementation that bundles all of
//! them (see [`Collaborators`]) and hands it to
//! [`crate::printer::Printer::print`] and [`crate::operand::Operand`]
//! resolution in [`crate::registry`].

use crate::ids::{ConstantId, DataType, EnumValueDecl, FunctionDecl, GlobalVarDecl, StringId};

pub trait ConstantTable {
  fn constant_data_type(&self, id: ConstantId) -> DataType;
  /// Writes the constant's printed form (e.g. `42`, `1.5`) with no
  /// trailing punctuation.
  fn constant_print(&self, id: ConstantId, out: &mut dyn std::fmt::Write) -> std::fmt::Result;
}

pub trait StringInterner {
  /// Returns the empty string for an absent or out-of-range id, rather
  /// than erroring — identifiers are optional everywhere they appear.
  fn get_or_empty(&self, id: StringId) -> &str;
}

pub trait GlobalVariableTable {
  fn global_variable_identifier(&self, decl: GlobalVarDecl) -> StringId;
  fn global_variable_data_type(&self, decl: GlobalVarDecl) -> DataType;
}

pub trait FunctionTable {
  fn function_identifier(&self, decl: FunctionDecl) -> StringId;
  /// The function's signature type, used when a `DECL_FUNCTION` operand
  /// is resolved to a data type.
  fn function_signature_type(&self, decl: FunctionDecl) -> DataType;
}

pub trait EnumValueTable {
  fn enum_value_constant(&self, decl: EnumValueDecl) -> ConstantId;
}

pub trait DataTypeSystem {
  fn data_type_string(&self, ty: DataType) -> &str;
  fn lower_ast_to_aml(&self, ast_type: DataType) -> DataType;
  /// The lowered basic signed-integer type, used when a `DECL_ENUM_VALUE`
  /// operand is resolved to a data type.
  fn basic_signed_integer_type(&self) -> DataType;
}

/// Bundles every collaborator trait the printer and operand resolution
/// need into one reference, so call sites take a single parameter instead
/// of five. These interfaces are otherwise independent of one another;
/// this is purely a convenience aggregate, not a new abstraction boundary.
pub struct Collaborators<'a> {
  pub constants: &'a dyn ConstantTable,
  pub strings: &'a dyn StringInterner,
  pub globals: &'a dyn GlobalVariableTable,
  pub functions: &'a dyn FunctionTable,
  pub enum_values: &'a dyn EnumValueTable,
  pub data_types: &'a dyn DataTypeSystem,
}
