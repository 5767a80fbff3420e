//! Builds a tiny two-block function and prints it, exercising the
//! allocator, builder, and printer end to end. Run with
//! `cargo run --example build_and_print`.

use std::collections::HashMap;

use aml::collab::{
  ConstantTable, DataTypeSystem, EnumValueTable, FunctionTable, GlobalVariableTable, StringInterner,
};
use aml::ids::{ConstantId, DataType, EnumValueDecl, FunctionDecl, GlobalVarDecl, LocationIdx, StringId};
use aml::opcode::Opcode;
use aml::operand::Operand;
use aml::printer::{OutputSink, Printer, StringSink};
use aml::registry::USER_START;
use aml::{AllocatorConfig, Collaborators, FunctionBuilder, PoolConfig};

struct Constants;

impl ConstantTable for Constants {
  fn constant_data_type(&self, _id: ConstantId) -> DataType {
    DataType(0)
  }

  fn constant_print(&self, id: ConstantId, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
    write!(out, "{}", id.0)
  }
}

struct Strings {
  entries: HashMap<u32, String>,
}

impl StringInterner for Strings {
  fn get_or_empty(&self, id: StringId) -> &str {
    self.entries.get(&id.0).map(String::as_str).unwrap_or("")
  }
}

struct Globals;

impl GlobalVariableTable for Globals {
  fn global_variable_identifier(&self, _decl: GlobalVarDecl) -> StringId {
    StringId(0)
  }

  fn global_variable_data_type(&self, _decl: GlobalVarDecl) -> DataType {
    DataType(0)
  }
}

struct Functions;

impl FunctionTable for Functions {
  fn function_identifier(&self, _decl: FunctionDecl) -> StringId {
    StringId(0)
  }

  fn function_signature_type(&self, _decl: FunctionDecl) -> DataType {
    DataType(0)
  }
}

struct EnumValues;

impl EnumValueTable for EnumValues {
  fn enum_value_constant(&self, _decl: EnumValueDecl) -> ConstantId {
    ConstantId(0)
  }
}

struct DataTypes {
  names: HashMap<u32, &'static str>,
}

impl DataTypeSystem for DataTypes {
  fn data_type_string(&self, ty: DataType) -> &str {
    self.names.get(&ty.0).copied().unwrap_or("<ty>")
  }

  fn lower_ast_to_aml(&self, ast_type: DataType) -> DataType {
    ast_type
  }

  fn basic_signed_integer_type(&self) -> DataType {
    DataType(0)
  }
}

fn main() {
  env_logger::init();

  let mut unit = aml::CompilationUnit::new(PoolConfig::default(), AllocatorConfig::default());
  let decl = FunctionDecl(USER_START);

  {
    let function = unit.alloc(decl, 8).expect("reserve_cap sized for this demo");
    function.identifier = Some(StringId(0));
    function.params_count = 1;
    let mut builder = FunctionBuilder::new(function);

    let param = builder.value_add(DataType(0));
    builder.basic_block_add(LocationIdx(0));
    let result = builder.value_add(DataType(0));
    let ops = builder.instr_add(LocationIdx(0), Opcode::Add, 3);
    ops[0] = result;
    ops[1] = param;
    ops[2] = Operand::constant(ConstantId(0));
    builder.instr_add(LocationIdx(0), Opcode::Return, 0);
  }

  let mut strings = HashMap::new();
  strings.insert(0u32, "main".to_string());
  let mut names = HashMap::new();
  names.insert(0u32, "i32");

  let constants = Constants;
  let string_table = Strings { entries: strings };
  let globals = Globals;
  let functions = Functions;
  let enum_values = EnumValues;
  let data_types = DataTypes { names };

  let collab = Collaborators {
    constants: &constants,
    strings: &string_table,
    globals: &globals,
    functions: &functions,
    enum_values: &enum_values,
    data_types: &data_types,
  };

  let mut sink = StringSink::new(true);
  Printer::print(&unit, &collab, &mut sink).expect("writing to a String never fails");
  print!("{}", sink.buf);
}
