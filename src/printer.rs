//! The IR printer: a textual dump of a compilation unit used for
//! debugging and golden tests. Colors are toggled by the sink, never by
//! the printer itself, so the same code path produces both the
//! developer-facing colored dump and the colorless golden-test output.

use std::fmt;

use diag::Palette;

use crate::collab::Collaborators;
use crate::function::Function;
use crate::ids::FunctionDecl;
use crate::opcode::{unpack_header, Opcode};
use crate::operand::{operand_data_type, Operand, OperandKind};
use crate::registry::CompilationUnit;

pub trait OutputSink: fmt::Write {
  fn ascii_colors_enabled(&self) -> bool;
}

/// An [`OutputSink`] over an in-memory `String`, for tests and any caller
/// that wants the dump as a value rather than streamed straight to a
/// terminal.
pub struct StringSink {
  pub buf: String,
  pub colors_enabled: bool,
}

impl StringSink {
  pub fn new(colors_enabled: bool) -> Self {
    StringSink {
      buf: String::new(),
      colors_enabled,
    }
  }
}

impl fmt::Write for StringSink {
  fn write_str(&mut self, s: &str) -> fmt::Result {
    self.buf.write_str(s)
  }
}

impl OutputSink for StringSink {
  fn ascii_colors_enabled(&self) -> bool {
    self.colors_enabled
  }
}

pub struct Printer;

impl Printer {
  /// Walks `cu.functions[USER_START..]`.
  pub fn print(cu: &CompilationUnit, collab: &Collaborators, sink: &mut dyn OutputSink) -> fmt::Result {
    let palette = Palette::new(sink.ascii_colors_enabled());
    for (decl, function) in cu.user_functions() {
      Self::print_function(decl, function, collab, &palette, sink)?;
    }
    Ok(())
  }

  fn print_function(
    decl: FunctionDecl,
    function: &Function,
    collab: &Collaborators,
    palette: &Palette,
    sink: &mut dyn OutputSink,
  ) -> fmt::Result {
    let name = collab.strings.get_or_empty(
      function
        .identifier
        .unwrap_or(crate::ids::StringId(u32::MAX)),
    );
    write!(sink, "Function(#{}): {}(", decl.0, name)?;
    for i in 0..function.params_count {
      if i > 0 {
        write!(sink, ", ")?;
      }
      let ty = function.value(i).ty;
      let ty_str = collab.data_types.data_type_string(ty);
      write!(sink, "{} %{}", palette.data_type(ty_str), i)?;
    }
    writeln!(sink, "):")?;

    let mut index = 0usize;
    while index < function.words.len() {
      let header = function.words[index];
      let (op, operands_count) = unpack_header(header);
      let operand_start = index + 2;
      let operands = &function.words[operand_start..operand_start + operands_count as usize];

      Self::print_instruction(op, operands, function, collab, palette, sink)?;

      index = operand_start + operands_count as usize;
    }

    Ok(())
  }

  fn print_instruction(
    op: Opcode,
    operand_words: &[u32],
    function: &Function,
    collab: &Collaborators,
    palette: &Palette,
    sink: &mut dyn OutputSink,
  ) -> fmt::Result {
    let operands: Vec<Operand> = operand_words.iter().copied().map(Operand::from_raw).collect();

    if op == Opcode::BasicBlock {
      write!(sink, "\t{}(", palette.opcode(op.name()))?;
      let self_idx = operands[0].aux();
      write!(sink, "{}", palette.basic_block(format!("@{self_idx}")))?;
      let block = function.basic_block(self_idx);
      for i in 0..block.params_count {
        let param = function.basic_block_param(block.params_start + i);
        let ty_str = collab.data_types.data_type_string(param.ty);
        write!(
          sink,
          ", {} {}",
          palette.data_type(ty_str),
          palette.value(format!("%p{}", block.params_start + i))
        )?;
      }
      writeln!(sink, "):")?;
      return Ok(());
    }

    write!(sink, "\t\t")?;

    if op.has_return_value() {
      let ty = operand_data_type(function, collab, operands[0]);
      let ty_str = collab.data_types.data_type_string(ty);
      write!(
        sink,
        "{} {} = ",
        palette.data_type(ty_str),
        Self::format_operand(operands[0], collab, palette)
      )?;
    }

    write!(sink, "{}(", palette.opcode(op.name()))?;

    let start = if op.has_return_value() { 1 } else { 0 };
    for (i, operand) in operands[start..].iter().enumerate() {
      if i > 0 {
        write!(sink, ", ")?;
      }
      write!(sink, "{}", Self::format_operand(*operand, collab, palette))?;
    }
    writeln!(sink, ");")?;

    Ok(())
  }

  fn format_operand(operand: Operand, collab: &Collaborators, palette: &Palette) -> String {
    match operand.kind() {
      OperandKind::Value => format!("{}", palette.value(format!("%{}", operand.aux()))),
      OperandKind::BasicBlockParam => format!("{}", palette.value(format!("%p{}", operand.aux()))),
      OperandKind::BasicBlock => format!("{}", palette.basic_block(format!("@{}", operand.aux()))),
      OperandKind::Constant => {
        let mut buf = String::new();
        let _ = collab
          .constants
          .constant_print(crate::ids::ConstantId(operand.aux()), &mut buf);
        buf
      }
      OperandKind::DeclGlobalVariable => {
        let id = collab
          .globals
          .global_variable_identifier(crate::ids::GlobalVarDecl(operand.aux()));
        format!("{}", palette.name(collab.strings.get_or_empty(id)))
      }
      OperandKind::DeclFunction => {
        let id = collab.functions.function_identifier(crate::ids::FunctionDecl(operand.aux()));
        format!("{}", palette.name(collab.strings.get_or_empty(id)))
      }
      OperandKind::DeclEnumValue => {
        let constant_id = collab
          .enum_values
          .enum_value_constant(crate::ids::EnumValueDecl(operand.aux()));
        let mut buf = String::new();
        let _ = collab.constants.constant_print(constant_id, &mut buf);
        buf
      }
      OperandKind::DataType => {
        let ty_str = collab.data_types.data_type_string(crate::ids::DataType(operand.aux()));
        format!("{}", palette.data_type(ty_str))
      }
      OperandKind::DeclLocalVariable => {
        diag::Fault::InvalidOperand { operand: "DECL_LOCAL_VARIABLE" }.abort()
      }
    }
  }
}
