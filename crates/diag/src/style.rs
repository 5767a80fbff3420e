use std::fmt;
use std::fmt::Display;

use owo_colors as colors;

/// Color roles used by the AML printer.
///
/// `enabled` is the single toggle the printer's output sink exposes;
/// golden tests always construct a [`Palette`] with it set to `false`.
pub struct Palette {
  pub enabled: bool,
  pub data_type: colors::Style,
  pub value: colors::Style,
  pub basic_block: colors::Style,
  pub name: colors::Style,
  pub opcode: colors::Style,
}

impl Palette {
  /// Cyan data types, yellow value/param indices, bright-cyan block indices,
  /// green names, red opcodes.
  pub fn new(enabled: bool) -> Self {
    use colors::Style;
    Self {
      enabled,
      data_type: Style::new().cyan(),
      value: Style::new().yellow(),
      basic_block: Style::new().bright_cyan(),
      name: Style::new().green(),
      opcode: Style::new().red(),
    }
  }

  pub fn data_type<'a, T: Display + 'a>(&'a self, inner: T) -> Styled<'a, T> {
    self.wrap(inner, &self.data_type)
  }

  pub fn value<'a, T: Display + 'a>(&'a self, inner: T) -> Styled<'a, T> {
    self.wrap(inner, &self.value)
  }

  pub fn basic_block<'a, T: Display + 'a>(&'a self, inner: T) -> Styled<'a, T> {
    self.wrap(inner, &self.basic_block)
  }

  pub fn name<'a, T: Display + 'a>(&'a self, inner: T) -> Styled<'a, T> {
    self.wrap(inner, &self.name)
  }

  pub fn opcode<'a, T: Display + 'a>(&'a self, inner: T) -> Styled<'a, T> {
    self.wrap(inner, &self.opcode)
  }

  fn wrap<'a, T: Display + 'a>(&'a self, inner: T, style: &'a colors::Style) -> Styled<'a, T> {
    Styled {
      inner,
      style: self.enabled.then_some(style),
    }
  }
}

impl Default for Palette {
  fn default() -> Self {
    Self::new(false)
  }
}

pub struct Styled<'a, T: Display + 'a> {
  inner: T,
  style: Option<&'a colors::Style>,
}

impl<'a, T: Display> Display for Styled<'a, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use colors::OwoColorize;

    if let Some(style) = self.style {
      write!(f, "{}", self.inner.style(*style))
    } else {
      write!(f, "{}", self.inner)
    }
  }
}
