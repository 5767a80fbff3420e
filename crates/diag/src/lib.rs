mod fault;
mod style;

pub use fault::Fault;
pub use style::{Palette, Styled};
