//! Opaque identifiers into the external tables the compilation unit's
//! collaborators own. The AML core never interprets these beyond
//! equality/ordering — resolving them to anything meaningful (a type name,
//! a constant's value) is the job of the collaborator traits in
//! [`crate::collab`].

/// A type identifier handed out by the external data-type system.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct DataType(pub u32);

/// An index into the external constant table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ConstantId(pub u32);

/// An index into the external string interner.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StringId(pub u32);

/// A declaration index into the AST's global-variable table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GlobalVarDecl(pub u32);

/// A declaration index into the AST's function table. Also used as the key
/// into the compilation-unit registry: every declared function gets
/// exactly one slot there.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FunctionDecl(pub u32);

/// A declaration index into the enum-value table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EnumValueDecl(pub u32);

/// An index into the compilation unit's source-location registry.
/// Stored as the second word of every instruction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LocationIdx(pub u32);
