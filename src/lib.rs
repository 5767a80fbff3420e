//! Abstract Machine Language: the SSA IR core of a shader compiler,
//! sitting between AST lowering and code generation. Owns an
//! instruction-count-bucketed function allocator, the append-only builder
//! that populates a function's word stream, the tagged operand encoding
//! those words carry, and the registry and printer that tie a compilation
//! unit together. Everything outside that boundary — the AST, the
//! constant table, the string interner, the data-type system, the
//! back-end emitter — is an external collaborator reached through
//! [`collab`].

pub mod alloc;
pub mod builder;
pub mod collab;
pub mod config;
pub mod error;
pub mod function;
pub mod ids;
pub mod opcode;
pub mod operand;
pub mod pool;
pub mod printer;
pub mod registry;

pub use alloc::Allocator;
pub use builder::FunctionBuilder;
pub use collab::Collaborators;
pub use config::{AllocatorConfig, PoolConfig};
pub use error::Fault;
pub use function::Function;
pub use opcode::Opcode;
pub use operand::{Operand, OperandKind};
pub use printer::Printer;
pub use registry::CompilationUnit;
