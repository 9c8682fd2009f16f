pub mod address;
pub mod builder;
pub mod emit;
pub mod error;
pub mod list;
pub mod pointer;
pub mod resolve;

pub use address::{Address, ByteLoader, FileContent, FileKind, FileLoader, ValueType};
pub use builder::Builder;
pub use error::{Error, Result};
pub use list::{AssemblyItem, AssemblyList, Operand};
pub use pointer::{LabelId, Pointer, PointerTable};
pub use resolve::Program;
