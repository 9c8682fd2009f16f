pub mod charset;
pub mod isa;
pub mod word;
