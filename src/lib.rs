pub mod ast;
pub mod compiler;
pub mod emit;
pub mod error;
pub mod parser;
pub mod preload;
pub mod program;
pub mod registrar;
pub mod schema;


pub use compiler::{compile_block, Block, Translator};
pub use emit::generate;
pub use error::{Error, Result};
pub use parser::parse_rule;
pub use program::Program;
pub use schema::Schema;
