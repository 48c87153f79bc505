pub mod utils;
pub mod vm;
