pub mod code_generator;
pub mod identifier;
pub mod password;
