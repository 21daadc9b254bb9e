pub mod error;
pub mod generator;
pub mod settings;
pub mod writer;
