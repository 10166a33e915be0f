pub mod config;
pub mod data;
pub mod errors;
pub mod etl;
pub mod graph;
pub mod parser;
pub mod source;
