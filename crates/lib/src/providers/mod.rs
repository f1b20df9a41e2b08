pub mod ai;
pub mod embedding;
pub mod factory;
pub mod ner;
pub mod search;
