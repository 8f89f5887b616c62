pub mod cli;
pub mod commands;
pub mod graphs;
pub mod locus;
pub mod utils;
pub mod workflows;
