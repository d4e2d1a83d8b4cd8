pub mod serve;
pub mod migrate;
