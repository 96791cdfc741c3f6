pub mod models;
pub mod ports;
pub mod intel;
pub mod addr;
pub mod parse;
pub mod classify;
pub mod analysis;
pub mod recommend;
pub mod score;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
