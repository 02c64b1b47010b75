mod exports;
pub use exports::*;

pub mod abc;
pub mod accept;
pub mod config;
pub mod io;
pub mod model;
pub mod posterior;
pub mod prior;
pub mod series;
pub mod utils;
