pub mod vabc;
