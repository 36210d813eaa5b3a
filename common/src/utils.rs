pub mod cancel;
pub mod interface;
