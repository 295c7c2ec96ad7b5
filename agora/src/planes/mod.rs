pub mod control;
pub mod data;
