pub mod core;
pub mod entities;
pub mod lookups;
pub mod rows;
pub mod views;
