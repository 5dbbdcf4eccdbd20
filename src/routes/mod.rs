pub mod admin;
pub mod creator;
pub mod public;
