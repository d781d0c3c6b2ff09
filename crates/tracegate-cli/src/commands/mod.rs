pub mod classify;
pub mod dump;
