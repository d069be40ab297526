pub mod decoy;
pub mod session;
pub mod terminal;
