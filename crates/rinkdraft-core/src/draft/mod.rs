pub mod drafter;
pub mod roster;
pub mod session;
