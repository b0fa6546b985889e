pub mod search;
pub mod state;
