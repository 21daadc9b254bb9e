pub mod launcher;
pub mod registry;
pub mod session;
pub mod store;
