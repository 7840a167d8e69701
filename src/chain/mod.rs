pub mod events;
pub mod provider;
pub mod receipt;
