use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod amount;
pub mod api;
pub mod cache;
pub mod chain;
pub mod db;
pub mod error;
pub mod market;
pub mod types;

#[derive(Clone)]
pub struct AppState {
    pub market: Arc<market::Marketplace>,
    pub ready: Arc<AtomicBool>,
}
