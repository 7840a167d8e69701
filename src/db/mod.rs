pub mod activity_log;
pub mod appraisals;
pub mod cache;
pub mod listings;
pub mod offers;
