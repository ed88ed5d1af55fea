pub mod channels;
pub mod config;
pub mod memory;
pub mod outreach;
pub mod shared;
