pub mod browser;
pub mod config;
pub mod grabber;
pub mod session;
pub mod webpage;
