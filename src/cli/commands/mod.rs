pub mod auth;
pub mod entries;
pub mod invoice;
pub mod server;
pub mod timer;
