pub mod config;
pub mod dict;
pub mod error;
pub mod events;
pub mod game;
pub mod http_api;
pub mod room;
pub mod round;
pub mod search;
pub mod worker;
