pub mod auth;
pub mod bus;
pub mod config;
pub mod host;
pub mod locale;
pub mod logging;
pub mod registry;
pub mod routing;
pub mod state;
pub mod storage;
pub mod store;
pub mod theme;
