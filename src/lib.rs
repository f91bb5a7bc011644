mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod projection;
    pub mod schema;
    pub mod shopping_list;
    pub mod short_link;
    pub mod validator;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
}
mod constants;

pub mod api;
pub mod config;
pub mod server;

pub use authentication::*;
pub use constants::*;
pub use database::*;
