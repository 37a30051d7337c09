#![allow(dead_code)]

mod fixtures;
mod user_api;

pub use fixtures::*;
pub use user_api::UserApi;
