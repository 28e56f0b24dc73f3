pub mod api;
pub mod client;
pub mod model;

pub use api::{NotificationApi, RpcApi};
pub use client::RpcClient;
pub use model::*;
