pub mod app_config_store;
pub mod block_store;
pub mod edge_store;
pub mod height_group_store;

pub use app_config_store::AppConfigStore;
pub use block_store::BlockStore;
pub use edge_store::EdgeStore;
pub use height_group_store::HeightGroupStore;
