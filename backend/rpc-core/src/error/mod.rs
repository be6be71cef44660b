pub mod config;
pub mod decode;
pub mod rpc;

pub use config::ConfigError;
pub use decode::DecodeError;
pub use rpc::RpcError;

use models::ModelError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
