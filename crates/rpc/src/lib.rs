mod client;
mod types;

pub use self::client::{Client, ClientConfig, RpcError};
pub use self::types::{
    RpcErrorBody, RpcResponse, SignatureInfo, TokenAmount, TokenBalance, TransactionMeta,
    TransactionResult,
};
