//! 거래소 커넥터 구현.

pub mod binance_p2p;

pub use binance_p2p::{BinanceP2pClient, BinanceP2pConfig, BinanceSigner, RawOrderRecord};
