//! 도메인 모델.

pub mod anomaly;
pub mod order;
pub mod profile;
pub mod summary;

pub use anomaly::*;
pub use order::*;
pub use profile::*;
pub use summary::*;
