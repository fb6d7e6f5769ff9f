//! CLI 명령어 구현 모듈.

pub mod profile;
pub mod sync;
pub mod vault;
