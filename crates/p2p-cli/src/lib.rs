//! CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 자격증명 프로필 관리
//! - 주문 내역 동기화 및 정산 요약 출력

pub mod commands;
