//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 모든 섹션은 기본값을 가지므로 설정 파일 없이도 동작합니다.

use crate::domain::TakerFeePolicy;
use crate::logging::{LogConfig, LogFormat};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 환경 변수 접두사 (`P2P__SYNC__PAGE_SIZE=50` 형식).
pub const ENV_PREFIX: &str = "P2P";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 거래소 설정
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// 동기화 설정
    #[serde(default)]
    pub sync: SyncConfig,
    /// 수수료 설정
    #[serde(default)]
    pub fees: FeeConfig,
    /// 자격증명 저장소 설정
    #[serde(default)]
    pub vault: VaultConfig,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    /// 로깅 초기화용 설정으로 변환합니다. 알 수 없는 형식은 pretty로 대체합니다.
    pub fn to_log_config(&self) -> LogConfig {
        let format = self.format.parse().unwrap_or(LogFormat::Pretty);
        LogConfig::new(self.level.clone()).with_format(format)
    }

    /// `LOG_FORMAT` 환경 변수까지 반영한 로깅 설정.
    pub fn resolve(&self) -> LogConfig {
        self.to_log_config().with_env_overrides()
    }
}

/// 거래소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    /// REST API 기본 URL
    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 서명 요청의 recvWindow (밀리초)
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
}

fn default_rest_base_url() -> String {
    "https://api.binance.com".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_recv_window_ms() -> u64 {
    5000
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            rest_base_url: default_rest_base_url(),
            timeout_secs: default_timeout_secs(),
            recv_window_ms: default_recv_window_ms(),
        }
    }
}

/// 동기화 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// 페이지당 요청 행 수
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// 한 번의 동기화에서 가져올 최대 페이지 수
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// 재시도 설정
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_page_size() -> u32 {
    100
}
fn default_max_pages() -> u32 {
    50
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            retry: RetrySettings::default(),
        }
    }
}

/// 페이지 단위 재시도 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    /// 최대 시도 횟수 (첫 시도 포함)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 첫 재시도 대기 시간 (밀리초)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// 최대 대기 시간 (밀리초)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// 지수 백오프 배수
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    5000
}
fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl RetrySettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// 수수료 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeeConfig {
    /// 추정 방식 (flat: 주문당 고정, rate: 수량 대비 비율)
    #[serde(default = "default_fee_mode")]
    pub mode: String,
    /// flat 모드에서는 자산 단위 금액, rate 모드에서는 비율
    #[serde(default = "default_taker_fee")]
    pub default_taker_fee: Decimal,
}

fn default_fee_mode() -> String {
    "flat".to_string()
}
fn default_taker_fee() -> Decimal {
    dec!(0.05)
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            mode: default_fee_mode(),
            default_taker_fee: default_taker_fee(),
        }
    }
}

impl FeeConfig {
    /// 테이커 수수료 정책으로 변환합니다.
    pub fn policy(&self) -> Result<TakerFeePolicy, config::ConfigError> {
        if self.default_taker_fee < Decimal::ZERO {
            return Err(config::ConfigError::Message(format!(
                "fees.default_taker_fee must not be negative: {}",
                self.default_taker_fee
            )));
        }

        match self.mode.to_lowercase().as_str() {
            "flat" => Ok(TakerFeePolicy::Flat(self.default_taker_fee)),
            "rate" if self.default_taker_fee > Decimal::ONE => Err(config::ConfigError::Message(
                format!(
                    "fees.default_taker_fee must be at most 1 in rate mode: {}",
                    self.default_taker_fee
                ),
            )),
            "rate" => Ok(TakerFeePolicy::Rate(self.default_taker_fee)),
            other => Err(config::ConfigError::Message(format!(
                "Unknown fee mode: {}",
                other
            ))),
        }
    }
}

/// 자격증명 저장소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaultConfig {
    /// 저장소 디렉토리 (키마다 파일 하나)
    #[serde(default = "default_vault_path")]
    pub path: String,
    /// 암호화 마스터 키를 담은 환경 변수 이름 (Base64, 32바이트)
    #[serde(default = "default_encryption_key_env")]
    pub encryption_key_env: String,
}

fn default_vault_path() -> String {
    "./data/vault".to_string()
}
fn default_encryption_key_env() -> String {
    "P2P_VAULT_KEY".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            path: default_vault_path(),
            encryption_key_env: default_encryption_key_env(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }

    /// 값 범위를 검증합니다.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.sync.page_size == 0 {
            return Err(config::ConfigError::Message(
                "sync.page_size must be greater than 0".to_string(),
            ));
        }
        if self.sync.max_pages == 0 {
            return Err(config::ConfigError::Message(
                "sync.max_pages must be greater than 0".to_string(),
            ));
        }
        if self.sync.retry.max_attempts == 0 {
            return Err(config::ConfigError::Message(
                "sync.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.sync.retry.backoff_factor < 1.0 {
            return Err(config::ConfigError::Message(
                "sync.retry.backoff_factor must be at least 1.0".to_string(),
            ));
        }
        self.fees.policy()?;
        Ok(())
    }
}
