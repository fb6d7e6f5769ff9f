//! Binance C2C(P2P) 주문 내역 커넥터.
//!
//! `GET /sapi/v1/c2c/orderMatch/listUserOrderHistory` 서명 요청과
//! 응답 envelope 해석을 담당합니다.

use crate::traits::{ExchangeResult, HistoryPage, OrderHistoryApi, PageQuery};
use crate::ExchangeError;
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use p2p_core::{mask_key, CredentialProfile, ExchangeConfig};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, error, warn};

type HmacSha256 = Hmac<Sha256>;

/// 주문 내역 엔드포인트 경로.
pub const ORDER_HISTORY_PATH: &str = "/sapi/v1/c2c/orderMatch/listUserOrderHistory";

/// API 키 헤더.
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

// ============================================================================
// 설정
// ============================================================================

/// Binance C2C 클라이언트 설정.
///
/// 자격증명은 요청마다 프로필로 전달되므로 설정에는 포함되지 않습니다.
#[derive(Debug, Clone)]
pub struct BinanceP2pConfig {
    /// REST API 기본 URL
    pub rest_base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 수신 윈도우 (밀리초, 0이면 생략)
    pub recv_window: u64,
}

impl Default for BinanceP2pConfig {
    fn default() -> Self {
        Self::from(&ExchangeConfig::default())
    }
}

impl From<&ExchangeConfig> for BinanceP2pConfig {
    fn from(config: &ExchangeConfig) -> Self {
        Self {
            rest_base_url: config.rest_base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            recv_window: config.recv_window_ms,
        }
    }
}

impl BinanceP2pConfig {
    /// 기본 URL을 변경합니다 (mock 서버 등).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.rest_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

// ============================================================================
// 서명
// ============================================================================

/// HMAC-SHA256 요청 서명기.
pub struct BinanceSigner<'a> {
    secret: &'a SecretString,
}

impl<'a> BinanceSigner<'a> {
    pub fn new(secret: &'a SecretString) -> Self {
        Self { secret }
    }

    /// 쿼리 문자열에 대한 hex 인코딩 서명.
    pub fn sign(&self, query: &str) -> ExchangeResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| ExchangeError::Unknown(format!("HMAC 키 생성 실패: {}", e)))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// 파라미터에서 쿼리 문자열 생성.
pub fn build_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// 주문 내역 요청 파라미터를 고정된 순서로 만듭니다.
///
/// `page`, `rows`, [`startTimestamp`, `endTimestamp`], [`recvWindow`], `timestamp`
pub fn history_params(
    query: &PageQuery,
    recv_window: u64,
    timestamp_ms: i64,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", query.page.to_string()),
        ("rows", query.rows.to_string()),
    ];
    if let Some(start) = query.start_time {
        params.push(("startTimestamp", start.to_string()));
    }
    if let Some(end) = query.end_time {
        params.push(("endTimestamp", end.to_string()));
    }
    if recv_window > 0 {
        params.push(("recvWindow", recv_window.to_string()));
    }
    params.push(("timestamp", timestamp_ms.to_string()));
    params
}

// ============================================================================
// API 응답 타입
// ============================================================================

/// 문자열 또는 숫자로 내려오는 필드.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FlexValue {
    Text(String),
    Number(serde_json::Number),
}

impl FlexValue {
    pub fn as_text(&self) -> String {
        match self {
            FlexValue::Text(s) => s.clone(),
            FlexValue::Number(n) => n.to_string(),
        }
    }
}

/// `listUserOrderHistory` 레코드 (API 응답 필드 전체 매핑, 일부만 사용).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrderRecord {
    #[serde(default)]
    pub order_number: Option<FlexValue>,
    #[serde(default)]
    pub adv_no: Option<FlexValue>,
    #[serde(default)]
    pub trade_type: Option<String>,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub fiat: Option<String>,
    #[serde(default)]
    pub fiat_symbol: Option<String>,
    /// 자산 수량
    #[serde(default)]
    pub amount: Option<FlexValue>,
    /// 법정화폐 금액
    #[serde(default)]
    pub total_price: Option<FlexValue>,
    #[serde(default)]
    pub unit_price: Option<FlexValue>,
    #[serde(default)]
    pub order_status: Option<String>,
    /// epoch 밀리초
    #[serde(default)]
    pub create_time: Option<FlexValue>,
    /// 수수료 (자산 단위)
    #[serde(default)]
    pub commission: Option<FlexValue>,
    #[serde(default)]
    pub counter_part_nick_name: Option<String>,
    /// MAKER / TAKER
    #[serde(default)]
    pub advertisement_role: Option<String>,
}

/// C2C 응답 envelope.
#[derive(Debug, Deserialize)]
struct C2cEnvelope {
    #[serde(default)]
    code: Option<FlexValue>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    success: Option<bool>,
}

/// 게이트웨이 에러 응답 (`{"code": -1022, "msg": "..."}`).
#[derive(Debug, Deserialize)]
struct BinanceError {
    code: i64,
    msg: String,
}

/// Binance 에러 코드를 ExchangeError로 매핑.
pub fn map_error_code(code: i64, msg: &str) -> ExchangeError {
    match code {
        -1002 | -1022 | -2008 | -2014 | -2015 => ExchangeError::Unauthorized(msg.to_string()),
        -1021 => ExchangeError::TimestampError(msg.to_string()),
        -1003 => ExchangeError::RateLimited,
        -1001 => ExchangeError::NetworkError(msg.to_string()),
        _ => ExchangeError::ApiError {
            code,
            message: msg.to_string(),
        },
    }
}

/// HTTP 상태와 본문으로 응답을 해석합니다.
pub fn parse_history_response(status: StatusCode, body: &str) -> ExchangeResult<HistoryPage> {
    if !status.is_success() {
        let code = status.as_u16();
        if code == 418 || code == 429 {
            return Err(ExchangeError::RateLimited);
        }
        if status.is_server_error() {
            return Err(ExchangeError::ServerError {
                status: code,
                message: body.chars().take(200).collect(),
            });
        }
        let parsed = serde_json::from_str::<BinanceError>(body).ok();
        if code == 401 || code == 403 {
            let msg = parsed.map(|e| e.msg).unwrap_or_else(|| format!("HTTP {}", code));
            return Err(ExchangeError::Unauthorized(msg));
        }
        if let Some(error) = parsed {
            return Err(map_error_code(error.code, &error.msg));
        }
        return Err(ExchangeError::ApiError {
            code: code as i64,
            message: body.chars().take(200).collect(),
        });
    }

    let envelope: C2cEnvelope = serde_json::from_str(body).map_err(|e| {
        error!(error = %e, "Failed to parse order history envelope");
        ExchangeError::MalformedPayload(e.to_string())
    })?;

    if envelope.success == Some(false) {
        let message = envelope.message.unwrap_or_default();
        let code = envelope
            .code
            .as_ref()
            .and_then(|c| c.as_text().parse::<i64>().ok());
        return Err(match code {
            Some(code) => map_error_code(code, &message),
            None => ExchangeError::ApiError { code: 0, message },
        });
    }

    let records = match envelope.data {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(serde_json::Value::Array(records)) => records,
        Some(other) => {
            return Err(ExchangeError::MalformedPayload(format!(
                "data is not an array: {}",
                json_type_name(&other)
            )))
        }
    };

    Ok(HistoryPage {
        records,
        total: envelope.total,
    })
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ============================================================================
// 클라이언트
// ============================================================================

/// Binance C2C 주문 내역 클라이언트.
pub struct BinanceP2pClient {
    config: BinanceP2pConfig,
    client: Client,
}

impl BinanceP2pClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: BinanceP2pConfig) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ExchangeError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e))
            })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BinanceP2pConfig {
        &self.config
    }
}

#[async_trait]
impl OrderHistoryApi for BinanceP2pClient {
    fn name(&self) -> &str {
        "binance-c2c"
    }

    async fn fetch_page(
        &self,
        credentials: &CredentialProfile,
        query: &PageQuery,
    ) -> ExchangeResult<HistoryPage> {
        let params = history_params(query, self.config.recv_window, Utc::now().timestamp_millis());
        let query_string = build_query(&params);
        let signature = BinanceSigner::new(credentials.private_key()).sign(&query_string)?;
        let url = format!(
            "{}{}?{}&signature={}",
            self.config.rest_base_url, ORDER_HISTORY_PATH, query_string, signature
        );

        debug!(
            page = query.page,
            rows = query.rows,
            api_key = %mask_key(&credentials.public_key),
            "GET (signed) {}",
            ORDER_HISTORY_PATH
        );

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &credentials.public_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let result = parse_history_response(status, &body);

        match &result {
            Ok(page) => debug!(page = query.page, records = page.records.len(), "Page received"),
            Err(e) => warn!(page = query.page, status = status.as_u16(), error = %e, "Page request failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign() {
        let secret = SecretString::from(
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".to_string(),
        );
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";

        assert_eq!(
            BinanceSigner::new(&secret).sign(query).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_history_params_order() {
        let query = PageQuery {
            page: 2,
            rows: 100,
            start_time: Some(1_700_000_000_000),
            end_time: Some(1_700_086_400_000),
        };
        let params = history_params(&query, 5000, 1_700_100_000_000);
        assert_eq!(
            build_query(&params),
            "page=2&rows=100&startTimestamp=1700000000000&endTimestamp=1700086400000&recvWindow=5000&timestamp=1700100000000"
        );

        let params = history_params(&PageQuery::new(1, 50), 0, 42);
        assert_eq!(build_query(&params), "page=1&rows=50&timestamp=42");
    }

    #[test]
    fn test_map_error_code() {
        for code in [-1002, -1022, -2008, -2014, -2015] {
            assert!(map_error_code(code, "denied").is_auth_error());
        }
        assert!(matches!(
            map_error_code(-1021, "ahead"),
            ExchangeError::TimestampError(_)
        ));
        assert!(matches!(
            map_error_code(-1100, "bad param"),
            ExchangeError::ApiError { code: -1100, .. }
        ));
    }

    #[test]
    fn test_parse_success_envelope() {
        let body = r#"{"code":"000000","message":"success","data":[{"orderNumber":"1"}],"total":1,"success":true}"#;
        let page = parse_history_response(StatusCode::OK, body).unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total, Some(1));
    }

    #[test]
    fn test_parse_null_data_is_empty_page() {
        let body = r#"{"code":"000000","message":"success","data":null,"success":true}"#;
        let page = parse_history_response(StatusCode::OK, body).unwrap();
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_parse_error_responses() {
        let err = parse_history_response(
            StatusCode::BAD_REQUEST,
            r#"{"code":-1022,"msg":"Signature for this request is not valid."}"#,
        )
        .unwrap_err();
        assert!(err.is_auth_error());

        let err = parse_history_response(StatusCode::UNAUTHORIZED, "").unwrap_err();
        assert!(err.is_auth_error());

        let err = parse_history_response(StatusCode::TOO_MANY_REQUESTS, "").unwrap_err();
        assert!(matches!(err, ExchangeError::RateLimited));

        let err = parse_history_response(StatusCode::BAD_GATEWAY, "<html>").unwrap_err();
        assert!(matches!(err, ExchangeError::ServerError { status: 502, .. }));

        let err = parse_history_response(
            StatusCode::OK,
            r#"{"code":"-1021","message":"Timestamp outside recvWindow","success":false}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ExchangeError::TimestampError(_)));
    }

    #[test]
    fn test_parse_malformed_payload() {
        let err = parse_history_response(StatusCode::OK, "not json").unwrap_err();
        assert!(err.is_malformed());

        let err =
            parse_history_response(StatusCode::OK, r#"{"success":true,"data":{"a":1}}"#).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_raw_record_accepts_numbers_and_strings() {
        let record: RawOrderRecord = serde_json::from_str(
            r#"{"orderNumber":20000000001,"tradeType":"BUY","amount":"100.5","totalPrice":140700,"createTime":1700000000000}"#,
        )
        .unwrap();
        assert_eq!(record.order_number.unwrap().as_text(), "20000000001");
        assert_eq!(record.amount.unwrap().as_text(), "100.5");
        assert_eq!(record.total_price.unwrap().as_text(), "140700");
        assert!(record.commission.is_none());
    }
}
