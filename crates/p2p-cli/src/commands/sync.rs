//! 주문 내역 동기화 명령.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use p2p_core::AppConfig;
use p2p_exchange::{
    BinanceP2pClient, BinanceP2pConfig, CancellationToken, OrderHistoryApi, OrderSyncEngine,
    SyncOptions, SyncReport, SyncWindow,
};
use p2p_vault::{CredentialStore, CredentialVault};
use tracing::info;

/// 설정으로 Binance 동기화 엔진을 만듭니다.
pub fn build_engine(config: &AppConfig) -> Result<OrderSyncEngine<BinanceP2pClient>> {
    let client = BinanceP2pClient::new(BinanceP2pConfig::from(&config.exchange))
        .context("HTTP 클라이언트 생성 실패")?;
    let options = SyncOptions::from_config(config)?;
    Ok(OrderSyncEngine::new(client, options))
}

/// 밀리초 타임스탬프 두 개로 조회 기간을 만듭니다.
pub fn parse_window(start_ms: Option<i64>, end_ms: Option<i64>) -> Result<SyncWindow> {
    let start = start_ms.map(millis_to_utc).transpose()?;
    let end = end_ms.map(millis_to_utc).transpose()?;

    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(anyhow!("시작 시각이 종료 시각보다 늦습니다"));
        }
    }
    Ok(SyncWindow { start, end })
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| anyhow!("잘못된 타임스탬프: {}", ms))
}

/// 저장된 프로필로 동기화를 실행합니다.
pub async fn sync_profile<S, A>(
    vault: &CredentialVault<S>,
    engine: &OrderSyncEngine<A>,
    name: &str,
    window: SyncWindow,
    cancel: &CancellationToken,
) -> Result<SyncReport>
where
    S: CredentialStore,
    A: OrderHistoryApi,
{
    let profile = vault
        .retrieve(name)
        .await
        .with_context(|| format!("프로필 '{}' 조회 실패", name))?;

    let report = engine.sync_window(&profile, window, cancel).await?;
    info!(
        profile = %name,
        orders = report.orders.len(),
        anomalies = report.anomalies.len(),
        partial = report.is_partial(),
        "Sync complete"
    );
    Ok(report)
}

/// 결과를 JSON으로 만듭니다. `summary_only`면 정산 요약만 출력합니다.
pub fn render_report(report: &SyncReport, summary_only: bool) -> Result<String> {
    let json = if summary_only {
        let summary = report.summary().context("정산 요약 계산 실패")?;
        serde_json::to_string_pretty(&serde_json::json!({
            "summary": summary,
            "anomalies": report.anomalies,
            "partial": report.is_partial(),
        }))?
    } else {
        serde_json::to_string_pretty(report)?
    };
    Ok(json)
}
