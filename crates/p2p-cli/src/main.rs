//! P2P 주문 내역 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 프로필 저장
//! p2p profile save --name main --api-key <KEY> --secret-key <SECRET>
//!
//! # 프로필 목록
//! p2p profile list
//!
//! # 전체 주문 내역 동기화
//! p2p sync --profile main
//!
//! # 기간 지정 + 정산 요약만 출력
//! p2p sync --profile main --start-time 1700000000000 --summary
//!
//! # 저장소 암호화 키 생성
//! p2p keygen
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use p2p_cli::commands::profile::{
    edit_profile, list_profiles, remove_profile, save_profile, show_profile, ProfileEdit,
};
use p2p_cli::commands::sync::{build_engine, parse_window, render_report, sync_profile};
use p2p_cli::commands::vault::open_vault;
use p2p_core::{generate_master_key, init_logging, AppConfig};
use p2p_exchange::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "p2p")]
#[command(about = "Binance P2P 주문 내역 동기화 및 정산 도구", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// API 자격증명 프로필 관리
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// 주문 내역 동기화
    Sync {
        /// 사용할 프로필 이름
        #[arg(short, long)]
        profile: String,

        /// 조회 시작 시각 (밀리초 타임스탬프)
        #[arg(long)]
        start_time: Option<i64>,

        /// 조회 종료 시각 (밀리초 타임스탬프)
        #[arg(long)]
        end_time: Option<i64>,

        /// 주문 목록 대신 정산 요약만 출력
        #[arg(long, default_value = "false")]
        summary: bool,
    },

    /// 저장소 암호화용 마스터 키 생성 (Base64)
    Keygen,
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// 프로필 저장 (같은 이름이면 덮어씀)
    Save {
        #[arg(short, long)]
        name: String,

        /// API 키
        #[arg(long)]
        api_key: String,

        /// 시크릿 키
        #[arg(long)]
        secret_key: String,
    },

    /// 저장된 프로필의 키 변경
    Edit {
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        secret_key: Option<String>,
    },

    /// 프로필 목록
    List,

    /// 프로필 조회 (API 키는 가려서 출력)
    Show { name: String },

    /// 프로필 삭제
    Remove { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("설정 파일 로드 실패: {}", cli.config))?;
    init_logging(config.logging.resolve()).map_err(|e| anyhow!("로깅 초기화 실패: {}", e))?;

    match cli.command {
        Commands::Profile { action } => {
            let vault = open_vault(&config.vault)?;

            match action {
                ProfileCommand::Save {
                    name,
                    api_key,
                    secret_key,
                } => {
                    let view = save_profile(&vault, &name, &api_key, &secret_key).await?;
                    println!("{}", serde_json::to_string_pretty(&view)?);
                }
                ProfileCommand::Edit {
                    name,
                    api_key,
                    secret_key,
                } => {
                    if api_key.is_none() && secret_key.is_none() {
                        return Err(anyhow!("--api-key 또는 --secret-key 중 하나는 필요합니다"));
                    }
                    let edit = ProfileEdit {
                        api_key,
                        secret_key,
                    };
                    let view = edit_profile(&vault, &name, edit).await?;
                    println!("{}", serde_json::to_string_pretty(&view)?);
                }
                ProfileCommand::List => {
                    let views = list_profiles(&vault).await?;
                    println!("{}", serde_json::to_string_pretty(&views)?);
                }
                ProfileCommand::Show { name } => {
                    let view = show_profile(&vault, &name).await?;
                    println!("{}", serde_json::to_string_pretty(&view)?);
                }
                ProfileCommand::Remove { name } => {
                    remove_profile(&vault, &name).await?;
                    println!("프로필 삭제됨: {}", name);
                }
            }
        }

        Commands::Sync {
            profile,
            start_time,
            end_time,
            summary,
        } => {
            let window = parse_window(start_time, end_time)?;
            let vault = open_vault(&config.vault)?;
            let engine = build_engine(&config)?;

            let cancel = CancellationToken::new();
            let signal_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling sync");
                    signal_token.cancel();
                }
            });

            info!(profile = %profile, "Starting order sync");
            match sync_profile(&vault, &engine, &profile, window, &cancel).await {
                Ok(report) => println!("{}", render_report(&report, summary)?),
                Err(e) => {
                    error!("Sync failed: {:#}", e);
                    return Err(e);
                }
            }
        }

        Commands::Keygen => {
            println!("{}", generate_master_key());
        }
    }

    Ok(())
}
