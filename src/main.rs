use std::path::PathBuf;

use anyhow::{Context, Result};
use bulk_sender::app::{Application, SendOptions};
use bulk_sender_core::AppConfig;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("bulk-sender")
        .version("1.0.0")
        .about("批量消息发送工具")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .global(true),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .global(true),
        )
        .subcommand(Command::new("status").about("查询消息通道连接状态"))
        .subcommand(Command::new("disconnect").about("断开消息通道"))
        .subcommand(
            Command::new("send")
                .about("向收件人列表批量发送消息")
                .arg(
                    Arg::new("recipients")
                        .short('r')
                        .long("recipients")
                        .value_name("FILE")
                        .help("收件人文件 (.json行数组或每行一个号码)")
                        .value_parser(value_parser!(PathBuf))
                        .required(true),
                )
                .arg(
                    Arg::new("message")
                        .short('m')
                        .long("message")
                        .value_name("TEXT")
                        .help("消息文本"),
                )
                .arg(
                    Arg::new("media")
                        .long("media")
                        .value_name("FILE")
                        .help("媒体文件，可重复指定")
                        .value_parser(value_parser!(PathBuf))
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .value_name("FILE")
                        .help("会话报告输出路径 (JSON)")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .get_matches();

    // 加载配置
    let config_path = matches.get_one::<String>("config").map(String::as_str);
    let config = AppConfig::load(config_path)
        .with_context(|| format!("加载配置失败: {}", config_path.unwrap_or("<默认路径>")))?;

    // 命令行参数优先于配置文件
    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| config.observability.log_level.clone());
    let log_format = matches
        .get_one::<String>("log-format")
        .cloned()
        .unwrap_or_else(|| config.observability.log_format.clone());

    // 初始化日志系统
    init_logging(&log_level, &log_format)?;

    let app = Application::new(config)?;

    match matches.subcommand() {
        Some(("status", _)) => {
            let state = app.status().await?;
            println!("连接状态: {state}");
            if let Some(qr_code) = state.qr_code().filter(|qr| !qr.is_empty()) {
                println!("请扫描二维码完成配对:");
                println!("{qr_code}");
            }
        }
        Some(("disconnect", _)) => {
            if app.disconnect().await {
                println!("消息通道已断开");
            } else {
                println!("断开请求未被确认，请稍后查询状态");
            }
        }
        Some(("send", sub_matches)) => run_send(&app, sub_matches).await?,
        Some((name, _)) => return Err(anyhow::anyhow!("不支持的子命令: {name}")),
        None => return Err(anyhow::anyhow!("缺少子命令")),
    }

    Ok(())
}

async fn run_send(app: &Application, matches: &ArgMatches) -> Result<()> {
    let options = SendOptions {
        recipients: matches
            .get_one::<PathBuf>("recipients")
            .cloned()
            .context("缺少收件人文件")?,
        message: matches.get_one::<String>("message").cloned(),
        media: matches
            .get_many::<PathBuf>("media")
            .map(|paths| paths.cloned().collect())
            .unwrap_or_default(),
        report: matches.get_one::<PathBuf>("report").cloned(),
    };

    let cancel = CancellationToken::new();
    let signal_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            warn!("收到关闭信号，取消剩余发送...");
            cancel.cancel();
        })
    };

    let result = app.send(&options, cancel).await;
    signal_handle.abort();
    let report = result?;

    println!("会话ID: {}", report.session_id);
    println!("状态: {:?}", report.phase);
    println!("成功: {}", report.results.success_count());
    println!("失败: {}", report.results.failed_count());
    println!("未尝试: {}", report.results.not_attempted_count());
    for record in &report.results.failed {
        println!("  {} - {}", record.recipient, record.reason().unwrap_or("未知原因"));
    }

    info!("批量发送结束");
    Ok(())
}

/// 初始化日志系统
fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("安装Ctrl+C信号处理器失败");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("安装SIGTERM信号处理器失败")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
