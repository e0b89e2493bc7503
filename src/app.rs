use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bulk_sender_core::{
    AppConfig, ConnectionState, DispatchProgress, MessagePayload, MessagingChannel, Recipient,
    SessionReport,
};
use bulk_sender_dispatcher::{
    DispatchRequest, DispatchWorker, MediaUploader, RetryPolicy, SessionOrchestrator,
    StatusPoller,
};
use bulk_sender_infrastructure::{load_recipients, HttpChannel};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// `send` 子命令参数
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub recipients: PathBuf,
    pub message: Option<String>,
    pub media: Vec<PathBuf>,
    /// 会话报告输出路径
    pub report: Option<PathBuf>,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    channel: Arc<dyn MessagingChannel>,
}

impl Application {
    /// 使用HTTP消息通道创建应用实例
    pub fn new(config: AppConfig) -> Result<Self> {
        let channel = HttpChannel::new(&config.channel).context("创建消息通道客户端失败")?;
        info!("消息通道地址: {}", channel.base_url());
        Ok(Self::with_channel(config, Arc::new(channel)))
    }

    pub fn with_channel(config: AppConfig, channel: Arc<dyn MessagingChannel>) -> Self {
        Self { config, channel }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 查询当前连接状态
    pub async fn status(&self) -> Result<ConnectionState> {
        let status = self
            .channel
            .get_status()
            .await
            .context("查询消息通道状态失败")?;
        Ok(status.connection_state())
    }

    /// 注销消息通道，失败时仅记录日志
    pub async fn disconnect(&self) -> bool {
        StatusPoller::new(Arc::clone(&self.channel), self.config.status.poll_interval())
            .disconnect()
            .await
    }

    /// 执行一次批量发送会话
    ///
    /// 会话期间后台轮询通道状态；取消令牌触发后剩余收件人记为未尝试。
    pub async fn send(
        &self,
        options: &SendOptions,
        cancel: CancellationToken,
    ) -> Result<SessionReport> {
        let recipients = load_recipients(&options.recipients)
            .await
            .with_context(|| format!("加载收件人失败: {}", options.recipients.display()))?;

        let poller = Arc::new(StatusPoller::new(
            Arc::clone(&self.channel),
            self.config.status.poll_interval(),
        ));
        poller.poll().await;

        let poller_cancel = cancel.child_token();
        let poller_handle = Arc::clone(&poller).spawn(poller_cancel.clone());

        let result = self.dispatch(&poller, recipients, options, &cancel).await;

        poller_cancel.cancel();
        if let Err(e) = poller_handle.await {
            warn!("状态轮询任务异常退出: {e}");
        }

        let report = result?;
        if let Some(path) = &options.report {
            write_report(path, &report).await?;
        }

        Ok(report)
    }

    async fn dispatch(
        &self,
        poller: &StatusPoller,
        recipients: Vec<Recipient>,
        options: &SendOptions,
        cancel: &CancellationToken,
    ) -> Result<SessionReport> {
        let policy = RetryPolicy::from_config(&self.config.retry);

        // 没有收件人或通道未连接时不上传媒体，由会话给出中止原因
        let media = if recipients.is_empty() || !poller.current().is_connected() {
            Vec::new()
        } else {
            MediaUploader::new(
                Arc::clone(&self.channel),
                policy.clone(),
                self.config.media.max_media_bytes,
            )
            .upload_all(&options.media, cancel)
            .await?
        };

        let orchestrator = SessionOrchestrator::new(
            poller.gate(),
            DispatchWorker::new(Arc::clone(&self.channel), policy),
            self.config.dispatch.clone(),
        );
        let progress_handle = spawn_progress_logger(orchestrator.subscribe());

        let payload = MessagePayload::new(options.message.clone(), media);
        let result = orchestrator
            .run(DispatchRequest::new(recipients, payload), cancel.clone())
            .await;

        progress_handle.abort();
        Ok(result?)
    }
}

fn spawn_progress_logger(mut rx: watch::Receiver<DispatchProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_percent = None;
        while rx.changed().await.is_ok() {
            let progress = rx.borrow_and_update().clone();
            if last_percent != Some(progress.percent) && progress.total > 0 {
                info!(
                    "发送进度: {}% ({}/{}, 成功 {}, 失败 {})",
                    progress.percent,
                    progress.completed,
                    progress.total,
                    progress.succeeded,
                    progress.failed
                );
                last_percent = Some(progress.percent);
            }
            if progress.phase.is_terminal() {
                break;
            }
        }
    })
}

async fn write_report(path: &Path, report: &SessionReport) -> Result<()> {
    let json = serde_json::to_vec_pretty(report).context("序列化会话报告失败")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("写入会话报告失败: {}", path.display()))?;
    info!("会话报告已写入: {}", path.display());
    Ok(())
}
