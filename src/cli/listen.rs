// src/cli/listen.rs
//! Listen / Replay 命令 - 挂载管道并打印解码出的消息
//!
//! 读取循环在阻塞线程上运行；Ctrl-C 被转换为 detach，
//! 子进程被终止后循环读到 EOF 正常退出。

use super::output::MessagePrinter;
use crate::config::Config;
use crate::infra::{Pipeline, ReplayPipeline, RtlPipeline};
use crate::reader::{FilteringHandler, LineHandler, ReadStats, Reader, ReaderState};
use anyhow::{Context, Result};
use clap::Args;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// 中断后检查读取器是否仍挂载的间隔
const DETACH_RETRY: Duration = Duration::from_millis(100);

/// Listen 命令参数
#[derive(Args)]
pub struct ListenArgs {
    /// 启动前不清理残留的 rtl_fm 进程
    #[arg(long)]
    pub no_kill: bool,

    /// 每条消息输出一行 JSON
    #[arg(long)]
    pub json: bool,

    /// 同时输出被黑名单屏蔽的消息（带标记）
    #[arg(long)]
    pub show_suppressed: bool,
}

/// Replay 命令参数
#[derive(Args)]
pub struct ReplayArgs {
    /// 录制的 multimon-ng 输出文件
    pub file: PathBuf,

    /// 每条消息输出一行 JSON
    #[arg(long)]
    pub json: bool,

    /// 同时输出被黑名单屏蔽的消息（带标记）
    #[arg(long)]
    pub show_suppressed: bool,
}

/// 一次运行的汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: ReadStats,
    /// 被黑名单丢弃、未输出的消息数
    pub suppressed: usize,
}

impl RunSummary {
    /// 实际输出的消息数
    pub fn printed(&self) -> usize {
        self.stats.delivered.saturating_sub(self.suppressed)
    }
}

/// 处理 listen 命令
pub async fn handle_listen(args: ListenArgs, config: &Config) -> Result<()> {
    let pipeline = RtlPipeline::new(&config.capture, &config.decoder);
    let summary = dispatch(pipeline, !args.no_kill, config, args.json, args.show_suppressed).await?;
    eprintln!(
        "监听结束: {} 行, 输出 {} 条消息, 屏蔽 {} 条",
        summary.stats.lines,
        summary.printed(),
        summary.suppressed
    );
    Ok(())
}

/// 处理 replay 命令
pub async fn handle_replay(args: ReplayArgs, config: &Config) -> Result<()> {
    if !args.file.exists() {
        anyhow::bail!("回放文件不存在: {}", args.file.display());
    }
    let pipeline = ReplayPipeline::new(&args.file);
    let summary = dispatch(pipeline, false, config, args.json, args.show_suppressed).await?;
    eprintln!(
        "回放结束: {} 行, 输出 {} 条消息, 屏蔽 {} 条, 跳过 {} 行",
        summary.stats.lines,
        summary.printed(),
        summary.suppressed,
        summary.stats.skipped
    );
    Ok(())
}

async fn dispatch<P>(pipeline: P, kill_existing: bool, config: &Config, json: bool, show_suppressed: bool) -> Result<RunSummary>
where
    P: Pipeline + 'static,
{
    let printer = MessagePrinter::new(json);
    if show_suppressed {
        let (stats, _) = run_reader(pipeline, kill_existing, Reader::from_config(printer, config)).await?;
        Ok(RunSummary { stats, suppressed: 0 })
    } else {
        let reader = Reader::from_config(FilteringHandler::new(printer), config);
        let (stats, handler) = run_reader(pipeline, kill_existing, reader).await?;
        Ok(RunSummary {
            stats,
            suppressed: handler.suppressed(),
        })
    }
}

/// 在阻塞线程上运行读取器，Ctrl-C 时 detach；返回统计与回调
pub async fn run_reader<P, H>(pipeline: P, kill_existing: bool, reader: Reader<H>) -> Result<(ReadStats, H)>
where
    P: Pipeline + 'static,
    H: LineHandler + Send + 'static,
{
    run_reader_until(pipeline, kill_existing, reader, tokio::signal::ctrl_c).await
}

/// 同 [`run_reader`]，中断来源由调用方提供
///
/// 中断可能早于管道登记到读取器；此后只要读取器仍处于挂载状态就再次 detach，
/// 直到读取线程退出。
pub async fn run_reader_until<P, H, F, Fut>(
    pipeline: P,
    kill_existing: bool,
    reader: Reader<H>,
    mut interrupt: F,
) -> Result<(ReadStats, H)>
where
    P: Pipeline + 'static,
    H: LineHandler + Send + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let handle = reader.handle();
    let mut task = tokio::task::spawn_blocking(move || -> crate::Result<(ReadStats, H)> {
        let stats = reader.attach(pipeline, kill_existing)?;
        Ok((stats, reader.into_handler()))
    });

    let mut interrupted = false;
    let mut retry = tokio::time::interval(DETACH_RETRY);
    let joined = loop {
        tokio::select! {
            joined = &mut task => break joined,
            signal = interrupt() => {
                signal.context("无法监听 Ctrl-C")?;
                info!("Interrupted, detaching");
                interrupted = true;
                handle.detach();
            }
            _ = retry.tick(), if interrupted => {
                if handle.state() == ReaderState::Attached {
                    debug!("Pipeline attached after interrupt, detaching");
                    handle.detach();
                }
            }
        }
    };

    let (stats, handler) = joined.context("读取线程异常退出")??;
    info!(lines = stats.lines, delivered = stats.delivered, skipped = stats.skipped, "Reader finished");
    Ok((stats, handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blacklist::Blacklist;
    use crate::infra::CommandLine;
    use crate::message::Message;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_run_reader_over_replay() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "FLEX 184600000 2 W 5 [1234567] ALM ALPHA TEST MESSAGE").unwrap();
        writeln!(file, "FLEX 184600001 2 W 5 [0101001] A1 Dorpsstraat").unwrap();

        let config = Config::from_json(r#"{"blacklist": {"monitorcodes": ["1234567"]}}"#).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |message: Message, _: &Blacklist| -> anyhow::Result<()> {
            sink.lock().unwrap().push(message.monitor_code().to_string());
            Ok(())
        };
        let reader = Reader::from_config(FilteringHandler::new(handler), &config);

        let (stats, handler) = run_reader(ReplayPipeline::new(file.path()), false, reader).await.unwrap();
        assert_eq!(stats.lines, 2);
        assert_eq!(handler.suppressed(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["0101001"]);
    }

    #[tokio::test]
    async fn test_summary_excludes_suppressed_messages() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "FLEX 184600000 2 W 5 [1234567] ALM ALPHA TEST MESSAGE").unwrap();
        writeln!(file, "FLEX 184600001 2 W 5 [0101001] A1 Dorpsstraat").unwrap();
        writeln!(file, "FLEX 184600002 2 W 5 [0101002] A2 Kerkstraat").unwrap();
        let config = Config::from_json(r#"{"blacklist": {"monitorcodes": ["1234567"]}}"#).unwrap();

        let filtered = dispatch(ReplayPipeline::new(file.path()), false, &config, true, false).await.unwrap();
        assert_eq!(filtered.stats.delivered, 3);
        assert_eq!(filtered.suppressed, 1);
        assert_eq!(filtered.printed(), 2);

        let unfiltered = dispatch(ReplayPipeline::new(file.path()), false, &config, true, true).await.unwrap();
        assert_eq!(unfiltered.suppressed, 0);
        assert_eq!(unfiltered.printed(), 3);
    }

    #[tokio::test]
    async fn test_interrupt_before_attach_still_stops_reader() {
        // 中断在读取线程登记管道之前就已到达
        let notify = Arc::new(Notify::new());
        notify.notify_one();
        let interrupt = {
            let notify = Arc::clone(&notify);
            move || {
                let notify = Arc::clone(&notify);
                async move {
                    notify.notified().await;
                    Ok::<(), std::io::Error>(())
                }
            }
        };
        let pipeline = RtlPipeline::from_commands(
            CommandLine::new("sh", ["-c", "sleep 0.3; exec sleep 30"]),
            CommandLine::new("cat", Vec::<String>::new()),
        );
        let reader = Reader::new(|_: Message, _: &Blacklist| -> anyhow::Result<()> { Ok(()) }, Blacklist::default());

        let run = run_reader_until(pipeline, false, reader, interrupt);
        let (stats, _) = tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("reader should stop after interrupt")
            .unwrap();
        assert_eq!(stats.lines, 0);
    }

    #[tokio::test]
    async fn test_replay_missing_file() {
        let config = Config::from_json(r#"{"blacklist": {}}"#).unwrap();
        let args = ReplayArgs {
            file: PathBuf::from("/nonexistent/p2000.log"),
            json: false,
            show_suppressed: false,
        };
        assert!(handle_replay(args, &config).await.is_err());
    }
}
