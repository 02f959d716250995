//! 进程管道模块 - rtl_fm | multimon-ng
//!
//! 采集进程（rtl_fm）把天线信号解调成原始音频，直接通过管道送入
//! 解码进程（multimon-ng）的 stdin；解码进程的 stdout 即逐行的 FLEX 文本。

use crate::config::{CaptureConfig, DecoderConfig};
use crate::error::{Error, Result};
use crate::infra::process::sweep_stale;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

/// 输出流：解码器 stdout 的行读取器
pub type OutputStream = Box<dyn BufRead + Send>;

/// 可被读取器挂载的管道
///
/// 实例是一次性的：`open` 之后被 `kill` 或读到 EOF 即结束，不再重新打开。
pub trait Pipeline: Send {
    /// 启动管道并返回其输出流
    ///
    /// `kill_existing` 为 true 时先清理系统中残留的同名采集进程。
    fn open(&mut self, kill_existing: bool) -> Result<OutputStream>;

    /// 输出流是否仍可读
    fn is_open(&mut self) -> bool;

    /// 强制终止管道，可重复调用
    fn kill(&mut self);

    /// 用于日志的描述
    fn describe(&self) -> String;
}

/// 一个子进程的启动命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn spawn(&self, stdin: Stdio) -> Result<Child> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                program: self.program.clone(),
                source,
            })?;
        info!(program = %self.program, pid = child.id(), "Spawned process");
        Ok(child)
    }
}

impl From<&CaptureConfig> for CommandLine {
    fn from(config: &CaptureConfig) -> Self {
        Self::new(config.program.clone(), config.args())
    }
}

impl From<&DecoderConfig> for CommandLine {
    fn from(config: &DecoderConfig) -> Self {
        Self::new(config.program.clone(), config.args())
    }
}

/// rtl_fm → multimon-ng 进程管道
pub struct RtlPipeline {
    capture: CommandLine,
    decoder: CommandLine,
    capture_child: Option<Child>,
    decoder_child: Option<Child>,
}

impl RtlPipeline {
    pub fn new(capture: &CaptureConfig, decoder: &DecoderConfig) -> Self {
        Self::from_commands(capture.into(), decoder.into())
    }

    /// 使用任意两条命令组成管道
    pub fn from_commands(capture: CommandLine, decoder: CommandLine) -> Self {
        Self {
            capture,
            decoder,
            capture_child: None,
            decoder_child: None,
        }
    }

    /// 采集进程 PID
    pub fn capture_pid(&self) -> Option<u32> {
        self.capture_child.as_ref().map(Child::id)
    }

    /// 解码进程 PID
    pub fn decoder_pid(&self) -> Option<u32> {
        self.decoder_child.as_ref().map(Child::id)
    }
}

impl Default for RtlPipeline {
    fn default() -> Self {
        Self::new(&CaptureConfig::default(), &DecoderConfig::default())
    }
}

impl Pipeline for RtlPipeline {
    fn open(&mut self, kill_existing: bool) -> Result<OutputStream> {
        if kill_existing {
            sweep_stale(&self.capture.program);
        }
        if self.capture_child.is_some() || self.decoder_child.is_some() {
            warn!("Pipeline opened twice, previous processes are no longer tracked");
        }

        let mut capture = self.capture.spawn(Stdio::null())?;
        let Some(capture_stdout) = capture.stdout.take() else {
            terminate(&mut capture);
            return Err(Error::Io(std::io::Error::other("capture process has no stdout")));
        };

        let mut decoder = match self.decoder.spawn(Stdio::from(capture_stdout)) {
            Ok(child) => child,
            Err(e) => {
                terminate(&mut capture);
                return Err(e);
            }
        };
        let Some(decoder_stdout) = decoder.stdout.take() else {
            terminate(&mut decoder);
            terminate(&mut capture);
            return Err(Error::Io(std::io::Error::other("decoder process has no stdout")));
        };

        self.capture_child = Some(capture);
        self.decoder_child = Some(decoder);
        debug!(capture = ?self.capture_pid(), decoder = ?self.decoder_pid(), "Pipeline running");
        Ok(Box::new(BufReader::new(decoder_stdout)))
    }

    fn is_open(&mut self) -> bool {
        match self.decoder_child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn kill(&mut self) {
        // 解码端被终止后其 stdout 关闭，阻塞中的读取随即返回 EOF
        if let Some(mut child) = self.capture_child.take() {
            terminate(&mut child);
        }
        if let Some(mut child) = self.decoder_child.take() {
            terminate(&mut child);
        }
    }

    fn describe(&self) -> String {
        format!("{} | {}", self.capture.program, self.decoder.program)
    }
}

impl Drop for RtlPipeline {
    fn drop(&mut self) {
        self.kill();
    }
}

/// 强制终止并回收子进程
fn terminate(child: &mut Child) {
    let pid = child.id();
    if let Err(e) = child.kill() {
        // 已退出的进程返回 InvalidInput
        debug!(pid, error = %e, "Kill failed, process probably exited");
    }
    match child.wait() {
        Ok(status) => debug!(pid, %status, "Process reaped"),
        Err(e) => warn!(pid, error = %e, "Failed to reap process"),
    }
}
