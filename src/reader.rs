//! 读取器模块 - 挂载管道、逐行解析并分发给消费者
//!
//! 同一时刻最多持有一条活动管道。`attach` 会同步进入读取循环，
//! 直到输出流结束、处理出错或被其他线程 `detach`；无论哪种方式退出，
//! 循环结束前都会恰好执行一次 detach，保证子进程不泄漏。

use crate::blacklist::Blacklist;
use crate::config::{Config, MalformedLinePolicy};
use crate::error::{Error, Result};
use crate::infra::pipeline::{OutputStream, Pipeline};
use crate::message::{Message, ParseOptions};
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// 消费者回调
///
/// 是否检查黑名单由回调自行决定，循环本身不做过滤。
pub trait LineHandler {
    fn handle(&mut self, message: Message, blacklist: &Blacklist) -> anyhow::Result<()>;
}

impl<F> LineHandler for F
where
    F: FnMut(Message, &Blacklist) -> anyhow::Result<()>,
{
    fn handle(&mut self, message: Message, blacklist: &Blacklist) -> anyhow::Result<()> {
        self(message, blacklist)
    }
}

/// 记录并丢弃被屏蔽的消息，其余转交给内部回调
pub struct FilteringHandler<H> {
    inner: H,
    suppressed: usize,
}

impl<H: LineHandler> FilteringHandler<H> {
    pub fn new(inner: H) -> Self {
        Self { inner, suppressed: 0 }
    }

    /// 已丢弃的消息数
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }
}

impl<H: LineHandler> LineHandler for FilteringHandler<H> {
    fn handle(&mut self, message: Message, blacklist: &Blacklist) -> anyhow::Result<()> {
        if blacklist.is_suppressed(&message) {
            debug!(
                monitor_code = message.monitor_code(),
                payload = message.payload(),
                "Suppressed blacklisted message"
            );
            self.suppressed += 1;
            return Ok(());
        }
        self.inner.handle(message, blacklist)
    }
}

/// 读取器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Detached,
    Attached,
}

/// 一次挂载的读取统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// 读到的行数
    pub lines: usize,
    /// 交给回调的消息数
    pub delivered: usize,
    /// 按 Skip 策略跳过的行数
    pub skipped: usize,
}

/// 连接槽：持有当前管道及其挂载代次
#[derive(Default)]
struct Slot {
    generation: u64,
    pipeline: Option<Box<dyn Pipeline>>,
}

fn lock_slot(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 可跨线程使用的 detach 句柄
#[derive(Clone)]
pub struct ReaderHandle {
    slot: Arc<Mutex<Slot>>,
}

impl ReaderHandle {
    /// 终止并释放当前管道；未挂载时为空操作
    pub fn detach(&self) {
        let pipeline = lock_slot(&self.slot).pipeline.take();
        if let Some(mut pipeline) = pipeline {
            info!(pipeline = %pipeline.describe(), "Detaching");
            pipeline.kill();
        }
    }

    pub fn state(&self) -> ReaderState {
        if lock_slot(&self.slot).pipeline.is_some() {
            ReaderState::Attached
        } else {
            ReaderState::Detached
        }
    }
}

/// 循环退出时释放本次挂载的管道（含 panic 路径）
struct AttachGuard<'a> {
    slot: &'a Mutex<Slot>,
    generation: u64,
}

impl Drop for AttachGuard<'_> {
    fn drop(&mut self) {
        let mut slot = lock_slot(self.slot);
        // 管道已被外部 detach 或被更新的挂载替换时不再处理
        if slot.generation != self.generation {
            return;
        }
        if let Some(mut pipeline) = slot.pipeline.take() {
            info!(pipeline = %pipeline.describe(), "Detaching");
            pipeline.kill();
        }
    }
}

/// 解码流读取器
pub struct Reader<H> {
    handler: Mutex<H>,
    blacklist: Blacklist,
    options: ParseOptions,
    on_malformed: MalformedLinePolicy,
    slot: Arc<Mutex<Slot>>,
}

impl<H: LineHandler> Reader<H> {
    pub fn new(handler: H, blacklist: Blacklist) -> Self {
        Self {
            handler: Mutex::new(handler),
            blacklist,
            options: ParseOptions::default(),
            on_malformed: MalformedLinePolicy::default(),
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// 按配置构造：黑名单、解析选项、畸形行策略
    pub fn from_config(handler: H, config: &Config) -> Self {
        Self::new(handler, Blacklist::from_config(&config.blacklist))
            .with_parse_options(config.reader.parse_options())
            .with_malformed_policy(config.reader.on_malformed)
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_malformed_policy(mut self, policy: MalformedLinePolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    /// 获取可在其他线程调用 detach 的句柄
    pub fn handle(&self) -> ReaderHandle {
        ReaderHandle {
            slot: Arc::clone(&self.slot),
        }
    }

    pub fn state(&self) -> ReaderState {
        self.handle().state()
    }

    /// 按读取器的解析选项构造消息
    pub fn create_line(&self, raw: &[u8]) -> Result<Message> {
        Message::from_bytes(raw, &self.options)
    }

    /// 挂载管道并同步运行读取循环
    ///
    /// 已持有仍可读的管道时返回 [`Error::AlreadyAttached`]，原管道不受影响。
    /// 循环正常结束（EOF 或被 detach）时返回读取统计。
    pub fn attach<P>(&self, pipeline: P, kill_existing: bool) -> Result<ReadStats>
    where
        P: Pipeline + 'static,
    {
        let (stream, generation) = self.connect(Box::new(pipeline), kill_existing)?;
        let _guard = AttachGuard {
            slot: &self.slot,
            generation,
        };
        self.read_loop(stream)
    }

    /// 终止并释放当前管道，可重复调用
    pub fn detach(&self) {
        self.handle().detach();
    }

    /// 在持有槽锁的情况下检查、打开并登记管道
    fn connect(&self, mut pipeline: Box<dyn Pipeline>, kill_existing: bool) -> Result<(OutputStream, u64)> {
        let mut slot = lock_slot(&self.slot);

        if let Some(held) = slot.pipeline.as_mut() {
            if held.is_open() {
                return Err(Error::AlreadyAttached);
            }
            debug!(pipeline = %held.describe(), "Replacing closed pipeline");
            held.kill();
            slot.pipeline = None;
        }

        let stream = pipeline.open(kill_existing)?;
        slot.generation += 1;
        info!(pipeline = %pipeline.describe(), generation = slot.generation, "Attached");
        slot.pipeline = Some(pipeline);
        Ok((stream, slot.generation))
    }

    fn read_loop(&self, mut stream: OutputStream) -> Result<ReadStats> {
        let mut stats = ReadStats::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = match stream.read_until(b'\n', &mut buf) {
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            };
            if read == 0 {
                info!(lines = stats.lines, delivered = stats.delivered, "Decoder stream closed");
                return Ok(stats);
            }
            stats.lines += 1;

            let message = match self.create_line(&buf) {
                Ok(message) => message,
                Err(e) if e.is_line_error() && self.on_malformed == MalformedLinePolicy::Skip => {
                    warn!(error = %e, "Skipping line");
                    stats.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "Aborting read loop");
                    return Err(e);
                }
            };

            let mut handler = self.handler.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            handler.handle(message, &self.blacklist).map_err(Error::Handler)?;
            stats.delivered += 1;
        }
    }

    /// 取回回调（用于读取回调内部的累计结果）
    pub fn into_handler(self) -> H {
        self.handler.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
