//! 回放管道 - 从录制的 multimon-ng 输出文件读取，无需接收硬件

use crate::error::Result;
use crate::infra::pipeline::{OutputStream, Pipeline};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 文件回放管道
pub struct ReplayPipeline {
    path: PathBuf,
    killed: Arc<AtomicBool>,
    opened: bool,
}

impl ReplayPipeline {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            killed: Arc::new(AtomicBool::new(false)),
            opened: false,
        }
    }
}

impl Pipeline for ReplayPipeline {
    fn open(&mut self, _kill_existing: bool) -> Result<OutputStream> {
        let file = File::open(&self.path)?;
        self.opened = true;
        debug!(path = %self.path.display(), "Replaying decoder log");
        Ok(Box::new(ReplayStream {
            inner: BufReader::new(file),
            killed: Arc::clone(&self.killed),
        }))
    }

    fn is_open(&mut self) -> bool {
        self.opened && !self.killed.load(Ordering::SeqCst)
    }

    fn kill(&mut self) {
        self.killed.store(true, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        format!("replay {}", self.path.display())
    }
}

/// 被 kill 之后表现为 EOF 的文件流
struct ReplayStream {
    inner: BufReader<File>,
    killed: Arc<AtomicBool>,
}

impl Read for ReplayStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.killed.load(Ordering::SeqCst) {
            return Ok(0);
        }
        self.inner.read(buf)
    }
}

impl BufRead for ReplayStream {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.killed.load(Ordering::SeqCst) {
            return Ok(&[]);
        }
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
    }
}
