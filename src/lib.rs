//! P2000 Monitor - 接收并解码 P2000 FLEX 寻呼广播
//!
//! rtl_fm 从 SDR 接收机解调信号，multimon-ng 解码 FLEX 协议，
//! 本库负责管理这两个进程、逐行解析输出并按黑名单过滤。

pub mod blacklist;
pub mod cli;
pub mod config;
pub mod error;
pub mod infra;
pub mod message;
pub mod reader;

pub use blacklist::Blacklist;
pub use config::{BlacklistConfig, CaptureConfig, Config, DecoderConfig, MalformedLinePolicy, ReaderConfig};
pub use error::{Error, Result};
pub use infra::{CommandLine, OutputStream, Pipeline, ProcessScanner, ReplayPipeline, RtlPipeline};
pub use message::{Encoding, Message, ParseOptions};
pub use reader::{FilteringHandler, LineHandler, ReadStats, Reader, ReaderHandle, ReaderState};
