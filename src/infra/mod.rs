//! 基础设施层 - 子进程管道、进程扫描、回放

pub mod pipeline;
pub mod process;
pub mod replay;

pub use pipeline::{CommandLine, OutputStream, Pipeline, RtlPipeline};
pub use process::{sweep_stale, ProcessInfo, ProcessScanner};
pub use replay::ReplayPipeline;
