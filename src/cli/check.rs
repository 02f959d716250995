//! Check / Kill 命令 - 检查外部工具与残留进程

use super::output::format_output;
use crate::config::Config;
use crate::infra::{sweep_stale, ProcessInfo, ProcessScanner};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::fmt;

/// Check 命令参数
#[derive(Args)]
pub struct CheckArgs {
    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 一个外部工具的可用性
#[derive(Debug, Serialize)]
pub struct ToolStatus {
    pub program: String,
    pub path: Option<String>,
}

impl ToolStatus {
    fn locate(program: &str) -> Self {
        Self {
            program: program.to_string(),
            path: which::which(program)
                .ok()
                .map(|p| p.to_string_lossy().into_owned()),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.path.is_some()
    }
}

/// Check 命令输出
#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub capture: ToolStatus,
    pub decoder: ToolStatus,
    pub stale_captures: Vec<ProcessInfo>,
}

impl CheckOutput {
    pub fn collect(config: &Config) -> Self {
        let scanner = ProcessScanner::new();
        Self {
            capture: ToolStatus::locate(&config.capture.program),
            decoder: ToolStatus::locate(&config.decoder.program),
            stale_captures: scanner.find_by_name(&config.capture.program),
        }
    }
}

impl fmt::Display for CheckOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tool in [&self.capture, &self.decoder] {
            match &tool.path {
                Some(path) => writeln!(f, "✅ {}: {}", tool.program, path)?,
                None => writeln!(f, "❌ {}: 未找到", tool.program)?,
            }
        }
        write!(f, "运行中的 {} 进程: {}", self.capture.program, self.stale_captures.len())?;
        for process in &self.stale_captures {
            write!(f, "\n  PID: {} | {}", process.pid, process.args.join(" "))?;
        }
        Ok(())
    }
}

/// 处理 check 命令
pub fn handle_check(args: CheckArgs, config: &Config) -> Result<()> {
    let output = CheckOutput::collect(config);
    println!("{}", format_output(&output, args.json));
    if !output.capture.is_installed() || !output.decoder.is_installed() {
        anyhow::bail!("缺少外部工具");
    }
    Ok(())
}

/// 处理 kill 命令：按名称清理残留的采集进程
pub fn handle_kill(config: &Config) -> Result<()> {
    let killed = sweep_stale(&config.capture.program);
    println!("已终止 {} 个 {} 进程", killed, config.capture.program);
    Ok(())
}
