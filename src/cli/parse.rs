//! Parse 命令 - 解析单行解码器输出并给出黑名单判定

use super::output::format_output;
use crate::blacklist::Blacklist;
use crate::config::Config;
use crate::message::Message;
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::fmt;

/// Parse 命令参数
#[derive(Args)]
pub struct ParseArgs {
    /// 一行 multimon-ng 输出
    pub line: String,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// Parse 命令输出
#[derive(Debug, Serialize)]
pub struct ParseOutput {
    pub message: Message,
    pub suppressed: bool,
    pub monitor_code_suppressed: bool,
    pub payload_suppressed: bool,
}

impl ParseOutput {
    pub fn evaluate(message: Message, blacklist: &Blacklist) -> Self {
        let monitor_code_suppressed = blacklist.is_monitor_code_suppressed(&message);
        let payload_suppressed = blacklist.is_payload_suppressed(&message);
        Self {
            message,
            suppressed: monitor_code_suppressed || payload_suppressed,
            monitor_code_suppressed,
            payload_suppressed,
        }
    }
}

impl fmt::Display for ParseOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        write!(
            f,
            "屏蔽: {} (monitor code: {}, 正文: {})",
            self.suppressed, self.monitor_code_suppressed, self.payload_suppressed
        )
    }
}

/// 处理 parse 命令
pub fn handle_parse(args: ParseArgs, config: &Config) -> Result<()> {
    let message = Message::parse_with(&args.line, &config.reader.parse_options())?;
    let output = ParseOutput::evaluate(message, &Blacklist::from_config(&config.blacklist));
    println!("{}", format_output(&output, args.json));
    Ok(())
}
