//! Output formatting for CLI commands

use crate::blacklist::Blacklist;
use crate::message::Message;
use crate::reader::LineHandler;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::Write;

/// Format output as pretty JSON or via the value's Display impl
pub fn format_output<T: Serialize + std::fmt::Display>(data: &T, json: bool) -> String {
    if json {
        serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
    } else {
        data.to_string()
    }
}

/// 单条消息的输出记录
#[derive(Debug, Serialize)]
pub struct MessageRecord<'a> {
    pub received_at: DateTime<Local>,
    #[serde(flatten)]
    pub message: &'a Message,
    pub suppressed: bool,
}

/// 格式化一条消息：JSON 为单行，文本为多行调试布局
pub fn format_message(message: &Message, suppressed: bool, json: bool) -> String {
    if json {
        let record = MessageRecord {
            received_at: Local::now(),
            message,
            suppressed,
        };
        serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string())
    } else if suppressed {
        format!("== LINE IS BLACKLISTED ==\n{}", message)
    } else {
        message.to_string()
    }
}

/// 把消息打印到 stdout 的回调
pub struct MessagePrinter {
    json: bool,
}

impl MessagePrinter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

impl LineHandler for MessagePrinter {
    fn handle(&mut self, message: Message, blacklist: &Blacklist) -> anyhow::Result<()> {
        let line = format_message(&message, blacklist.is_suppressed(&message), self.json);
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "FLEX 184600000 2 W 5 [1234567] ALM ALPHA TEST MESSAGE";

    #[test]
    fn test_format_message_json_is_single_line() {
        let message = Message::parse(LINE).unwrap();
        let out = format_message(&message, true, true);
        assert!(!out.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["monitor_code"], "1234567");
        assert_eq!(value["suppressed"], true);
        assert!(value["received_at"].is_string());
    }

    #[test]
    fn test_format_message_text_marks_suppressed() {
        let message = Message::parse(LINE).unwrap();
        assert!(format_message(&message, true, false).starts_with("== LINE IS BLACKLISTED =="));
        assert!(format_message(&message, false, false).starts_with("@line = "));
    }
}
