//! 消息解析模块 - 把 multimon-ng 输出的一行 FLEX 文本解析为结构化消息
//!
//! 字段按空白分词后的固定位置提取:
//! - 第 2 个 token: 时间戳
//! - 第 6 个 token: monitor code（去掉首尾的 `[` `]`）
//! - 第 7 个 token 起: 消息正文（单空格拼接）

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 一行合法输入至少需要的 token 数
pub const MIN_TOKENS: usize = 7;

const TIMESTAMP_INDEX: usize = 1;
const MONITOR_CODE_INDEX: usize = 5;
const PAYLOAD_START: usize = 6;

/// 解码器输出的字符编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl Encoding {
    /// 把一行原始字节解码为文本
    pub fn decode(&self, raw: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(raw)
                .map(str::to_string)
                .map_err(|_| Error::Decode {
                    encoding: self.to_string(),
                    line: String::from_utf8_lossy(raw).into_owned(),
                }),
            // ISO-8859-1 的每个字节都直接对应同值的 Unicode 码位
            Encoding::Latin1 => Ok(raw.iter().map(|&b| b as char).collect()),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => write!(f, "utf-8"),
            Encoding::Latin1 => write!(f, "latin-1"),
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            other => Err(Error::Config(format!("unsupported encoding: {}", other))),
        }
    }
}

/// 解析选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// 原始字节的编码
    pub encoding: Encoding,
    /// 解析前去掉行尾换行和空白
    pub strip: bool,
    /// 正文不包含最后一个 token（旧版解码器在行尾附加标记时使用）
    pub drop_trailing_token: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            strip: true,
            drop_trailing_token: false,
        }
    }
}

/// 一条解码后的 FLEX 消息
///
/// 构造时从一行原始文本完整推导，之后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    raw_line: String,
    timestamp: String,
    monitor_code: String,
    payload: String,
}

impl Message {
    /// 用默认选项解析已解码的文本行
    pub fn parse(line: &str) -> Result<Self> {
        Self::parse_with(line, &ParseOptions::default())
    }

    /// 解析已解码的文本行（跳过字节解码）
    pub fn parse_with(line: &str, options: &ParseOptions) -> Result<Self> {
        let line = if options.strip { line.trim_end() } else { line };
        let words: Vec<&str> = line.split_whitespace().collect();

        if words.len() < MIN_TOKENS {
            return Err(Error::MalformedLine {
                line: line.to_string(),
                tokens: words.len(),
            });
        }

        let payload_end = if options.drop_trailing_token {
            words.len() - 1
        } else {
            words.len()
        };

        Ok(Self {
            raw_line: line.to_string(),
            timestamp: words[TIMESTAMP_INDEX].to_string(),
            monitor_code: strip_brackets(words[MONITOR_CODE_INDEX]).to_string(),
            payload: words[PAYLOAD_START..payload_end].join(" "),
        })
    }

    /// 从管道读到的原始字节构造消息
    pub fn from_bytes(raw: &[u8], options: &ParseOptions) -> Result<Self> {
        let decoded = options.encoding.decode(raw)?;
        Self::parse_with(&decoded, options)
    }

    /// 原始文本行
    pub fn raw_line(&self) -> &str {
        &self.raw_line
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// monitor code（capcode），已去掉方括号
    pub fn monitor_code(&self) -> &str {
        &self.monitor_code
    }

    /// 消息正文
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@line = {}\n\t@message = {}\n\t@timestamp = {}\n\t@monitorcode = {}",
            self.raw_line, self.payload, self.timestamp, self.monitor_code
        )
    }
}

fn strip_brackets(token: &str) -> &str {
    token.trim_matches(|c| c == '[' || c == ']')
}
