//! 错误类型 - 解码流读取器的错误种类

use thiserror::Error;

/// 读取器操作的结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// 读取器错误
#[derive(Error, Debug)]
pub enum Error {
    /// 子进程无法启动（可执行文件缺失、权限不足等）
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// 已有活动连接
    #[error("connection is already active")]
    AlreadyAttached,

    /// 行中的 token 数量不足以填充消息字段
    #[error("malformed line ({tokens} tokens, need at least {min}): {line:?}", min = crate::message::MIN_TOKENS)]
    MalformedLine { line: String, tokens: usize },

    /// 字节无法按配置的编码解码
    #[error("line is not valid {encoding}: {line:?}")]
    Decode { encoding: String, line: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 消费者回调返回的错误
    #[error("handler failed: {0}")]
    Handler(anyhow::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// 该错误是否属于单行数据问题（按 MalformedLinePolicy 处理）
    pub fn is_line_error(&self) -> bool {
        matches!(self, Error::MalformedLine { .. } | Error::Decode { .. })
    }
}
