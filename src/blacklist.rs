//! 黑名单模块 - 按 monitor code 或消息正文屏蔽消息

use crate::config::BlacklistConfig;
use crate::message::Message;
use std::collections::HashSet;

/// 屏蔽策略
///
/// 两个集合在构造后不可变；monitor code 命中或正文命中任一即屏蔽。
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    monitor_codes: HashSet<String>,
    messages: HashSet<String>,
}

impl Blacklist {
    pub fn new<C, M>(monitor_codes: C, messages: M) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            monitor_codes: monitor_codes.into_iter().map(Into::into).collect(),
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }

    /// 从配置构造
    pub fn from_config(config: &BlacklistConfig) -> Self {
        Self::new(config.monitorcodes.iter().cloned(), config.messages.iter().cloned())
    }

    /// 消息是否应被屏蔽
    pub fn is_suppressed(&self, message: &Message) -> bool {
        self.is_monitor_code_suppressed(message) || self.is_payload_suppressed(message)
    }

    pub fn is_monitor_code_suppressed(&self, message: &Message) -> bool {
        self.monitor_codes.contains(message.monitor_code())
    }

    pub fn is_payload_suppressed(&self, message: &Message) -> bool {
        self.messages.contains(message.payload())
    }
}
