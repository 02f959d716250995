//! 配置模块 - 黑名单与 rtl_fm / multimon-ng 启动参数
//!
//! 配置文件为 JSON，只有 `blacklist` 段是必需的，其余段缺省时使用固定的启动常量。

use crate::error::{Error, Result};
use crate::message::{Encoding, ParseOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub blacklist: BlacklistConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub reader: ReaderConfig,
}

/// 黑名单配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlacklistConfig {
    /// 屏蔽的 monitor code
    #[serde(default)]
    pub monitorcodes: Vec<String>,
    /// 屏蔽的消息正文（完全匹配）
    #[serde(default)]
    pub messages: Vec<String>,
}

/// rtl_fm 启动参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub program: String,
    /// 目标频率（P2000 为 169.65 MHz）
    pub frequency: String,
    pub modulation: String,
    pub sample_rate: u32,
    /// 频率校正（ppm）
    pub ppm_error: i32,
    pub gain: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: "rtl_fm".to_string(),
            frequency: "169.65M".to_string(),
            modulation: "fm".to_string(),
            sample_rate: 22050,
            ppm_error: 83,
            gain: 30,
        }
    }
}

impl CaptureConfig {
    /// 命令行参数
    pub fn args(&self) -> Vec<String> {
        vec![
            "-f".to_string(),
            self.frequency.clone(),
            "-M".to_string(),
            self.modulation.clone(),
            "-s".to_string(),
            self.sample_rate.to_string(),
            "-p".to_string(),
            self.ppm_error.to_string(),
            "-g".to_string(),
            self.gain.to_string(),
        ]
    }
}

/// multimon-ng 启动参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub program: String,
    /// 寻呼协议
    pub protocol: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            program: "multimon-ng".to_string(),
            protocol: "FLEX".to_string(),
        }
    }
}

impl DecoderConfig {
    /// 命令行参数：安静模式、raw 输入、从 stdin 读取
    pub fn args(&self) -> Vec<String> {
        vec![
            "-q".to_string(),
            "-a".to_string(),
            self.protocol.clone(),
            "-t".to_string(),
            "raw".to_string(),
            "/dev/stdin".to_string(),
        ]
    }
}

/// 畸形行处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedLinePolicy {
    /// 终止读取循环并返回错误
    #[default]
    Abort,
    /// 记录警告后继续读取
    Skip,
}

/// 读取器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub encoding: Encoding,
    pub strip: bool,
    pub drop_trailing_token: bool,
    pub on_malformed: MalformedLinePolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            strip: true,
            drop_trailing_token: false,
            on_malformed: MalformedLinePolicy::Abort,
        }
    }
}

impl ReaderConfig {
    /// 转换为解析选项
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            encoding: self.encoding,
            strip: self.strip,
            drop_trailing_token: self.drop_trailing_token,
        }
    }
}

impl Config {
    /// 从 JSON 文本解析
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(format!("invalid config: {}", e)))
    }

    /// 从指定文件加载，文件不存在视为致命错误
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Loaded config");
        Self::from_json(&content)
    }

    /// 按优先级查找配置：显式路径 > ./config.json > ~/.config/p2000/config.json
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        Self::default_locations()
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| {
                Error::Config(format!(
                    "no {} found in the working directory or ~/.config/p2000",
                    CONFIG_FILE_NAME
                ))
            })
    }

    /// 查找并加载配置
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit)?;
        Self::load(&path)
    }

    /// 查找并加载配置；未指定路径且默认位置都没有文件时使用默认值
    ///
    /// 显式路径读取失败或任何配置文件解析失败仍然是错误。
    pub fn discover_or_default(explicit: Option<&Path>) -> Result<Self> {
        Self::discover_or_default_in(explicit, &Self::default_locations())
    }

    fn discover_or_default_in(explicit: Option<&Path>, locations: &[PathBuf]) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match locations.iter().find(|p| p.exists()) {
            Some(path) => Self::load(path),
            None => {
                debug!("No config file found, using default invocation");
                Ok(Self::default())
            }
        }
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            locations.push(dir.join("p2000").join(CONFIG_FILE_NAME));
        }
        locations
    }
}
