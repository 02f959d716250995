//! P2000 Monitor CLI
//!
//! 接收 P2000 寻呼广播 (rtl_fm | multimon-ng) 并输出解码后的消息

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use p2000_monitor::cli::{
    handle_check, handle_kill, handle_listen, handle_parse, handle_replay, CheckArgs, ListenArgs,
    ParseArgs, ReplayArgs,
};
use p2000_monitor::Config;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "p2000")]
#[command(about = "P2000 Monitor - 接收并解码 P2000 FLEX 寻呼广播")]
#[command(version)]
struct Cli {
    /// 配置文件路径 (默认: ./config.json 或 ~/.config/p2000/config.json)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动 rtl_fm | multimon-ng 并实时输出消息
    Listen(ListenArgs),
    /// 回放录制的 multimon-ng 输出
    Replay(ReplayArgs),
    /// 解析单行解码器输出
    Parse(ParseArgs),
    /// 检查外部工具和残留进程
    Check(CheckArgs),
    /// 终止所有残留的采集进程
    Kill,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug p2000 listen
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("p2000_monitor=info,p2000=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let explicit = cli.config.as_deref();

    match cli.command {
        Commands::Listen(args) => {
            let config = Config::discover(explicit)?;
            handle_listen(args, &config).await?;
        }
        Commands::Replay(args) => {
            let config = Config::discover(explicit)?;
            handle_replay(args, &config).await?;
        }
        Commands::Parse(args) => {
            let config = Config::discover(explicit)?;
            handle_parse(args, &config)?;
        }
        // check / kill 不强制要求配置文件，找不到时使用默认启动参数
        Commands::Check(args) => {
            let config = Config::discover_or_default(explicit).context("无法加载配置")?;
            handle_check(args, &config)?;
        }
        Commands::Kill => {
            let config = Config::discover_or_default(explicit).context("无法加载配置")?;
            handle_kill(&config)?;
        }
    }

    Ok(())
}
