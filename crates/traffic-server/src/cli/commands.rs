//! CLI 命令定义

use clap::{Parser, Subcommand};

/// 合成流量模拟器
#[derive(Parser, Debug)]
#[command(name = "traffic-sim")]
#[command(version, about = "合成用户旅程日志生成工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// 配置目录，默认读取 CONFIG_DIR 或 ./config
    #[arg(long, global = true)]
    pub config_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 启动生成服务
    ///
    /// 提供 HTTP 启停接口与 WebSocket 事件推送。
    Serve {
        /// 服务端口，覆盖配置
        #[arg(short, long)]
        port: Option<u16>,

        /// 启动后不自动开始生成
        #[arg(long)]
        no_autostart: bool,

        /// 随机种子，覆盖配置
        #[arg(long)]
        seed: Option<u64>,
    },

    /// 一次性生成记录
    ///
    /// 不做停顿地执行 N 个 tick，记录以 JSON Lines 写入文件或标准输出。
    Generate {
        /// tick 数量
        #[arg(short, long, default_value = "100")]
        count: usize,

        /// 随机种子，覆盖配置
        #[arg(long)]
        seed: Option<u64>,

        /// 输出文件，缺省为标准输出
        #[arg(short, long)]
        output: Option<String>,
    },
}
