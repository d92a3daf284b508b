//! Traffic Sim CLI
//!
//! 合成流量模拟器的命令行入口点。

use anyhow::Context;
use clap::Parser;
use traffic_server::cli::{Cli, CommandRunner, Commands};
use traffic_shared::config::AppConfig;
use traffic_shared::observability;

const SERVICE_NAME: &str = "traffic-sim";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        AppConfig::load(SERVICE_NAME, cli.config_dir.as_deref()).context("加载配置失败")?;
    // 命令行级别优先于 RUST_LOG 与配置文件
    config.observability.cli_log_level = cli.log_level.clone();

    let _guard = observability::init(SERVICE_NAME, &config.observability)
        .await
        .context("初始化可观测性失败")?;

    let runner = CommandRunner::new(config);

    match cli.command {
        Commands::Serve {
            port,
            no_autostart,
            seed,
        } => {
            runner.run_serve(port, no_autostart, seed).await?;
        }
        Commands::Generate {
            count,
            seed,
            output,
        } => {
            runner.run_generate(count, seed, output).await?;
        }
    }

    Ok(())
}
