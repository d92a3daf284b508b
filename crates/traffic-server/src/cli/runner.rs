//! 命令执行器
//!
//! 把命令行参数与配置合并后交给引擎或控制面。

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use scenario_engine::sink::{self, MemorySink};
use scenario_engine::{Pacing, ScenarioEngine, ScenarioGenerator, TickOutcome};
use tokio::net::TcpListener;
use tracing::info;
use traffic_shared::config::AppConfig;

use crate::routes::app;
use crate::state::AppState;

/// 命令执行器
pub struct CommandRunner {
    config: AppConfig,
}

/// generate 命令的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub ticks: usize,
    pub emitted: usize,
    pub auxiliary: usize,
    pub skipped: BTreeMap<&'static str, usize>,
}

impl GenerateSummary {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

impl CommandRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 执行 serve 命令
    ///
    /// 构造引擎与控制面，按配置决定是否立即开始生成；收到 Ctrl+C 后先停止引擎再退出。
    pub async fn run_serve(
        &self,
        port: Option<u16>,
        no_autostart: bool,
        seed: Option<u64>,
    ) -> Result<()> {
        let mut config = self.config.clone();
        if let Some(port) = port {
            config.server.port = port;
        }
        if seed.is_some() {
            config.simulation.seed = seed;
        }

        let sink = sink::from_config(&config.sink).context("创建日志接收端失败")?;
        let generator = ScenarioGenerator::from_config(&config.simulation, sink)
            .context("创建场景生成器失败")?;
        let engine = ScenarioEngine::new(generator, Pacing::from_config(&config.simulation));

        let state = Arc::new(AppState::new(engine.clone()));
        let router = app(state, config.server.static_dir.as_deref());

        let addr: SocketAddr = config
            .server_addr()
            .parse()
            .with_context(|| format!("无效的监听地址: {}", config.server_addr()))?;
        let listener = TcpListener::bind(addr).await.context("绑定端口失败")?;

        info!(
            addr = %addr,
            actors = config.simulation.actor_count,
            products = config.simulation.product_count,
            tick_delay_ms = config.simulation.tick_delay_ms,
            sink = ?config.sink.kind,
            "流量模拟服务已启动"
        );
        info!("可用端点:");
        info!("  POST /api/generation/start - 开始生成");
        info!("  POST /api/generation/stop - 停止生成");
        info!("  GET /api/generation/status - 引擎状态");
        info!("  GET /ws - 事件推送");
        info!("按 Ctrl+C 停止服务");

        if config.server.autostart && !no_autostart {
            engine.start();
        }

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("服务器运行失败")?;

        engine.stop();
        info!(status = ?engine.status(), "流量模拟服务已停止");
        Ok(())
    }

    /// 执行 generate 命令
    pub async fn run_generate(
        &self,
        count: usize,
        seed: Option<u64>,
        output: Option<String>,
    ) -> Result<()> {
        let (summary, records) = self.generate(count, seed).await?;

        match &output {
            Some(path) => {
                let file = fs::File::create(path).context("创建输出文件失败")?;
                write_json_lines(BufWriter::new(file), &records)?;
                info!(path, records = records.len(), "记录已输出到文件");
            }
            None => write_json_lines(io::stdout().lock(), &records)?,
        }

        // 标准输出可能被记录占用，统计写到标准错误
        eprintln!("\n生成完成:");
        eprintln!("{}", "-".repeat(30));
        eprintln!("tick 数量: {}", summary.ticks);
        eprintln!("主记录: {}", summary.emitted);
        eprintln!("辅助记录: {}", summary.auxiliary);
        eprintln!("跳过: {}", summary.skipped_total());
        for (reason, n) in &summary.skipped {
            eprintln!("  {reason}: {n}");
        }
        eprintln!("{}", "-".repeat(30));

        Ok(())
    }

    /// 不停顿地执行 `count` 个 tick，返回统计与全部记录
    pub async fn generate(
        &self,
        count: usize,
        seed: Option<u64>,
    ) -> Result<(GenerateSummary, Vec<scenario_engine::LogRecord>)> {
        let mut simulation = self.config.simulation.clone();
        if seed.is_some() {
            simulation.seed = seed;
        }

        let sink = MemorySink::new();
        let mut generator = ScenarioGenerator::from_config(&simulation, Arc::new(sink.clone()))
            .context("创建场景生成器失败")?;
        let mut ticks = Pacing::Immediate.ticks();
        let mut summary = GenerateSummary::default();

        info!(count, seed = ?simulation.seed, "开始一次性生成");
        for _ in 0..count {
            match generator.tick().await.context("生成失败")? {
                TickOutcome::Emitted(emission) => {
                    summary.emitted += 1;
                    summary.auxiliary += usize::from(emission.auxiliary.is_some());
                }
                TickOutcome::Skipped(reason) => {
                    *summary.skipped.entry(reason.as_str()).or_default() += 1;
                }
            }
            summary.ticks += 1;
            ticks.wait().await;
        }

        Ok((summary, sink.drain()))
    }
}

fn write_json_lines<W: Write>(mut writer: W, records: &[scenario_engine::LogRecord]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut writer, record).context("序列化记录失败")?;
        writer.write_all(b"\n").context("写入记录失败")?;
    }
    writer.flush().context("写入记录失败")?;
    Ok(())
}

/// 等待关闭信号
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "安装 CTRL+C 信号处理器失败");
        std::future::pending::<()>().await;
    }
    info!("收到关闭信号，正在停止服务...");
}
