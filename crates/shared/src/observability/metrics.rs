//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册生成器相关指标的描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "scenario_events_total",
        "Total number of simulated log records dispatched"
    );
    metrics::describe_counter!(
        "scenario_ticks_skipped_total",
        "Ticks that produced no record because a precondition was not met"
    );
    metrics::describe_counter!(
        "scenario_generator_faults_total",
        "Unrecoverable generation faults that stopped the loop"
    );
    metrics::describe_gauge!(
        "scenario_engine_running",
        "1 while the generation loop is running"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一条已发送的模拟日志
#[inline]
pub fn record_event(event: &str, severity: &str) {
    metrics::counter!(
        "scenario_events_total",
        "event" => event.to_string(),
        "severity" => severity.to_string()
    )
    .increment(1);
}

/// 记录一次前置条件不满足的跳过
#[inline]
pub fn record_skip(reason: &str) {
    metrics::counter!("scenario_ticks_skipped_total", "reason" => reason.to_string()).increment(1);
}

/// 记录一次生成故障
#[inline]
pub fn record_fault() {
    metrics::counter!("scenario_generator_faults_total").increment(1);
}

/// 更新引擎运行状态
#[inline]
pub fn set_running(running: bool) {
    metrics::gauge!("scenario_engine_running").set(if running { 1.0 } else { 0.0 });
}
