//! Vitals Engine - 健康检测编排引擎
//!
//! 并发执行一组探针，每个探针有独立的时间预算，并将结果汇总为一份快照：
//! - ICMP/TCP/HTTP 探针
//! - 超时、panic 与取消隔离
//! - Healthy/Degraded/Unhealthy 分级与聚合
//! - 固定结构的JSON报告
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod probes;

// 重新导出主要类型
pub use config::{Config, GlobalConfig, ProbeConfig};
pub use error::VitalsError;
pub use health::{HealthEngine, HealthReport, Probe, ProbeOutcome, Registry, Severity, Snapshot};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
