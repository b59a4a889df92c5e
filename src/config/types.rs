//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::health::executor::{ExecutorConfig, DEFAULT_BUDGET_MS, DEFAULT_GRACE_PERIOD_MS};
use crate::health::registry::{ProbeSettings, DEFAULT_HEALTHY_THRESHOLD_MS};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// 主配置结构，包含全局配置和探针列表
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// 探针配置列表
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 默认时间预算（毫秒）
    #[serde(default = "default_timeout")]
    pub default_timeout_ms: u64,
    /// 超时宽限期（毫秒）
    #[serde(default = "default_grace_period")]
    pub grace_period_ms: u64,
    /// 默认健康阈值（毫秒）
    #[serde(default = "default_healthy_threshold")]
    pub default_healthy_threshold_ms: u64,
    /// 周期检测间隔（秒）
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_seconds: u64,
}

/// 探针类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// ICMP回显
    Icmp,
    /// TCP连接
    Tcp,
    /// HTTP请求
    Http,
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::Icmp => write!(f, "icmp"),
            ProbeKind::Tcp => write!(f, "tcp"),
            ProbeKind::Http => write!(f, "http"),
        }
    }
}

/// 探针配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeConfig {
    /// 探针名称
    pub name: String,
    /// 探针类型
    pub kind: ProbeKind,
    /// 目标主机（icmp/tcp）
    pub host: Option<String>,
    /// 目标端口（tcp）
    pub port: Option<u16>,
    /// 目标URL（http）
    pub url: Option<String>,
    /// HTTP方法
    #[serde(default = "default_method")]
    pub method: String,
    /// 期望的状态码列表（http）
    #[serde(default = "default_expected_status_codes")]
    pub expected_status_codes: Vec<u16>,
    /// 请求头（http）
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// 探针时间预算（毫秒），未设置时使用全局默认值
    pub timeout_ms: Option<u64>,
    /// 健康阈值（毫秒），未设置时使用全局默认值
    pub healthy_threshold_ms: Option<u64>,
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 探针描述
    pub description: Option<String>,
}

// 默认值函数
fn default_log_level() -> String {
    "info".to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_BUDGET_MS
}
fn default_grace_period() -> u64 {
    DEFAULT_GRACE_PERIOD_MS
}
fn default_healthy_threshold() -> u64 {
    DEFAULT_HEALTHY_THRESHOLD_MS
}
fn default_cycle_interval() -> u64 {
    30
}
fn default_method() -> String {
    "GET".to_string()
}
fn default_expected_status_codes() -> Vec<u16> {
    vec![200]
}
fn default_enabled() -> bool {
    true
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_timeout_ms: default_timeout(),
            grace_period_ms: default_grace_period(),
            default_healthy_threshold_ms: default_healthy_threshold(),
            cycle_interval_seconds: default_cycle_interval(),
        }
    }
}

impl GlobalConfig {
    /// 生成执行器配置
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            default_budget: Duration::from_millis(self.default_timeout_ms),
            grace_period: Duration::from_millis(self.grace_period_ms),
        }
    }

    /// 周期检测间隔
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_seconds)
    }
}

impl ProbeConfig {
    /// 计算探针运行参数
    pub fn settings(&self, global: &GlobalConfig) -> ProbeSettings {
        ProbeSettings {
            budget: self.timeout_ms.map(Duration::from_millis),
            healthy_threshold: Duration::from_millis(
                self.healthy_threshold_ms
                    .unwrap_or(global.default_healthy_threshold_ms),
            ),
        }
    }

    /// 实际使用的时间预算
    pub fn effective_timeout(&self, global: &GlobalConfig) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(global.default_timeout_ms))
    }
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证全局配置
    if config.global.default_timeout_ms == 0 {
        return Err("默认超时时间不能为0".to_string());
    }

    if config.global.cycle_interval_seconds == 0 {
        return Err("检测间隔不能为0".to_string());
    }

    if config.global.default_healthy_threshold_ms == 0 {
        return Err("默认健康阈值不能为0".to_string());
    }

    // 验证日志级别
    let valid_log_levels = ["debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.global.log_level, valid_log_levels
        ));
    }

    // 验证探针配置
    if config.probes.is_empty() {
        return Err("至少需要配置一个探针".to_string());
    }

    let mut names = HashSet::new();
    for probe in &config.probes {
        // 验证探针名称
        if probe.name.trim().is_empty() {
            return Err("探针名称不能为空".to_string());
        }

        if !names.insert(probe.name.as_str()) {
            return Err(format!("探针名称重复: {}", probe.name));
        }

        if probe.timeout_ms == Some(0) {
            return Err(format!("探针 {} 的超时时间不能为0", probe.name));
        }

        if probe.healthy_threshold_ms == Some(0) {
            return Err(format!("探针 {} 的健康阈值不能为0", probe.name));
        }

        match probe.kind {
            ProbeKind::Icmp => validate_host(probe)?,
            ProbeKind::Tcp => {
                validate_host(probe)?;
                match probe.port {
                    Some(port) if port != 0 => {}
                    _ => return Err(format!("探针 {} 必须指定有效的端口", probe.name)),
                }
            }
            ProbeKind::Http => validate_http(probe)?,
        }
    }

    Ok(())
}

/// 验证主机名
fn validate_host(probe: &ProbeConfig) -> Result<(), String> {
    let host = probe
        .host
        .as_deref()
        .ok_or_else(|| format!("探针 {} ({}) 必须指定主机", probe.name, probe.kind))?;

    if host.trim().is_empty() {
        return Err(format!("探针 {} 的主机不能为空", probe.name));
    }

    if host.starts_with('-') || host.chars().any(char::is_whitespace) {
        return Err(format!("探针 {} 的主机 {} 格式无效", probe.name, host));
    }

    Ok(())
}

/// 验证HTTP探针
fn validate_http(probe: &ProbeConfig) -> Result<(), String> {
    let url = probe
        .url
        .as_deref()
        .ok_or_else(|| format!("探针 {} (http) 必须指定URL", probe.name))?;

    // 验证URL格式
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(format!("探针 {} 的URL格式无效", probe.name));
    }

    // 验证状态码
    if probe.expected_status_codes.is_empty() {
        return Err(format!("探针 {} 必须指定期望的状态码", probe.name));
    }

    for &code in &probe.expected_status_codes {
        if !(100..=599).contains(&code) {
            return Err(format!("探针 {} 的状态码 {} 无效", probe.name, code));
        }
    }

    // 验证HTTP方法
    let valid_methods = ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];
    if !valid_methods.contains(&probe.method.to_uppercase().as_str()) {
        return Err(format!(
            "探针 {} 的HTTP方法 {} 无效，支持的方法: {:?}",
            probe.name, probe.method, valid_methods
        ));
    }

    Ok(())
}
