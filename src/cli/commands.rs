//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{
    Config, ConfigLoader, GlobalConfig, ProbeConfig, TomlConfigLoader, SAMPLE_CONFIG,
};
use crate::error::Result;
use crate::health::{CycleScheduler, Scheduler, Snapshot};
use crate::logging::LoggingSystem;
use crate::probes::build_engine;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载配置文件
async fn load_config(args: &Args) -> Result<Config> {
    let loader = TomlConfigLoader::new(true);
    loader.load_from_file(args.get_config_path()).await
}

/// 按输出格式渲染快照
pub fn render_snapshot(snapshot: &Snapshot, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(snapshot.to_report().to_json()?),
        OutputFormat::Table => Ok(render_table(snapshot)),
        OutputFormat::Text => Ok(render_text(snapshot)),
    }
}

/// 文本格式：每个探针一行，最后一行为整体状态
pub fn render_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for result in &snapshot.results {
        let status_icon = match result.severity {
            crate::health::Severity::Healthy => "✓",
            crate::health::Severity::Degraded => "!",
            crate::health::Severity::Unhealthy => "✗",
        };
        let _ = writeln!(
            out,
            "{} {} - {} - {}ms",
            status_icon,
            result.name,
            result.severity,
            result.latency_ms()
        );
        let _ = writeln!(out, "  {}", result.message);
    }
    let _ = write!(
        out,
        "整体状态: {} (总响应时间 {}ms)",
        snapshot.overall_severity,
        snapshot.total_latency_ms()
    );
    out
}

/// 表格格式
pub fn render_table(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<10} {:<10} {:<40}",
        "探针名称", "状态", "响应时间", "信息"
    );
    let _ = writeln!(out, "{}", "-".repeat(85));

    for result in &snapshot.results {
        let _ = writeln!(
            out,
            "{:<20} {:<10} {:<10} {:<40}",
            result.name,
            result.severity,
            format!("{}ms", result.latency_ms()),
            result.message
        );
    }

    let _ = writeln!(out, "{}", "-".repeat(85));
    let _ = write!(
        out,
        "{:<20} {:<10} {:<10}",
        "TOTAL",
        snapshot.overall_severity,
        format!("{}ms", snapshot.total_latency_ms())
    );
    out
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                _ => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    ///
    /// 文件已存在且未指定 `force` 时不做任何修改。
    pub async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, SAMPLE_CONFIG).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件以添加您的探针配置");

        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate { verbose } = &args.command {
            self.validate_config_file(&args.get_config_path(), *verbose)
                .await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件，并尝试构建全部探针
    pub async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;
        let engine = build_engine(&config)?;

        if verbose {
            println!("配置验证通过！");
            println!("全局配置:");
            println!("  日志级别: {}", config.global.log_level);
            println!("  默认预算: {}ms", config.global.default_timeout_ms);
            println!("  宽限期: {}ms", config.global.grace_period_ms);
            println!(
                "  默认健康阈值: {}ms",
                config.global.default_healthy_threshold_ms
            );
            println!("  检测间隔: {}秒", config.global.cycle_interval_seconds);

            println!("探针配置:");
            for (i, probe) in config.probes.iter().enumerate() {
                print!("{}", Self::format_probe_details(i + 1, probe, &config.global));
            }
        } else {
            println!("✓ 配置文件验证通过");
            println!(
                "✓ 找到 {} 个探针配置，启用 {} 个",
                config.probes.len(),
                engine.registry().len()
            );
        }

        Ok(())
    }

    /// 格式化单个探针的详细信息
    fn format_probe_details(index: usize, probe: &ProbeConfig, global: &GlobalConfig) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "  {}. {} ({})", index, probe.name, probe.kind);
        if let Some(description) = &probe.description {
            let _ = writeln!(out, "     描述: {description}");
        }
        let _ = writeln!(
            out,
            "     预算: {}ms",
            probe.effective_timeout(global).as_millis()
        );
        let _ = writeln!(
            out,
            "     健康阈值: {}ms",
            probe.settings(global).healthy_threshold.as_millis()
        );
        let _ = writeln!(
            out,
            "     启用状态: {}",
            if probe.enabled { "是" } else { "否" }
        );
        out
    }
}

/// 检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check { format, strict } = &args.command {
            let config = load_config(args).await?;
            let snapshot = self.perform_health_check(&config).await?;

            println!("{}", render_snapshot(&snapshot, *format)?);

            if *strict && !snapshot.overall_severity.is_healthy() {
                return Err(anyhow::anyhow!(
                    "整体状态为 {}，严格模式下视为失败",
                    snapshot.overall_severity
                )
                .into());
            }
        }
        Ok(())
    }
}

impl CheckCommand {
    /// 执行一轮健康检测
    pub async fn perform_health_check(&self, config: &Config) -> Result<Snapshot> {
        let engine = build_engine(config)?;
        Ok(engine.run_cycle().await)
    }
}

/// 周期检测命令
pub struct WatchCommand;

#[async_trait]
impl Command for WatchCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Watch { interval, format } = &args.command {
            let config = load_config(args).await?;
            let period = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.global.cycle_interval());

            let engine = Arc::new(build_engine(&config)?);
            let scheduler = CycleScheduler::new(engine, period);

            let logger =
                LoggingSystem::setup_logging(LoggingSystem::current_config().unwrap_or_default())?;
            let format = *format;
            scheduler
                .set_snapshot_callback(Arc::new(move |snapshot: &Snapshot| {
                    logger.snapshot_log(snapshot);
                    match render_snapshot(snapshot, format) {
                        Ok(rendered) => println!("{rendered}"),
                        Err(e) => eprintln!("渲染检测结果失败: {e}"),
                    }
                }))
                .await;

            scheduler.start().await?;
            info!("周期检测已启动，按 Ctrl-C 停止");

            tokio::signal::ctrl_c().await?;
            info!("收到停止信号，正在停止周期检测");

            scheduler.stop().await?;
        }
        Ok(())
    }
}
