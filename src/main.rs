//! Vitals Engine 主程序入口
//!
//! 健康检测编排引擎

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use vitals_engine::cli::args::{Args, Commands, LogLevel};
use vitals_engine::cli::commands::{
    CheckCommand, Command, InitCommand, ValidateCommand, VersionCommand, WatchCommand,
};
use vitals_engine::config::{ConfigLoader, TomlConfigLoader};
use vitals_engine::logging::{LogConfig, LoggingSystem};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = LogConfig {
        level: resolve_log_level(&args).await.into(),
        console: true,
        json_format: false,
        ..Default::default()
    };

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Vitals Engine v{} 启动", vitals_engine::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 确定日志级别：命令行参数优先，其次是配置文件，最后为 info
async fn resolve_log_level(args: &Args) -> LogLevel {
    if let Some(level) = args.log_level {
        return level;
    }

    if matches!(args.command, Commands::Init { .. } | Commands::Version { .. }) {
        return LogLevel::Info;
    }

    TomlConfigLoader::new(true)
        .load_from_file(args.get_config_path())
        .await
        .ok()
        .and_then(|config| LogLevel::from_config_str(&config.global.log_level))
        .unwrap_or(LogLevel::Info)
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Watch { .. } => Box::new(WatchCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
}
