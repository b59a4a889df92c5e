//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Vitals Engine 的主要错误类型
#[derive(Error, Debug)]
pub enum VitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 探针注册相关错误
    #[error("注册错误: {0}")]
    Registry(#[from] RegistryError),

    /// 探针构建相关错误
    #[error("探针错误: {0}")]
    Probe(#[from] ProbeError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 探针注册错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// 名称重复
    #[error("探针名称重复: {name}")]
    DuplicateName { name: String },
}

/// 探针构建错误类型
///
/// 只在构建探针时出现；探针运行期的问题一律表示为 `ProbeOutcome`，不会以错误形式传播。
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP客户端构建失败
    #[error("HTTP客户端构建失败: {0}")]
    ClientBuild(#[from] reqwest::Error),

    /// 无效的HTTP方法
    #[error("无效的HTTP方法: {method}")]
    InvalidMethod { method: String },

    /// 无效的目标地址
    #[error("无效的探测目标: {target}")]
    InvalidTarget { target: String },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, VitalsError>;
