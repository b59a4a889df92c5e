//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用 `${VAR}` 环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {e}")))?;

        let mut missing: Option<String> = None;
        // 单次遍历原始内容，替换后的值不会再被展开
        let result = env_var_regex.replace_all(content, |captures: &regex::Captures<'_>| {
            let var_name = &captures[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });

        if let Some(var) = missing {
            return Err(ConfigError::EnvVarError { var }.into());
        }

        Ok(result.into_owned())
    }

    /// 解析TOML内容
    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {e}")))?;

        Ok(config)
    }
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        // 检查文件是否存在
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {e}")))?;

        let config = self.parse_toml(&content)?;
        self.validate(&config)?;

        log::info!("成功加载配置文件: {}", path.display());
        log::debug!("配置内容: {:?}", config);

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;

        log::debug!("成功解析配置字符串");

        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 获取默认配置文件路径
///
/// 当前目录存在 `vitals.toml` 时优先使用，否则使用用户配置目录下的文件。
pub fn get_default_config_path() -> std::path::PathBuf {
    if Path::new("vitals.toml").exists() {
        return std::path::PathBuf::from("vitals.toml");
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join(crate::APP_NAME).join("vitals.toml"))
        .unwrap_or_else(|| std::path::PathBuf::from("vitals.toml"))
}

/// 示例配置文件内容
pub const SAMPLE_CONFIG: &str = r#"# vitals-engine 配置文件

[global]
log_level = "info"
# 未单独配置时每个探针的时间预算（毫秒）
default_timeout_ms = 5000
# 预算耗尽后等待迟到结果的时长（毫秒）
grace_period_ms = 1000
# 未单独配置时的健康阈值（毫秒）
default_healthy_threshold_ms = 300
# watch 命令的检测间隔（秒）
cycle_interval_seconds = 30

[[probes]]
name = "gateway"
kind = "icmp"
host = "127.0.0.1"
healthy_threshold_ms = 300

[[probes]]
name = "database"
kind = "tcp"
host = "127.0.0.1"
port = 5432
timeout_ms = 2000
enabled = false

[[probes]]
name = "api"
kind = "http"
url = "http://127.0.0.1:8080/health"
method = "GET"
expected_status_codes = [200]
healthy_threshold_ms = 500
enabled = false
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ProbeKind;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    const TEST_CONFIG_TOML: &str = r#"
[global]
default_timeout_ms = 2000
log_level = "info"

[[probes]]
name = "gateway"
kind = "icmp"
host = "10.0.0.1"

[[probes]]
name = "api"
kind = "http"
url = "https://example.com/health"
expected_status_codes = [200, 204]
healthy_threshold_ms = 800
"#;

    const TEST_CONFIG_WITH_ENV_VARS: &str = r#"
[[probes]]
name = "api"
kind = "http"
url = "${VITALS_TEST_URL}"

[probes.headers]
"Authorization" = "Bearer ${VITALS_TEST_TOKEN}"
"#;

    #[tokio::test]
    async fn test_toml_parsing() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(TEST_CONFIG_TOML).await.unwrap();

        assert_eq!(config.global.default_timeout_ms, 2000);
        assert_eq!(config.global.grace_period_ms, 1000);
        assert_eq!(config.probes.len(), 2);
        assert_eq!(config.probes[0].kind, ProbeKind::Icmp);
        assert_eq!(config.probes[1].expected_status_codes, vec![200, 204]);
        assert_eq!(config.probes[1].healthy_threshold_ms, Some(800));
        assert_eq!(config.probes[1].method, "GET");
        assert!(config.probes[1].enabled);
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution() {
        env::set_var("VITALS_TEST_URL", "https://test.example.com/health");
        env::set_var("VITALS_TEST_TOKEN", "test-token-123");

        let loader = TomlConfigLoader::new(true);
        let config = loader
            .load_from_string(TEST_CONFIG_WITH_ENV_VARS)
            .await
            .unwrap();

        assert_eq!(
            config.probes[0].url,
            Some("https://test.example.com/health".to_string())
        );
        assert_eq!(
            config.probes[0].headers.get("Authorization"),
            Some(&"Bearer test-token-123".to_string())
        );

        env::remove_var("VITALS_TEST_URL");
        env::remove_var("VITALS_TEST_TOKEN");
    }

    #[test]
    #[serial]
    fn test_env_var_values_are_not_expanded_again() {
        env::set_var("VITALS_TEST_OUTER", "${VITALS_TEST_INNER}");
        env::set_var("VITALS_TEST_INNER", "secret");

        let loader = TomlConfigLoader::new(true);
        let result = loader
            .substitute_env_vars("a = \"${VITALS_TEST_OUTER}\"\nb = \"${VITALS_TEST_INNER}\"")
            .unwrap();

        assert_eq!(result, "a = \"${VITALS_TEST_INNER}\"\nb = \"secret\"");

        env::remove_var("VITALS_TEST_OUTER");
        env::remove_var("VITALS_TEST_INNER");
    }

    #[tokio::test]
    #[serial]
    async fn test_env_var_substitution_missing_var() {
        env::remove_var("VITALS_MISSING_VAR");
        let config_with_missing_var = r#"
[[probes]]
name = "gateway"
kind = "icmp"
host = "${VITALS_MISSING_VAR}"
"#;

        let loader = TomlConfigLoader::new(true);
        let result = loader.load_from_string(config_with_missing_var).await;

        let error = result.unwrap_err();
        assert!(error.to_string().contains("VITALS_MISSING_VAR"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_CONFIG_TOML.as_bytes()).unwrap();

        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_file(file.path()).await.unwrap();
        assert_eq!(config.probes[0].name, "gateway");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let loader = TomlConfigLoader::new(false);
        let result = loader.load_from_file("/nonexistent/vitals.toml").await;

        assert!(result.unwrap_err().to_string().contains("配置文件不存在"));
    }

    #[tokio::test]
    async fn test_sample_config_is_valid() {
        let loader = TomlConfigLoader::new(false);
        let config = loader.load_from_string(SAMPLE_CONFIG).await.unwrap();

        assert_eq!(config.probes.len(), 3);
        assert_eq!(config.probes[0].name, "gateway");
        assert!(!config.probes[1].enabled);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_parse_error() {
        let loader = TomlConfigLoader::new(false);
        let result = loader
            .load_from_string("[[probes]]\nname = \"x\"\nkind = \"smtp\"\n")
            .await;

        assert!(result.unwrap_err().to_string().contains("TOML解析失败"));
    }

    #[test]
    fn test_substitute_env_vars_disabled() {
        let loader = TomlConfigLoader::new(false);
        let content = "test ${VAR} content";
        let result = loader.substitute_env_vars(content).unwrap();
        assert_eq!(result, content);
    }

    #[test]
    fn test_get_default_config_path() {
        let path = get_default_config_path();
        assert!(path.to_string_lossy().contains("vitals.toml"));
    }
}
