//! 探针实现模块
//!
//! 提供ICMP、TCP、HTTP探针，以及从配置构建引擎的功能

pub mod http;
pub mod icmp;
pub mod tcp;

pub use http::HttpProbe;
pub use icmp::IcmpProbe;
pub use tcp::TcpProbe;

use crate::config::{Config, GlobalConfig, ProbeConfig, ProbeKind};
use crate::error::{ProbeError, Result};
use crate::health::{HealthEngine, Probe, Registry};
use std::sync::Arc;
use tracing::{debug, info};

/// 根据探针配置创建探针
///
/// # 参数
/// * `probe` - 探针配置
/// * `global` - 全局配置
///
/// # 返回
/// * `Result<Arc<dyn Probe>, ProbeError>` - 探针实例
pub fn from_config(
    probe: &ProbeConfig,
    global: &GlobalConfig,
) -> std::result::Result<Arc<dyn Probe>, ProbeError> {
    let missing = |field: &str| ProbeError::InvalidTarget {
        target: format!("{} 缺少 {}", probe.name, field),
    };
    let timeout = probe.effective_timeout(global);

    let built: Arc<dyn Probe> = match probe.kind {
        ProbeKind::Icmp => {
            let host = probe.host.clone().ok_or_else(|| missing("host"))?;
            Arc::new(IcmpProbe::new(host)?.with_packet_timeout(timeout))
        }
        ProbeKind::Tcp => {
            let host = probe.host.clone().ok_or_else(|| missing("host"))?;
            let port = probe.port.ok_or_else(|| missing("port"))?;
            Arc::new(TcpProbe::new(host, port)?)
        }
        ProbeKind::Http => {
            let url = probe.url.clone().ok_or_else(|| missing("url"))?;
            // 客户端超时比预算多留宽限期，正常情况下由取消信号先行结束请求
            let client_timeout = timeout + global.executor_config().grace_period;
            Arc::new(
                HttpProbe::new(url, &probe.method, client_timeout)?
                    .with_headers(probe.headers.clone())
                    .with_expected_status_codes(probe.expected_status_codes.clone()),
            )
        }
    };

    Ok(built)
}

/// 根据配置构建健康检测引擎，跳过禁用的探针
pub fn build_engine(config: &Config) -> Result<HealthEngine> {
    let mut registry = Registry::new();

    for probe in &config.probes {
        if !probe.enabled {
            debug!("跳过已禁用的探针: {}", probe.name);
            continue;
        }

        let built = from_config(probe, &config.global)?;
        registry.register_with_settings(
            probe.name.clone(),
            built,
            probe.settings(&config.global),
        )?;
    }

    info!("探针注册完成，数量: {}", registry.len());

    Ok(HealthEngine::new(registry, config.global.executor_config()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigLoader, TomlConfigLoader};
    use crate::error::VitalsError;
    use std::time::Duration;

    const CONFIG: &str = r#"
[global]
default_timeout_ms = 1500
grace_period_ms = 200

[[probes]]
name = "gateway"
kind = "icmp"
host = "10.0.0.1"

[[probes]]
name = "db"
kind = "tcp"
host = "127.0.0.1"
port = 5432
timeout_ms = 700
healthy_threshold_ms = 50

[[probes]]
name = "api"
kind = "http"
url = "http://127.0.0.1:8080/health"
enabled = false
"#;

    #[tokio::test]
    async fn test_build_engine_from_config() {
        let config = TomlConfigLoader::new(false)
            .load_from_string(CONFIG)
            .await
            .unwrap();
        let engine = build_engine(&config).unwrap();

        let descriptors = engine.registry().descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "gateway");
        assert_eq!(descriptors[0].label, "ICMP to 10.0.0.1");
        assert_eq!(descriptors[0].settings.budget, None);
        assert_eq!(descriptors[1].label, "TCP to 127.0.0.1:5432");
        assert_eq!(descriptors[1].settings.budget, Some(Duration::from_millis(700)));
        assert_eq!(
            descriptors[1].settings.healthy_threshold,
            Duration::from_millis(50)
        );
        assert_eq!(
            engine.executor().config().default_budget,
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_from_config_missing_field() {
        let probe = ProbeConfig {
            name: "broken".to_string(),
            kind: ProbeKind::Tcp,
            host: Some("127.0.0.1".to_string()),
            port: None,
            url: None,
            method: "GET".to_string(),
            expected_status_codes: vec![200],
            headers: Default::default(),
            timeout_ms: None,
            healthy_threshold_ms: None,
            enabled: true,
            description: None,
        };

        assert!(from_config(&probe, &GlobalConfig::default()).is_err());
    }

    #[test]
    fn test_build_engine_rejects_duplicate_names() {
        let probe = ProbeConfig {
            name: "twin".to_string(),
            kind: ProbeKind::Icmp,
            host: Some("10.0.0.1".to_string()),
            port: None,
            url: None,
            method: "GET".to_string(),
            expected_status_codes: vec![200],
            headers: Default::default(),
            timeout_ms: None,
            healthy_threshold_ms: None,
            enabled: true,
            description: None,
        };
        let config = Config {
            global: GlobalConfig::default(),
            probes: vec![probe.clone(), probe],
        };

        assert!(matches!(
            build_engine(&config),
            Err(VitalsError::Registry(_))
        ));
    }
}
