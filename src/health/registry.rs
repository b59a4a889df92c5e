//! 探针注册表
//!
//! 按注册顺序保存探针描述符，注册完成后交给引擎只读使用

use crate::error::RegistryError;
use crate::health::probe::Probe;
use std::sync::Arc;
use std::time::Duration;

/// 默认健康阈值（毫秒）
pub const DEFAULT_HEALTHY_THRESHOLD_MS: u64 = 300;

/// 单个探针的运行参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// 时间预算，`None` 时使用执行器的默认预算
    pub budget: Option<Duration>,
    /// 健康阈值，延迟超过该值判定为降级
    pub healthy_threshold: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            budget: None,
            healthy_threshold: Duration::from_millis(DEFAULT_HEALTHY_THRESHOLD_MS),
        }
    }
}

impl ProbeSettings {
    /// 设置时间预算
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    /// 设置健康阈值
    pub fn with_healthy_threshold(mut self, threshold: Duration) -> Self {
        self.healthy_threshold = threshold;
        self
    }
}

/// 探针描述符
#[derive(Clone)]
pub struct ProbeDescriptor {
    /// 探针名称（注册表内唯一）
    pub name: String,
    /// 结果描述中使用的标签
    pub label: String,
    /// 探针实现
    pub probe: Arc<dyn Probe>,
    /// 运行参数
    pub settings: ProbeSettings,
}

impl std::fmt::Debug for ProbeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeDescriptor")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// 探针注册表
#[derive(Debug, Default, Clone)]
pub struct Registry {
    descriptors: Vec<ProbeDescriptor>,
}

impl Registry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用默认参数注册探针
    ///
    /// # 参数
    /// * `name` - 探针名称
    /// * `probe` - 探针实现
    ///
    /// # 返回
    /// * `Result<(), RegistryError>` - 名称重复时返回 `DuplicateName`
    pub fn register(
        &mut self,
        name: impl Into<String>,
        probe: Arc<dyn Probe>,
    ) -> Result<(), RegistryError> {
        self.register_with_settings(name, probe, ProbeSettings::default())
    }

    /// 使用指定参数注册探针
    pub fn register_with_settings(
        &mut self,
        name: impl Into<String>,
        probe: Arc<dyn Probe>,
        settings: ProbeSettings,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(RegistryError::DuplicateName { name });
        }

        let label = probe.label().unwrap_or_else(|| name.clone());
        self.descriptors.push(ProbeDescriptor {
            name,
            label,
            probe,
            settings,
        });
        Ok(())
    }

    /// 按注册顺序列出描述符
    pub fn descriptors(&self) -> &[ProbeDescriptor] {
        &self.descriptors
    }

    /// 判断名称是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.iter().any(|d| d.name == name)
    }

    /// 已注册探针数量
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::probe::CancelSignal;
    use crate::health::result::ProbeOutcome;
    use async_trait::async_trait;

    struct StaticProbe(Option<&'static str>);

    #[async_trait]
    impl Probe for StaticProbe {
        async fn check(&self, _cancel: CancelSignal) -> ProbeOutcome {
            ProbeOutcome::Success(Duration::from_millis(1))
        }

        fn label(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn test_register_preserves_order() {
        let mut registry = Registry::new();
        registry.register("b", Arc::new(StaticProbe(None))).unwrap();
        registry.register("a", Arc::new(StaticProbe(None))).unwrap();
        registry.register("c", Arc::new(StaticProbe(None))).unwrap();

        let names: Vec<_> = registry
            .descriptors()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_register_duplicate_name() {
        let mut registry = Registry::new();
        registry
            .register("gateway", Arc::new(StaticProbe(None)))
            .unwrap();

        let result = registry.register("gateway", Arc::new(StaticProbe(None)));
        assert_eq!(
            result,
            Err(RegistryError::DuplicateName {
                name: "gateway".to_string()
            })
        );
        // 失败的注册不产生任何副作用
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_label_defaults_to_name() {
        let mut registry = Registry::new();
        registry.register("plain", Arc::new(StaticProbe(None))).unwrap();
        registry
            .register("icmp", Arc::new(StaticProbe(Some("ICMP to 10.0.0.1"))))
            .unwrap();

        assert_eq!(registry.descriptors()[0].label, "plain");
        assert_eq!(registry.descriptors()[1].label, "ICMP to 10.0.0.1");
    }

    #[test]
    fn test_settings_builder() {
        let settings = ProbeSettings::default()
            .with_budget(Duration::from_secs(2))
            .with_healthy_threshold(Duration::from_millis(100));

        assert_eq!(settings.budget, Some(Duration::from_secs(2)));
        assert_eq!(settings.healthy_threshold, Duration::from_millis(100));
        assert_eq!(
            ProbeSettings::default().healthy_threshold,
            Duration::from_millis(300)
        );
    }
}
