//! 驱动配置

use std::time::Duration;

/// 驱动行为参数
///
/// 所有字段都有适合 GM6020/M3508 电调特性的默认值，一般不需要调整。
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// 内部周期节拍
    ///
    /// 斜坡停机期间驱动自己按这个步长执行 IO 周期。正常运行时
    /// `run_once` 不睡眠，节拍由调用方控制（建议 ≥100Hz，低于
    /// 这个频率电调的看门狗可能报错，反馈也会过期）。
    pub cycle_period: Duration,

    /// 反馈过期告警阈值
    ///
    /// 注册过的电机超过这个时长没有新反馈就打 warn 日志。
    pub stale_after: Duration,

    /// 单个 IO 周期最多排空的接收帧数，限制单次调用的耗时上界
    pub rx_budget: usize,

    /// 斜坡停机期间连续多少次周期失败后放弃剩余步骤直接关闭
    pub max_consecutive_send_failures: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cycle_period: Duration::from_millis(10),
            stale_after: Duration::from_millis(100),
            rx_budget: 64,
            max_consecutive_send_failures: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = DriverConfig::default();
        assert_eq!(config.cycle_period, Duration::from_millis(10));
        assert_eq!(config.stale_after, Duration::from_millis(100));
        assert_eq!(config.rx_budget, 64);
        assert_eq!(config.max_consecutive_send_failures, 3);
    }
}
