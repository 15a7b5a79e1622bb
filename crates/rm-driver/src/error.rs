//! 驱动层错误类型定义

use rm_can::CanError;
use rm_protocol::TEMP_MAX;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// CAN 总线错误
    #[error("CAN bus error: {0}")]
    Can(#[from] CanError),

    /// 注册参数无效（ID 越界、型号不支持的模式、地址冲突）
    #[error("Invalid motor configuration: {0}")]
    Config(String),

    /// 操作了未注册的电机
    #[error("Motor {id} is not registered")]
    UnknownMotor { id: u8 },

    /// 该电机还没有解码过任何反馈帧
    #[error("No feedback received from motor {id} yet")]
    NoData { id: u8 },

    /// 过温保护触发，指令已被清零
    #[error("Motor {id} temperature overload: {temperature} °C (limit {TEMP_MAX})")]
    Overheat { id: u8, temperature: u8 },

    /// 会话已关闭（cleanup 已开始或已完成）
    #[error("Session is closed")]
    SessionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rm_can::{CanDeviceError, CanDeviceErrorKind};

    /// 测试 DriverError 的 Display 实现
    #[test]
    fn test_driver_error_display() {
        let msg = format!("{}", DriverError::UnknownMotor { id: 3 });
        assert_eq!(msg, "Motor 3 is not registered");

        let msg = format!("{}", DriverError::NoData { id: 1 });
        assert!(msg.contains("No feedback"));

        let msg = format!(
            "{}",
            DriverError::Overheat {
                id: 2,
                temperature: 130
            }
        );
        assert!(msg.contains("130") && msg.contains("125"));

        let msg = format!("{}", DriverError::SessionClosed);
        assert_eq!(msg, "Session is closed");
    }

    /// 测试 From<CanError> 转换
    #[test]
    fn test_from_can_error() {
        let can_error: CanError =
            CanDeviceError::new(CanDeviceErrorKind::NotFound, "no such interface").into();
        let driver_error: DriverError = can_error.into();
        match driver_error {
            DriverError::Can(e) => assert!(e.is_fatal()),
            _ => panic!("Expected Can variant"),
        }
    }
}
