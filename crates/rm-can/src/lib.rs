//! # RM CAN Adapter Layer
//!
//! CAN 硬件抽象层，提供统一的总线会话接口。
//!
//! 驱动层只依赖 [`CanAdapter`] trait：Linux 下由 [`SocketCanAdapter`]
//! 提供真实总线，测试中由 `mock` feature 下的 [`mock::MockCanAdapter`]
//! 提供可注入的假总线。

// 重新导出 rm-protocol 中的帧类型
pub use rm_protocol::RmFrame;

use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(target_os = "linux")]
pub use socketcan::SocketCanAdapter;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBusHandle, MockCanAdapter};

/// CAN 适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    /// IO 底层错误（单次收发失败，通常可重试）
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 设备相关错误（接口未找到、权限不足、总线被占用等）
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
}

impl CanError {
    /// 是否为不可恢复错误（重试没有意义）
    pub fn is_fatal(&self) -> bool {
        match self {
            CanError::Io(_) => false,
            CanError::Device(e) => e.is_fatal(),
        }
    }
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    Unknown,
    NotFound,
    AccessDenied,
    Busy,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            CanDeviceErrorKind::NotFound | CanDeviceErrorKind::AccessDenied
        )
    }
}

impl From<String> for CanDeviceError {
    fn from(message: String) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for CanDeviceError {
    fn from(message: &str) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

/// 总线会话的原始收发原语
///
/// `try_receive` 永不阻塞：内核队列里有帧就取一帧，没有就返回
/// `Ok(None)`。读空循环由调用方（驱动的 IO 周期）负责。
pub trait CanAdapter {
    /// 发送一帧
    fn send(&mut self, frame: RmFrame) -> Result<(), CanError>;

    /// 非阻塞接收：取出一帧已到达的数据帧，队列为空时返回 `None`
    fn try_receive(&mut self) -> Result<Option<RmFrame>, CanError>;
}
