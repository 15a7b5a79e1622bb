//! SocketCAN 适配器实现
//!
//! 基于 Linux SocketCAN 子系统。波特率等接口配置由系统工具
//! （`ip link`）完成，不在应用层设置；本层只负责打开接口、
//! 设置反馈过滤器和非阻塞收发。
//!
//! ## 限制
//!
//! - 仅限 Linux 平台
//! - 可能需要 `dialout` 组权限或 `sudo`

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError};
use rm_protocol::{FB_FILTER_ID, FB_FILTER_MASK, RmFrame};
use socketcan::{
    CanFilter, CanFrame, CanSocket, EmbeddedFrame, Frame, Socket, SocketOptions, StandardId,
};
use std::io;
use tracing::{trace, warn};

/// ENODEV：接口名存在于命名空间但设备不在
const ERRNO_NO_DEVICE: i32 = 19;

/// SocketCAN 适配器
///
/// 打开即进入非阻塞模式。装上反馈过滤器后，其余设备的帧在内核层
/// 就被丢弃。
#[derive(Debug)]
pub struct SocketCanAdapter {
    socket: CanSocket,
    interface: String,
}

impl SocketCanAdapter {
    /// 打开 CAN 接口（如 "can0"、"vcan0"）
    ///
    /// 打开后即处于非阻塞模式，但不安装过滤器：调用方可能要先
    /// 裸听整条总线（探测占用），之后再调
    /// [`install_feedback_filter`](Self::install_feedback_filter)。
    ///
    /// # 错误
    /// - `CanDeviceErrorKind::NotFound`: 接口不存在
    /// - `CanDeviceErrorKind::AccessDenied`: 权限不足
    /// - `CanError::Io`: 其他系统调用失败
    pub fn new(interface: impl Into<String>) -> Result<Self, CanError> {
        let interface = interface.into();
        let socket =
            CanSocket::open(&interface).map_err(|e| map_open_error(&interface, e))?;
        socket.set_nonblocking(true).map_err(CanError::Io)?;

        trace!("CAN interface '{}' opened (non-blocking)", interface);
        Ok(Self { socket, interface })
    }

    /// 安装接收过滤器，只放行电机反馈帧 0x200-0x20F
    pub fn install_feedback_filter(&self) -> Result<(), CanError> {
        let filter = CanFilter::new(FB_FILTER_ID, FB_FILTER_MASK);
        self.socket.set_filters(&[filter]).map_err(CanError::Io)?;
        trace!(
            "Feedback filter 0x200-0x20F installed on '{}'",
            self.interface
        );
        Ok(())
    }

    /// 接口名称
    pub fn interface(&self) -> &str {
        &self.interface
    }
}

/// 把打开接口的 IO 错误映射为结构化设备错误
fn map_open_error(interface: &str, e: io::Error) -> CanError {
    let kind = match e.kind() {
        io::ErrorKind::PermissionDenied => CanDeviceErrorKind::AccessDenied,
        io::ErrorKind::NotFound => CanDeviceErrorKind::NotFound,
        _ if e.raw_os_error() == Some(ERRNO_NO_DEVICE) => CanDeviceErrorKind::NotFound,
        _ => CanDeviceErrorKind::Backend,
    };
    CanError::Device(CanDeviceError::new(
        kind,
        format!("Failed to open CAN interface '{}': {}", interface, e),
    ))
}

impl CanAdapter for SocketCanAdapter {
    fn send(&mut self, frame: RmFrame) -> Result<(), CanError> {
        let id = StandardId::new(frame.id).ok_or_else(|| {
            CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::Backend,
                format!("Invalid standard CAN ID: 0x{:X}", frame.id),
            ))
        })?;
        let can_frame = CanFrame::new(id, frame.data_slice()).ok_or_else(|| {
            CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::Backend,
                format!("Invalid frame payload length: {}", frame.len),
            ))
        })?;
        self.socket.write_frame(&can_frame).map_err(CanError::Io)
    }

    fn try_receive(&mut self) -> Result<Option<RmFrame>, CanError> {
        loop {
            match self.socket.read_frame() {
                Ok(CanFrame::Data(frame)) => {
                    return Ok(Some(RmFrame::new(frame.raw_id() as u16, frame.data())));
                },
                // 过滤器掩码不是精确匹配，附近 ID 的远程帧可能漏进来
                Ok(CanFrame::Remote(frame)) => {
                    trace!("Ignoring remote frame: {:?}", frame);
                },
                Ok(CanFrame::Error(frame)) => {
                    warn!("CAN error frame on '{}': {:?}", self.interface, frame);
                },
                Err(e) if would_block(&e) => return Ok(None),
                Err(e) => return Err(CanError::Io(e)),
            }
        }
    }
}

fn would_block(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
