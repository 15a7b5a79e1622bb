//! # RM Protocol
//!
//! DJI RoboMaster 电机电调（GM6020 / M3508 / M2006）CAN 总线协议定义（无硬件依赖）。
//!
//! ## 模块
//!
//! - `ids`: CAN ID 常量定义与帧组映射
//! - `constants`: 物理常量与电机型号参数
//! - `command`: 指令帧构建（电压/电流定点缩放、帧组编码）
//! - `feedback`: 反馈帧解析与物理量转换
//!
//! ## 字节序
//!
//! 协议使用 Motorola (MSB) 高位在前（大端字节序）。

pub mod command;
pub mod constants;
pub mod feedback;
pub mod ids;

pub use command::*;
pub use constants::*;
pub use feedback::*;
pub use ids::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unrecognized CAN ID: 0x{id:X}")]
    UnrecognizedId { id: u16 },
}

/// CAN 2.0 标准帧的统一抽象
///
/// 协议层和硬件层之间的中间类型：
/// - Copy trait：零成本复制，适合高频收发场景（反馈帧 1kHz）
/// - 固定 8 字节数据：避免堆分配
/// - 无生命周期：自包含，简化 API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RmFrame {
    /// CAN ID（标准帧，11-bit）
    pub id: u16,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,
}

impl RmFrame {
    /// 创建标准帧，数据超过 8 字节的部分被截断
    pub fn new(id: u16, data: &[u8]) -> Self {
        let mut fixed = [0u8; 8];
        let len = data.len().min(8);
        fixed[..len].copy_from_slice(&data[..len]);
        Self {
            id,
            data: fixed,
            len: len as u8,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

/// 大端字节序转 i16
pub fn bytes_to_i16_be(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

/// 大端字节序转 u16
pub fn bytes_to_u16_be(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new_truncates() {
        let frame = RmFrame::new(0x1FF, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.data, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_frame_data_slice() {
        let frame = RmFrame::new(0x205, &[0xAA, 0xBB]);
        assert_eq!(frame.data_slice(), &[0xAA, 0xBB]);
        assert_eq!(frame.data[2..], [0u8; 6]);
    }

    #[test]
    fn test_bytes_to_i16_be() {
        assert_eq!(bytes_to_i16_be([0x12, 0x34]), 0x1234);
        assert_eq!(bytes_to_i16_be([0xFF, 0xFF]), -1);
    }

    #[test]
    fn test_bytes_to_u16_be() {
        assert_eq!(bytes_to_u16_be([0x1F, 0xFF]), 8191);
    }
}
