//! 反馈帧解析与物理量转换
//!
//! 每个电机以 1kHz 发送一帧 8 字节反馈：
//!
//! | 字节  | 内容                       |
//! |-------|----------------------------|
//! | 0-1   | 机械角度，大端 u16，0..8191 |
//! | 2-3   | 转速，大端 i16，rpm         |
//! | 4-5   | 转矩电流，大端 i16，原始值  |
//! | 6     | 电机温度，u8，°C            |
//! | 7     | 保留                       |
//!
//! 一帧解析为一个不可变的 [`Feedback`]，整体替换上一份采样，
//! 不做字段级的增量更新。

use crate::constants::{MotorType, POS_MAX, RPM_PER_ANGULAR};
use crate::ids::feedback_motor_id;
use crate::{ProtocolError, RmFrame, bytes_to_i16_be, bytes_to_u16_be};
use std::f64::consts::PI;
use std::fmt;

/// 反馈帧长度（字节）
pub const FEEDBACK_FRAME_LEN: usize = 8;

/// 反馈量选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FbField {
    #[default]
    Position,
    Velocity,
    Current,
    Temperature,
}

impl fmt::Display for FbField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FbField::Position => write!(f, "Position"),
            FbField::Velocity => write!(f, "Velocity"),
            FbField::Current => write!(f, "Current"),
            FbField::Temperature => write!(f, "Temperature"),
        }
    }
}

/// 一帧反馈的解码结果（原始值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Feedback {
    /// 机械角度 [0, 8191]
    pub position: u16,
    /// 转速（rpm）
    pub velocity: i16,
    /// 转矩电流原始值 [-i_cmd_max, i_cmd_max]
    pub current: i16,
    /// 温度（°C）
    pub temperature: u8,
}

impl Feedback {
    /// 从反馈帧解析
    ///
    /// # 错误
    /// - `ProtocolError::InvalidLength`: 数据长度不是 8 字节
    pub fn parse(frame: &RmFrame) -> Result<Self, ProtocolError> {
        let data = frame.data_slice();
        if data.len() != FEEDBACK_FRAME_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: FEEDBACK_FRAME_LEN,
                actual: data.len(),
            });
        }
        Ok(Self {
            position: bytes_to_u16_be([data[0], data[1]]),
            velocity: bytes_to_i16_be([data[2], data[3]]),
            current: bytes_to_i16_be([data[4], data[5]]),
            temperature: data[6],
        })
    }

    /// 机械角度（rad，一圈映射到 0..2π）
    pub fn position_rad(&self) -> f64 {
        self.position as f64 / POS_MAX as f64 * 2.0 * PI
    }

    /// 角速度（rad/s）
    pub fn velocity_rad_s(&self) -> f64 {
        self.velocity as f64 / RPM_PER_ANGULAR
    }

    /// 转矩电流（A），满量程按型号换算
    pub fn current_amps(&self, motor_type: MotorType) -> f64 {
        self.current as f64 * motor_type.current_limit() / motor_type.current_cmd_max()
    }

    /// 温度（°C）
    pub fn temperature_c(&self) -> f64 {
        self.temperature as f64
    }
}

/// 解码一帧入站反馈：仲裁 ID 映射到电机 ID，数据区解析为 [`Feedback`]
///
/// # 错误
/// - `ProtocolError::UnrecognizedId`: 不是本协议的反馈帧（总线上
///   可能有其他设备，调用方一般直接忽略）
/// - `ProtocolError::InvalidLength`: ID 匹配但长度不对（丢帧处理）
pub fn decode_feedback(
    frame: &RmFrame,
    upper_is_gear: bool,
) -> Result<(u8, Feedback), ProtocolError> {
    let id = feedback_motor_id(frame.id, upper_is_gear)
        .ok_or(ProtocolError::UnrecognizedId { id: frame.id })?;
    Ok((id, Feedback::parse(frame)?))
}

/// 构造一帧反馈数据（回放与测试用）
pub fn encode_feedback_frame(can_id: u16, feedback: &Feedback) -> RmFrame {
    let mut data = [0u8; 8];
    data[0..2].copy_from_slice(&feedback.position.to_be_bytes());
    data[2..4].copy_from_slice(&feedback.velocity.to_be_bytes());
    data[4..6].copy_from_slice(&feedback.current.to_be_bytes());
    data[6] = feedback.temperature;
    RmFrame::new(can_id, &data)
}
