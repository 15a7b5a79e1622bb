//! 指令帧构建
//!
//! 把物理量指令（V / A）缩放为电调期望的定点原始值，并将一个帧组
//! 的 4 个原始值编码为一帧。编码始终读取整组数据，单个电机的更新
//! 不会破坏同组其他电机的指令字节。

use crate::constants::{MotorType, V_CMD_MAX, V_MAX};
use crate::{RmFrame, bytes_to_i16_be};
use std::fmt;

/// 指令模式
///
/// Voltage/Current 直接对应线上指令；Torque 折算为 Current，
/// Velocity 折算为 Voltage（开环，仅 GM6020）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CmdMode {
    #[default]
    Voltage,
    Current,
    Torque,
    Velocity,
}

impl CmdMode {
    /// 该模式是否被指定型号接受
    ///
    /// M3508/M2006 经由 C620/C610 电调只接受电流类指令。
    pub fn supported_by(self, motor_type: MotorType) -> bool {
        match motor_type {
            MotorType::GM6020 => true,
            MotorType::M3508 | MotorType::M2006 => {
                matches!(self, CmdMode::Current | CmdMode::Torque)
            },
        }
    }
}

impl fmt::Display for CmdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmdMode::Voltage => write!(f, "Voltage"),
            CmdMode::Current => write!(f, "Current"),
            CmdMode::Torque => write!(f, "Torque"),
            CmdMode::Velocity => write!(f, "Velocity"),
        }
    }
}

/// 电压指令（V）缩放为原始值，超出 ±V_MAX 的部分截断
pub fn voltage_to_raw(volts: f64) -> i16 {
    let v = volts.clamp(-V_MAX, V_MAX);
    (V_CMD_MAX * v / V_MAX) as i16
}

/// 电流指令（A）缩放为原始值，超出型号上限的部分截断
pub fn current_to_raw(motor_type: MotorType, amps: f64) -> i16 {
    let limit = motor_type.current_limit();
    let a = amps.clamp(-limit, limit);
    (motor_type.current_cmd_max() * a / limit) as i16
}

/// 原始电压指令还原为 V
pub fn raw_to_voltage(raw: i16) -> f64 {
    raw as f64 * V_MAX / V_CMD_MAX
}

/// 原始电流指令还原为 A
pub fn raw_to_current(motor_type: MotorType, raw: i16) -> f64 {
    raw as f64 * motor_type.current_limit() / motor_type.current_cmd_max()
}

/// 将一个帧组的 4 个原始指令编码为一帧
///
/// 电机 i 的指令写入字节 [2i, 2i+1]，大端。
pub fn encode_command_frame(frame_id: u16, raw: &[i16; 4]) -> RmFrame {
    let mut data = [0u8; 8];
    for (i, value) in raw.iter().enumerate() {
        data[2 * i..2 * i + 2].copy_from_slice(&value.to_be_bytes());
    }
    RmFrame::new(frame_id, &data)
}

/// 从指令帧中取出指定槽位的原始值（调试与测试用）
pub fn command_raw_at(frame: &RmFrame, slot: usize) -> i16 {
    bytes_to_i16_be([frame.data[2 * slot], frame.data[2 * slot + 1]])
}
