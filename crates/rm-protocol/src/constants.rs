//! 物理常量与电机型号参数
//!
//! 数值来自 DJI 电调说明书（C620 / C610 / GM6020）。电流与扭矩系数
//! 按型号区分，电压模式仅 GM6020 支持。

use std::f64::consts::PI;
use std::fmt;

/// 最小电机 ID（CAN 拨码地址从 1 开始）
pub const ID_MIN: u8 = 1;

/// 机械角度反馈满量程（一圈映射到 0..8191）
pub const POS_MAX: u16 = 8191;

/// 母线电压上限（V）
pub const V_MAX: f64 = 24.0;

/// 电压指令满量程原始值（±V_MAX 映射到 ±25000）
pub const V_CMD_MAX: f64 = 25000.0;

/// 过温保护阈值（°C）
pub const TEMP_MAX: u8 = 125;

/// GM6020 空载转速系数（rpm/V）
pub const RPM_PER_V: f64 = 13.33;

/// rpm 与 rad/s 的换算系数
pub const RPM_PER_ANGULAR: f64 = 60.0 / (2.0 * PI);

/// 电机型号
///
/// GM6020 为云台电机（电压/电流指令），M3508 与 M2006 为
/// 减速电机（仅电流指令）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorType {
    #[default]
    GM6020,
    M3508,
    M2006,
}

impl MotorType {
    /// 该型号允许的最大 CAN ID
    pub fn id_max(self) -> u8 {
        match self {
            MotorType::GM6020 => 7,
            MotorType::M3508 => 8,
            MotorType::M2006 => 8,
        }
    }

    /// 转矩电流上限（A）
    pub fn current_limit(self) -> f64 {
        match self {
            MotorType::GM6020 => 1.62,
            MotorType::M3508 => 20.0,
            MotorType::M2006 => 10.0,
        }
    }

    /// 扭矩系数（N·m/A）
    ///
    /// M3508 与 M2006 的数值由数据手册曲线近似得到。
    pub fn torque_per_amp(self) -> f64 {
        match self {
            MotorType::GM6020 => 0.741,
            MotorType::M3508 => 0.353,
            MotorType::M2006 => 0.338,
        }
    }

    /// 电流指令满量程原始值（current_limit 映射到该值）
    pub fn current_cmd_max(self) -> f64 {
        match self {
            MotorType::GM6020 => 16384.0,
            MotorType::M3508 => 16384.0,
            MotorType::M2006 => 10000.0,
        }
    }

    /// 是否属于 M3508/M2006 减速电机家族（共用 0x200 反馈基址）
    pub fn is_gear_motor(self) -> bool {
        matches!(self, MotorType::M3508 | MotorType::M2006)
    }
}

impl fmt::Display for MotorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorType::GM6020 => write!(f, "GM6020"),
            MotorType::M3508 => write!(f, "M3508"),
            MotorType::M2006 => write!(f, "M2006"),
        }
    }
}
