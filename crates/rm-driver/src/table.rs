//! 电机状态表
//!
//! 固定 8 槽的共享状态：每槽一份注册配置 + 最新指令原始值
//! （`RwLock<Option<MotorEntry>>`，临界区只有一次小结构的拷贝），
//! 以及一份最新反馈采样（`ArcSwapOption`，整体替换，读取方不可能
//! 看到两帧混在一起的撕裂值）。指令写入与反馈写入互不加锁。

use crate::error::DriverError;
use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use rm_protocol::{
    CmdMode, FbField, Feedback, ID_MIN, IdRange, MotorType, ProtocolError, RPM_PER_ANGULAR,
    RPM_PER_V, RmFrame, TEMP_MAX, WireMode, command_frame_id, current_to_raw, decode_feedback,
    voltage_to_raw,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// 状态表槽位数。GM6020 只用前 7 个，M3508/M2006 用满 8 个。
pub(crate) const SLOT_COUNT: usize = 8;

/// 一个已注册电机的配置与最新指令
#[derive(Debug, Clone, Copy)]
pub(crate) struct MotorEntry {
    pub motor_type: MotorType,
    pub mode: CmdMode,
    /// 已缩放到电调定点表示的指令值
    pub command_raw: i16,
}

/// 带接收时间的反馈采样
#[derive(Debug, Clone, Copy)]
pub(crate) struct FeedbackSample {
    pub feedback: Feedback,
    pub received_at: Instant,
}

pub(crate) struct MotorTable {
    slots: [RwLock<Option<MotorEntry>>; SLOT_COUNT],
    feedbacks: [ArcSwapOption<FeedbackSample>; SLOT_COUNT],
    /// 反馈 ID 0x205-0x208 是否按 M3508/M2006 的 5-8 号解析
    upper_is_gear: AtomicBool,
}

impl MotorTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| RwLock::new(None)),
            feedbacks: std::array::from_fn(|_| ArcSwapOption::empty()),
            upper_is_gear: AtomicBool::new(false),
        }
    }

    fn index(id: u8) -> usize {
        (id - 1) as usize
    }

    fn valid_id(id: u8) -> bool {
        id >= ID_MIN && (id as usize) <= SLOT_COUNT
    }

    /// 注册（或重新注册）一个电机
    ///
    /// 重新注册会覆盖型号与模式，并把指令清零，避免旧指令值在新
    /// 模式下被重新解释。
    ///
    /// # 错误
    /// - `Config`: ID 越界、型号不支持该模式、DJI 地址方案冲突
    pub fn register(&self, id: u8, motor_type: MotorType, mode: CmdMode) -> Result<(), DriverError> {
        if id < ID_MIN || id > motor_type.id_max() {
            return Err(DriverError::Config(format!(
                "id out of range [{}, {}] for {}: {}",
                ID_MIN,
                motor_type.id_max(),
                motor_type,
                id
            )));
        }
        if !mode.supported_by(motor_type) {
            return Err(DriverError::Config(format!(
                "{} only accepts Current or Torque commands, got {}",
                motor_type, mode
            )));
        }

        // DJI 地址方案限制：GM6020 1-4 的电压指令 ID (0x1FF) 同时是
        // M3508/M2006 5-8 的电流指令 ID，反馈 0x205-0x208 也重叠，
        // 两个群体不能共存于一条总线。
        if motor_type == MotorType::GM6020 && id <= 4 {
            for other in 5..=SLOT_COUNT as u8 {
                if let Some(entry) = self.entry(other)
                    && entry.motor_type.is_gear_motor()
                {
                    return Err(DriverError::Config(format!(
                        "GM6020 ID 1-4 cannot coexist with {} ID 5-8",
                        entry.motor_type
                    )));
                }
            }
        } else if motor_type.is_gear_motor() && id >= 5 {
            for other in 1..=4u8 {
                if let Some(entry) = self.entry(other)
                    && entry.motor_type == MotorType::GM6020
                {
                    return Err(DriverError::Config(format!(
                        "{} ID 5-8 cannot coexist with GM6020 ID 1-4",
                        motor_type
                    )));
                }
            }
            self.upper_is_gear.store(true, Ordering::Release);
        }

        let mut slot = self.slots[Self::index(id)].write();
        match slot.as_ref() {
            None => debug!("Registering {}:{} in {} mode", motor_type, id, mode),
            Some(old) => warn!(
                "Re-registering motor {}: {}:{} -> {}:{}, command reset to 0",
                id, old.motor_type, old.mode, motor_type, mode
            ),
        }
        *slot = Some(MotorEntry {
            motor_type,
            mode,
            command_raw: 0,
        });
        Ok(())
    }

    /// 更新一个电机的指令值（最后写入者生效）
    ///
    /// Torque 折算为电流，Velocity 折算为电压，随后截断到模式上限
    /// 并缩放为定点原始值。
    ///
    /// # 错误
    /// - `UnknownMotor`: 电机未注册
    /// - `Overheat`: 反馈温度达到保护阈值，指令已被清零
    pub fn set_command(&self, id: u8, mode: CmdMode, value: f64) -> Result<(), DriverError> {
        if !Self::valid_id(id) {
            return Err(DriverError::UnknownMotor { id });
        }
        let mut slot = self.slots[Self::index(id)].write();
        let entry = slot.as_mut().ok_or(DriverError::UnknownMotor { id })?;

        if let Some(sample) = self.feedbacks[Self::index(id)].load_full()
            && sample.feedback.temperature >= TEMP_MAX
        {
            entry.command_raw = 0;
            return Err(DriverError::Overheat {
                id,
                temperature: sample.feedback.temperature,
            });
        }

        // 模式在运行期改变通常意味着调用方配置有误，电调侧的模式
        // 需要在 RoboMaster Assistant 里设置，这里只能照发并告警。
        if entry.mode != mode {
            warn!(
                "Changing mode of motor {} from {} to {}",
                id, entry.mode, mode
            );
            entry.mode = mode;
        }

        entry.command_raw = match mode {
            CmdMode::Voltage => voltage_to_raw(value),
            CmdMode::Velocity => voltage_to_raw(value * RPM_PER_ANGULAR / RPM_PER_V),
            CmdMode::Current => current_to_raw(entry.motor_type, value),
            CmdMode::Torque => {
                current_to_raw(entry.motor_type, value / entry.motor_type.torque_per_amp())
            },
        };
        trace!("Motor {} command set to raw {}", id, entry.command_raw);
        Ok(())
    }

    /// 读取某个反馈量，换算为物理单位
    ///
    /// # 错误
    /// - `UnknownMotor`: 电机未注册
    /// - `Config`: M2006 不上报电流和温度
    /// - `NoData`: 还没有解码过该电机的反馈帧
    pub fn get_feedback(&self, id: u8, field: FbField) -> Result<f64, DriverError> {
        if !Self::valid_id(id) {
            return Err(DriverError::UnknownMotor { id });
        }
        let entry = self.entry(id).ok_or(DriverError::UnknownMotor { id })?;
        if entry.motor_type == MotorType::M2006
            && matches!(field, FbField::Current | FbField::Temperature)
        {
            return Err(DriverError::Config(format!(
                "Motor {} is an M2006, which does not report {}",
                id, field
            )));
        }
        let sample = self.feedbacks[Self::index(id)]
            .load_full()
            .ok_or(DriverError::NoData { id })?;
        let fb = &sample.feedback;
        Ok(match field {
            FbField::Position => fb.position_rad(),
            FbField::Velocity => fb.velocity_rad_s(),
            FbField::Current => fb.current_amps(entry.motor_type),
            FbField::Temperature => fb.temperature_c(),
        })
    }

    /// 最新一帧原始反馈
    pub fn raw_feedback(&self, id: u8) -> Result<Feedback, DriverError> {
        if !Self::valid_id(id) {
            return Err(DriverError::UnknownMotor { id });
        }
        self.entry(id).ok_or(DriverError::UnknownMotor { id })?;
        self.feedbacks[Self::index(id)]
            .load_full()
            .map(|sample| sample.feedback)
            .ok_or(DriverError::NoData { id })
    }

    /// 解码并存入一帧入站帧
    ///
    /// 无法识别的仲裁 ID 直接忽略（总线上可能有其他设备）；长度
    /// 不对的帧丢弃并告警。两者都不会让 IO 周期中断。
    pub fn ingest(&self, frame: RmFrame) {
        let upper_is_gear = self.upper_is_gear.load(Ordering::Acquire);
        match decode_feedback(&frame, upper_is_gear) {
            Ok((id, feedback)) => {
                self.feedbacks[Self::index(id)].store(Some(Arc::new(FeedbackSample {
                    feedback,
                    received_at: Instant::now(),
                })));
            },
            Err(ProtocolError::UnrecognizedId { id }) => {
                trace!("Ignoring frame with unrecognized CAN ID 0x{:X}", id);
            },
            Err(e) => warn!("Dropping malformed feedback frame 0x{:X}: {}", frame.id, e),
        }
    }

    /// 本周期需要发送的 (指令帧 ID, 帧组) 组合，按槽位顺序去重
    pub fn pending_frames(&self) -> Vec<(u16, IdRange)> {
        let mut pending: Vec<(u16, IdRange)> = Vec::with_capacity(4);
        for id in ID_MIN..=SLOT_COUNT as u8 {
            let Some(entry) = self.entry(id) else {
                continue;
            };
            let range = IdRange::from_motor_id(id);
            let wire = match entry.mode {
                CmdMode::Voltage | CmdMode::Velocity => WireMode::Voltage,
                CmdMode::Current | CmdMode::Torque => WireMode::Current,
            };
            // 注册阶段保证了组合有效
            let Some(frame_id) = command_frame_id(entry.motor_type, wire, range) else {
                debug!("Motor {} has no command frame for {:?}", id, wire);
                continue;
            };
            if !pending.iter().any(|(fid, _)| *fid == frame_id) {
                pending.push((frame_id, range));
            }
        }
        pending
    }

    /// 一个帧组 4 个槽位的当前指令快照
    ///
    /// 编码永远读整组，单电机的 `set_command` 不会影响同组其他
    /// 电机已写入的指令字节。未注册槽位发 0。
    pub fn snapshot_group(&self, range: IdRange) -> [i16; 4] {
        let base = range.base_index();
        std::array::from_fn(|i| {
            self.slots[base + i]
                .read()
                .as_ref()
                .map(|entry| entry.command_raw)
                .unwrap_or(0)
        })
    }

    /// 已注册电机的 (id, 当前指令) 快照，斜坡停机的起点
    pub fn initial_commands(&self) -> Vec<(u8, i16)> {
        (ID_MIN..=SLOT_COUNT as u8)
            .filter_map(|id| self.entry(id).map(|entry| (id, entry.command_raw)))
            .collect()
    }

    /// 按比例缩放初始指令（斜坡的一个步进），向零截断
    pub fn apply_scaled(&self, initial: &[(u8, i16)], scale: f64) {
        for (id, raw) in initial {
            if let Some(entry) = self.slots[Self::index(*id)].write().as_mut() {
                entry.command_raw = (*raw as f64 * scale) as i16;
            }
        }
    }

    /// 所有指令清零
    pub fn zero_all(&self) {
        for slot in &self.slots {
            if let Some(entry) = slot.write().as_mut() {
                entry.command_raw = 0;
            }
        }
    }

    /// 对长时间没有反馈的已注册电机打告警日志
    pub fn log_stale(&self, threshold: Duration) {
        for id in ID_MIN..=SLOT_COUNT as u8 {
            if self.entry(id).is_none() {
                continue;
            }
            match self.feedbacks[Self::index(id)].load_full() {
                None => debug!("Motor {} has not reported any feedback yet", id),
                Some(sample) => {
                    let age = sample.received_at.elapsed();
                    if age >= threshold {
                        warn!(
                            "No feedback from motor {} for {:?}, cycle rate may be too low or motor offline",
                            id, age
                        );
                    }
                },
            }
        }
    }

    fn entry(&self, id: u8) -> Option<MotorEntry> {
        *self.slots[Self::index(id)].read()
    }
}
