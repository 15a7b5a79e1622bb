//! 驱动句柄
//!
//! [`RmMotors`] 聚合一条总线会话和一张电机状态表，是初始化返回、
//! 其余所有操作共用的单元。指令/反馈 API 可以从任意多个线程并发
//! 调用；`run_once` 预期由单一逻辑上下文按节拍驱动（建议 ≥100Hz）。
//! 停机时 [`RmMotors::cleanup`] 自己驱动 IO 周期完成斜坡，不依赖
//! 应用侧的循环线程还活着。

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::session::{AtomicSessionState, SessionState};
use crate::table::MotorTable;
use parking_lot::Mutex;
use rm_can::CanAdapter;
use rm_protocol::{CmdMode, FbField, Feedback, MotorType, encode_command_frame};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[cfg(target_os = "linux")]
use rm_can::{CanDeviceError, CanDeviceErrorKind, SocketCanAdapter};
#[cfg(target_os = "linux")]
use rm_protocol::is_command_frame_id;

/// 打开总线后探测其他控制程序的监听窗口
#[cfg(target_os = "linux")]
const BUS_PROBE_WINDOW: Duration = Duration::from_millis(100);

/// RoboMaster 电机驱动句柄
///
/// 泛型参数是总线后端：生产环境用 `SocketCanAdapter`，测试用
/// `rm_can::mock::MockCanAdapter`。
pub struct RmMotors<A: CanAdapter> {
    /// 总线会话，`None` 表示已关闭。关闭是单向的。
    bus: Mutex<Option<A>>,
    table: MotorTable,
    state: AtomicSessionState,
    config: DriverConfig,
}

#[cfg(target_os = "linux")]
impl RmMotors<SocketCanAdapter> {
    /// 打开一个 CAN 接口（如 "can0"）
    ///
    /// 先裸听 100ms 确认没有别的程序在发电机指令，再安装反馈过滤
    /// 器。两个程序同时发指令帧会在总线上互相覆盖，宁可拒绝启动。
    ///
    /// # 错误
    /// - `CanDeviceErrorKind::NotFound` / `AccessDenied`: 接口问题
    /// - `CanDeviceErrorKind::Busy`: 总线上已有其他控制程序
    pub fn open(interface: &str) -> Result<Self, DriverError> {
        Self::open_with_config(interface, DriverConfig::default())
    }

    /// 以自定义配置打开
    pub fn open_with_config(
        interface: &str,
        config: DriverConfig,
    ) -> Result<Self, DriverError> {
        let mut adapter = SocketCanAdapter::new(interface)?;
        probe_for_competing_commander(&mut adapter)?;
        adapter.install_feedback_filter()?;
        info!("CAN interface '{}' opened", interface);
        Ok(Self::with_adapter_and_config(adapter, config))
    }
}

/// 监听一段时间，看总线上是否已有程序在发指令帧
#[cfg(target_os = "linux")]
fn probe_for_competing_commander(adapter: &mut SocketCanAdapter) -> Result<(), DriverError> {
    let deadline = std::time::Instant::now() + BUS_PROBE_WINDOW;
    while std::time::Instant::now() < deadline {
        match adapter.try_receive()? {
            Some(frame) if is_command_frame_id(frame.id) => {
                return Err(DriverError::Can(
                    CanDeviceError::new(
                        CanDeviceErrorKind::Busy,
                        format!(
                            "Another program is already commanding motors on '{}' (saw 0x{:X})",
                            adapter.interface(),
                            frame.id
                        ),
                    )
                    .into(),
                ));
            },
            Some(_) => {},
            None => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    Ok(())
}

impl<A: CanAdapter> RmMotors<A> {
    /// 用已经打开的适配器构建驱动（测试或自定义后端）
    pub fn with_adapter(adapter: A) -> Self {
        Self::with_adapter_and_config(adapter, DriverConfig::default())
    }

    pub fn with_adapter_and_config(adapter: A, config: DriverConfig) -> Self {
        Self {
            bus: Mutex::new(Some(adapter)),
            table: MotorTable::new(),
            state: AtomicSessionState::default(),
            config,
        }
    }

    /// 注册（或重新注册）一个电机
    ///
    /// 重新注册会覆盖型号与模式并把指令清零。
    pub fn register_motor(
        &self,
        id: u8,
        motor_type: MotorType,
        mode: CmdMode,
    ) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.table.register(id, motor_type, mode)
    }

    /// 更新一个电机的指令值（线程安全，最后写入者生效）
    ///
    /// 值的单位由模式决定：Voltage 为 V、Current 为 A、Torque 为
    /// N·m、Velocity 为 rad/s。超限的值截断到模式上限。
    pub fn set_cmd(&self, id: u8, mode: CmdMode, value: f64) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.table.set_command(id, mode, value)
    }

    /// 读取最近一次解码出的反馈量（物理单位）
    ///
    /// 注册之后、第一帧反馈解码之前返回 `NoData`，不会返回假零值。
    pub fn get_state(&self, id: u8, field: FbField) -> Result<f64, DriverError> {
        if self.state.get() == SessionState::Closed {
            return Err(DriverError::SessionClosed);
        }
        self.table.get_feedback(id, field)
    }

    /// 最近一帧原始反馈（定点原始值）
    pub fn raw_feedback(&self, id: u8) -> Result<Feedback, DriverError> {
        if self.state.get() == SessionState::Closed {
            return Err(DriverError::SessionClosed);
        }
        self.table.raw_feedback(id)
    }

    /// 执行一个 IO 周期：排空入站反馈，然后给每个活动帧组发一帧指令
    ///
    /// 本函数从不睡眠，节拍由调用方负责。单帧解码失败只丢该帧，
    /// 不会中断周期；发送失败作为 `Can` 错误返回，下个周期可重试。
    pub fn run_once(&self) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.cycle()
    }

    /// 斜坡停机并关闭总线会话
    ///
    /// 把每个电机的指令从当前值线性插值到零，按内部节拍自行驱动
    /// IO 周期（不依赖外部线程），随后释放总线。`ramp` 为零时指令
    /// 直接跳零。斜坡一旦开始不可取消；连续总线失败会短路剩余
    /// 步骤直接关闭。
    ///
    /// # 错误
    /// - `SessionClosed`: 已经调用过 cleanup（不会重复执行斜坡）
    pub fn cleanup(&self, ramp: Duration) -> Result<(), DriverError> {
        if !self
            .state
            .transition(SessionState::Open, SessionState::RampingDown)
        {
            return Err(DriverError::SessionClosed);
        }

        let initial = self.table.initial_commands();
        let period = self.config.cycle_period;
        let steps = if ramp.is_zero() {
            0
        } else {
            (ramp.as_secs_f64() / period.as_secs_f64()).ceil() as u32
        };
        info!(
            "Ramping {} motors down to zero over {:?} ({} steps)",
            initial.len(),
            ramp,
            steps
        );

        let mut consecutive_failures = 0u32;
        for step in 1..=steps {
            let scale = 1.0 - step as f64 / steps as f64;
            self.table.apply_scaled(&initial, scale);
            match self.cycle() {
                Ok(()) => consecutive_failures = 0,
                Err(e) => {
                    consecutive_failures += 1;
                    let fatal = matches!(&e, DriverError::Can(c) if c.is_fatal());
                    if fatal || consecutive_failures >= self.config.max_consecutive_send_failures {
                        error!("Aborting ramp-down after bus failure: {}", e);
                        break;
                    }
                    warn!(
                        "Bus error during ramp-down ({} consecutive): {}",
                        consecutive_failures, e
                    );
                },
            }
            if step < steps {
                spin_sleep::sleep(period);
            }
        }

        // 最后一帧必须是全零指令，之后才释放总线
        self.table.zero_all();
        if let Err(e) = self.cycle() {
            warn!("Failed to send final zero command: {}", e);
        }
        self.close_bus();
        self.state.set(SessionState::Closed);
        info!("Bus session closed");
        Ok(())
    }

    /// 会话是否已关闭
    pub fn is_closed(&self) -> bool {
        self.state.get() == SessionState::Closed
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.state.get() == SessionState::Open {
            Ok(())
        } else {
            Err(DriverError::SessionClosed)
        }
    }

    /// 一个完整的读-解-编-写周期（不检查会话状态，停机路径也走这里）
    fn cycle(&self) -> Result<(), DriverError> {
        let mut guard = self.bus.lock();
        let bus = guard.as_mut().ok_or(DriverError::SessionClosed)?;

        let mut drained = 0usize;
        while drained < self.config.rx_budget {
            match bus.try_receive() {
                Ok(Some(frame)) => {
                    self.table.ingest(frame);
                    drained += 1;
                },
                Ok(None) => break,
                Err(e) => {
                    // 单次接收失败不致命，本周期剩下的工作照做
                    warn!("Receive failed, continuing cycle: {}", e);
                    break;
                },
            }
        }

        self.table.log_stale(self.config.stale_after);

        for (frame_id, range) in self.table.pending_frames() {
            let raw = self.table.snapshot_group(range);
            bus.send(encode_command_frame(frame_id, &raw))?;
        }
        Ok(())
    }

    /// 释放总线句柄，重复调用是空操作
    fn close_bus(&self) {
        if self.bus.lock().take().is_some() {
            debug!("CAN adapter released");
        }
    }
}

impl<A: CanAdapter> Drop for RmMotors<A> {
    fn drop(&mut self) {
        // 安全网：没走 cleanup 就析构时，至少把指令跳零再放手
        if self
            .state
            .transition(SessionState::Open, SessionState::RampingDown)
        {
            warn!("Driver dropped without cleanup(), jumping commands to zero");
            self.table.zero_all();
            if let Err(e) = self.cycle() {
                debug!("Final zero command failed during drop: {}", e);
            }
            self.close_bus();
            self.state.set(SessionState::Closed);
        }
    }
}
