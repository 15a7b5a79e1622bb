//! # RM Driver
//!
//! RoboMaster 电机（GM6020 / M3508 / M2006）驱动核心：
//!
//! - **电机状态表**：每电机一份配置、最新指令值、最新反馈采样，
//!   读写方全部无阻塞并发安全
//! - **IO 周期** [`RmMotors::run_once`]：排空入站反馈帧并解码，再按
//!   帧组合并发出指令帧（编码永远读整组，单电机更新不会破坏同组
//!   其他电机的指令）
//! - **指令/反馈 API** [`RmMotors::set_cmd`] / [`RmMotors::get_state`]：
//!   可与 IO 周期从不同线程并发调用
//! - **斜坡停机** [`RmMotors::cleanup`]：指令线性降到零后关闭总线，
//!   由驱动自己驱动 IO 周期，不依赖应用线程
//!
//! ## 典型用法
//!
//! ```no_run
//! use rm_driver::{CmdMode, FbField, MotorType, RmMotors};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), rm_driver::DriverError> {
//! let driver = RmMotors::open("can0")?;
//! driver.register_motor(1, MotorType::GM6020, CmdMode::Voltage)?;
//! driver.set_cmd(1, CmdMode::Voltage, 3.0)?;
//! for _ in 0..100 {
//!     driver.run_once()?;
//!     std::thread::sleep(Duration::from_millis(10));
//! }
//! let velocity = driver.get_state(1, FbField::Velocity)?;
//! println!("motor 1: {velocity:.2} rad/s");
//! driver.cleanup(Duration::from_secs(1))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod session;

pub(crate) mod table;

pub use config::DriverConfig;
pub use driver::RmMotors;
pub use error::DriverError;
pub use session::SessionState;

// 重新导出下层常用类型
pub use rm_can::{CanAdapter, CanError};
pub use rm_protocol::{CmdMode, FbField, Feedback, MotorType};
