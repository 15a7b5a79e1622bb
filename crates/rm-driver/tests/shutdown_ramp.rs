//! 斜坡停机与会话生命周期测试

use rm_can::{MockBusHandle, MockCanAdapter};
use rm_driver::{CmdMode, DriverConfig, DriverError, FbField, MotorType, RmMotors};
use rm_protocol::command_raw_at;
use std::time::Duration;

fn new_driver(config: DriverConfig) -> (RmMotors<MockCanAdapter>, MockBusHandle) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let (adapter, handle) = MockCanAdapter::new();
    (RmMotors::with_adapter_and_config(adapter, config), handle)
}

fn fast_config() -> DriverConfig {
    DriverConfig {
        cycle_period: Duration::from_millis(2),
        ..DriverConfig::default()
    }
}

#[test]
fn test_cleanup_zero_ramp_jumps_to_zero() {
    let (driver, bus) = new_driver(fast_config());
    driver
        .register_motor(1, MotorType::GM6020, CmdMode::Voltage)
        .unwrap();
    driver.set_cmd(1, CmdMode::Voltage, 12.0).unwrap();
    driver.run_once().unwrap();
    bus.clear_sent();

    driver.cleanup(Duration::ZERO).unwrap();

    // 下一帧（也是最后一帧）就是全零指令，随后会话立即关闭
    let sent = bus.sent_frames();
    assert_eq!(sent.len(), 1);
    assert_eq!(command_raw_at(&sent[0], 0), 0);
    assert!(driver.is_closed());
}

#[test]
fn test_ramp_is_monotonic_and_reaches_zero() {
    let (driver, bus) = new_driver(fast_config());
    driver
        .register_motor(1, MotorType::GM6020, CmdMode::Voltage)
        .unwrap();
    driver.set_cmd(1, CmdMode::Voltage, 12.0).unwrap();

    // 2ms 节拍、20ms 斜坡：10 步 + 最后一帧全零
    driver.cleanup(Duration::from_millis(20)).unwrap();

    let values: Vec<i16> = bus
        .sent_frames()
        .iter()
        .map(|frame| command_raw_at(frame, 0))
        .collect();
    assert_eq!(values.len(), 11);
    assert_eq!(*values.last().unwrap(), 0);
    for pair in values.windows(2) {
        assert!(
            pair[1].abs() <= pair[0].abs(),
            "ramp not monotonic: {:?}",
            values
        );
    }
    assert!(driver.is_closed());
}

#[test]
fn test_ramp_from_negative_command() {
    let (driver, bus) = new_driver(fast_config());
    driver
        .register_motor(3, MotorType::GM6020, CmdMode::Voltage)
        .unwrap();
    driver.set_cmd(3, CmdMode::Voltage, -18.0).unwrap();

    driver.cleanup(Duration::from_millis(10)).unwrap();

    let values: Vec<i16> = bus
        .sent_frames()
        .iter()
        .map(|frame| command_raw_at(frame, 2))
        .collect();
    assert_eq!(*values.last().unwrap(), 0);
    for pair in values.windows(2) {
        assert!(pair[1].abs() <= pair[0].abs());
        // 符号在到零之前保持不变
        assert!(pair[1] <= 0);
    }
}

#[test]
fn test_cleanup_is_not_rerun() {
    let (driver, bus) = new_driver(fast_config());
    driver
        .register_motor(1, MotorType::GM6020, CmdMode::Voltage)
        .unwrap();
    driver.cleanup(Duration::ZERO).unwrap();
    let sent_after_first = bus.sent_frames().len();

    // 第二次 cleanup 返回 SessionClosed，不会再跑一遍斜坡
    assert!(matches!(
        driver.cleanup(Duration::from_millis(20)),
        Err(DriverError::SessionClosed)
    ));
    assert_eq!(bus.sent_frames().len(), sent_after_first);
}

#[test]
fn test_api_after_close_fails() {
    let (driver, _bus) = new_driver(fast_config());
    driver
        .register_motor(1, MotorType::GM6020, CmdMode::Voltage)
        .unwrap();
    driver.cleanup(Duration::ZERO).unwrap();

    assert!(matches!(
        driver.set_cmd(1, CmdMode::Voltage, 1.0),
        Err(DriverError::SessionClosed)
    ));
    assert!(matches!(driver.run_once(), Err(DriverError::SessionClosed)));
    assert!(matches!(
        driver.get_state(1, FbField::Position),
        Err(DriverError::SessionClosed)
    ));
    assert!(matches!(
        driver.register_motor(2, MotorType::GM6020, CmdMode::Voltage),
        Err(DriverError::SessionClosed)
    ));
}

#[test]
fn test_ramp_aborts_after_consecutive_bus_failures() {
    let (driver, bus) = new_driver(fast_config());
    driver
        .register_motor(1, MotorType::GM6020, CmdMode::Voltage)
        .unwrap();
    driver.set_cmd(1, CmdMode::Voltage, 12.0).unwrap();

    bus.set_fail_sends(true);
    // 总线持续失败：斜坡短路，cleanup 仍然要把会话关掉而不是卡死
    driver.cleanup(Duration::from_millis(200)).unwrap();

    assert!(driver.is_closed());
    assert!(bus.sent_frames().is_empty());
}

#[test]
fn test_drop_without_cleanup_sends_zero() {
    let _ = tracing_subscriber::fmt().try_init();
    let (adapter, bus) = MockCanAdapter::new();
    {
        let driver = RmMotors::with_adapter(adapter);
        driver
            .register_motor(1, MotorType::GM6020, CmdMode::Voltage)
            .unwrap();
        driver.set_cmd(1, CmdMode::Voltage, 10.0).unwrap();
        driver.run_once().unwrap();
        bus.clear_sent();
        // 析构时的安全网
    }
    let sent = bus.sent_frames();
    assert_eq!(sent.len(), 1);
    assert_eq!(command_raw_at(&sent[0], 0), 0);
}
