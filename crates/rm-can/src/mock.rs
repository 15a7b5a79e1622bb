//! Mock CAN 适配器（无硬件依赖）
//!
//! [`MockCanAdapter`] 实现 [`CanAdapter`]，供驱动层在没有真实总线的
//! 环境下跑完整的收发周期。配套的 [`MockBusHandle`] 与适配器共享
//! 同一份总线状态，测试代码用它注入反馈帧、检查已发送的指令帧、
//! 以及模拟发送失败。

use crate::{CanAdapter, CanError};
use rm_protocol::RmFrame;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockBusState {
    rx_queue: VecDeque<RmFrame>,
    sent: Vec<RmFrame>,
    fail_sends: bool,
}

/// 假总线适配器
pub struct MockCanAdapter {
    state: Arc<Mutex<MockBusState>>,
}

/// 测试侧的总线控制句柄
#[derive(Clone)]
pub struct MockBusHandle {
    state: Arc<Mutex<MockBusState>>,
}

impl MockCanAdapter {
    /// 创建一对（适配器, 控制句柄），二者共享总线状态
    pub fn new() -> (Self, MockBusHandle) {
        let state = Arc::new(Mutex::new(MockBusState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockBusHandle { state },
        )
    }
}

impl CanAdapter for MockCanAdapter {
    fn send(&mut self, frame: RmFrame) -> Result<(), CanError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(CanError::Io(io::Error::other("injected send failure")));
        }
        state.sent.push(frame);
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<RmFrame>, CanError> {
        Ok(self.state.lock().unwrap().rx_queue.pop_front())
    }
}

impl MockBusHandle {
    /// 向接收队列注入一帧（下一次 `try_receive` 可见）
    pub fn inject(&self, frame: RmFrame) {
        self.state.lock().unwrap().rx_queue.push_back(frame);
    }

    /// 已发送帧的快照（按发送顺序）
    pub fn sent_frames(&self) -> Vec<RmFrame> {
        self.state.lock().unwrap().sent.clone()
    }

    /// 清空已发送记录
    pub fn clear_sent(&self) {
        self.state.lock().unwrap().sent.clear();
    }

    /// 之后的所有 `send` 调用返回 IO 错误
    pub fn set_fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_receive_empty_returns_none() {
        let (mut adapter, _handle) = MockCanAdapter::new();
        assert!(adapter.try_receive().unwrap().is_none());
    }

    #[test]
    fn test_inject_then_receive_in_order() {
        let (mut adapter, handle) = MockCanAdapter::new();
        handle.inject(RmFrame::new(0x205, &[0; 8]));
        handle.inject(RmFrame::new(0x206, &[0; 8]));
        assert_eq!(adapter.try_receive().unwrap().unwrap().id, 0x205);
        assert_eq!(adapter.try_receive().unwrap().unwrap().id, 0x206);
        assert!(adapter.try_receive().unwrap().is_none());
    }

    #[test]
    fn test_send_recorded_and_failure_injection() {
        let (mut adapter, handle) = MockCanAdapter::new();
        adapter.send(RmFrame::new(0x1FF, &[0; 8])).unwrap();
        assert_eq!(handle.sent_frames().len(), 1);

        handle.set_fail_sends(true);
        assert!(adapter.send(RmFrame::new(0x1FF, &[0; 8])).is_err());
        assert_eq!(handle.sent_frames().len(), 1);
    }
}
