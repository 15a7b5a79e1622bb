//! 会话生命周期状态
//!
//! `Open → RampingDown → Closed`，只能前进不能回退。
//! RampingDown 阶段由停机控制器独占总线发送权。

use std::sync::atomic::{AtomicU8, Ordering};

/// 总线会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    /// 正常运行，所有 API 可用
    #[default]
    Open = 0,

    /// 斜坡停机进行中，指令与 IO 周期 API 已对外关闭
    RampingDown = 1,

    /// 总线已释放
    Closed = 2,
}

impl SessionState {
    /// 从 u8 转换，无效值按 Closed 处理
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Open,
            1 => Self::RampingDown,
            _ => Self::Closed,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 会话状态（原子版本，用于线程间共享）
///
/// 状态读取用 Acquire、写入用 Release：状态变为 Closed 之前的
/// 总线操作对之后的读取方可见。
#[derive(Debug)]
pub struct AtomicSessionState {
    inner: AtomicU8,
}

impl AtomicSessionState {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    /// 当前状态
    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    /// 无条件设置状态
    pub fn set(&self, state: SessionState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 仅当当前状态为 `current` 时推进到 `next`
    ///
    /// 返回是否成功。停机控制器靠它保证斜坡只会启动一次。
    pub fn transition(&self, current: SessionState, next: SessionState) -> bool {
        self.inner
            .compare_exchange(
                current.as_u8(),
                next.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl Default for AtomicSessionState {
    fn default() -> Self {
        Self::new(SessionState::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8() {
        assert_eq!(SessionState::from_u8(0), SessionState::Open);
        assert_eq!(SessionState::from_u8(1), SessionState::RampingDown);
        assert_eq!(SessionState::from_u8(2), SessionState::Closed);
        assert_eq!(SessionState::from_u8(255), SessionState::Closed);
    }

    #[test]
    fn test_transition_only_from_expected_state() {
        let state = AtomicSessionState::default();
        assert_eq!(state.get(), SessionState::Open);

        assert!(state.transition(SessionState::Open, SessionState::RampingDown));
        assert_eq!(state.get(), SessionState::RampingDown);

        // 第二次从 Open 出发的转换必须失败
        assert!(!state.transition(SessionState::Open, SessionState::RampingDown));

        state.set(SessionState::Closed);
        assert_eq!(state.get(), SessionState::Closed);
    }
}
