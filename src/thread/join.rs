//! Координатор join: мьютекс с состоянием и условная переменная.
//!
//! Поток-владелец публикует терминальное состояние ровно один раз;
//! любое число ожидающих просыпается через `notify_all`.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::SpindleError;
use crate::value::Value;

/// Состояние потока.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadState {
    Running,
    Finished(Value),
    Failed(ErrorInfo),
}

impl ThreadState {
    /// Имя состояния, как его видит скрипт.
    pub fn name(&self) -> &'static str {
        match self {
            ThreadState::Running => "running",
            ThreadState::Finished(_) => "finished",
            ThreadState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ThreadState::Running)
    }
}

/// Описание ошибки, завершившей поток.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub thread_id: u64,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(thread_id: u64, message: impl Into<String>) -> Self {
        Self {
            thread_id,
            message: message.into(),
        }
    }

    /// Для `throw` сохраняется исходное сообщение, для остальных ошибок их текст.
    pub fn from_error(thread_id: u64, err: &SpindleError) -> Self {
        let message = match err {
            SpindleError::Thrown(msg) => msg.clone(),
            other => other.to_string(),
        };
        Self::new(thread_id, message)
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread #{}: {}", self.thread_id, self.message)
    }
}

impl From<ErrorInfo> for SpindleError {
    fn from(info: ErrorInfo) -> Self {
        SpindleError::RuntimeFailure {
            thread_id: info.thread_id,
            message: info.message,
        }
    }
}

/// Синхронизация между потоком-владельцем и ожидающими.
#[derive(Debug)]
pub struct JoinCoordinator {
    state: Mutex<ThreadState>,
    done: Condvar,
}

impl Default for JoinCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl JoinCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ThreadState::Running),
            done: Condvar::new(),
        }
    }

    // Состояние меняется одним присваиванием, поэтому после паники
    // под блокировкой оно всё равно согласовано.
    fn lock(&self) -> MutexGuard<'_, ThreadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Опубликовать терминальное состояние и разбудить всех ожидающих.
    ///
    /// Возвращает `false`, если состояние уже было опубликовано: повторная
    /// публикация игнорируется.
    pub fn publish(&self, outcome: ThreadState) -> bool {
        if !outcome.is_terminal() {
            log::warn!("ignoring attempt to publish a non-terminal thread state");
            return false;
        }

        let mut state = self.lock();
        if state.is_terminal() {
            log::warn!(
                "thread state already published as {}, ignoring {}",
                state.name(),
                outcome.name()
            );
            return false;
        }
        *state = outcome;
        drop(state);

        self.done.notify_all();
        true
    }

    /// Дождаться терминального состояния. Не блокирует, если оно уже есть.
    pub fn wait(&self) -> Result<Value, ErrorInfo> {
        let mut state = self.lock();
        loop {
            match &*state {
                ThreadState::Finished(value) => return Ok(value.clone()),
                ThreadState::Failed(info) => return Err(info.clone()),
                ThreadState::Running => {}
            }
            state = self
                .done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Снимок текущего состояния.
    pub fn snapshot(&self) -> ThreadState {
        self.lock().clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.lock().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_publish_once() {
        let coordinator = JoinCoordinator::new();
        assert!(coordinator.publish(ThreadState::Finished(Value::Int(1))));
        assert!(!coordinator.publish(ThreadState::Finished(Value::Int(2))));
        assert!(!coordinator.publish(ThreadState::Failed(ErrorInfo::new(1, "late"))));
        assert_eq!(coordinator.wait(), Ok(Value::Int(1)));
    }

    #[test]
    fn test_running_is_not_publishable() {
        let coordinator = JoinCoordinator::new();
        assert!(!coordinator.publish(ThreadState::Running));
        assert_eq!(coordinator.snapshot(), ThreadState::Running);
    }

    #[test]
    fn test_wait_wakes_all_joiners() {
        let coordinator = Arc::new(JoinCoordinator::new());
        let joiners: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&coordinator);
                thread::spawn(move || c.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        coordinator.publish(ThreadState::Failed(ErrorInfo::new(9, "boom")));

        for joiner in joiners {
            assert_eq!(joiner.join().unwrap(), Err(ErrorInfo::new(9, "boom")));
        }
    }

    #[test]
    fn test_error_info_from_thrown_keeps_message() {
        let info = ErrorInfo::from_error(3, &SpindleError::Thrown("bad".into()));
        assert_eq!(info.message, "bad");
        let err: SpindleError = info.into();
        assert_eq!(err.to_string(), "Thread #3 failed: bad");
    }
}
