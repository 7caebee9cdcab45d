//! Дескриптор потока: запуск, состояние, join, auto-join при удалении.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::config::RuntimeConfig;
use crate::error::{SpindleError, SpindleResult};
use crate::value::Value;

use super::capture::ClosureUnit;
use super::context::ExecutionContext;
use super::join::{ErrorInfo, JoinCoordinator, ThreadState};

/// Глобальный счётчик ID потоков.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Публикует Failed, если рабочий поток выходит, ничего не опубликовав.
struct PublishGuard {
    id: u64,
    coordinator: Arc<JoinCoordinator>,
}

impl Drop for PublishGuard {
    fn drop(&mut self) {
        if !self.coordinator.is_terminal() {
            log::error!("thread #{} exited without publishing a result", self.id);
            self.coordinator.publish(ThreadState::Failed(ErrorInfo::new(
                self.id,
                "thread terminated without a result",
            )));
        }
    }
}

/// Общая часть всех копий дескриптора. Нативный поток принадлежит только ей.
struct HandleInner {
    id: u64,
    coordinator: Arc<JoinCoordinator>,
    native: Mutex<Option<JoinHandle<()>>>,
}

impl HandleInner {
    /// Дождаться выхода нативного потока, если он ещё не собран.
    fn reap(&self) {
        let native = self
            .native
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(native) = native {
            Self::join_native(self.id, native);
        }
    }

    fn join_native(id: u64, native: JoinHandle<()>) {
        if native.thread().id() == thread::current().id() {
            return;
        }
        if native.join().is_err() {
            log::error!("native thread of #{} panicked outside the worker", id);
        }
    }
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        let native = self
            .native
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(native) = native {
            log::debug!("auto-joining thread #{} on drop", self.id);
            Self::join_native(self.id, native);
        }
    }
}

/// Дескриптор потока. Копии разделяют одно состояние.
#[derive(Clone)]
pub struct ThreadHandle {
    inner: Arc<HandleInner>,
}

impl ThreadHandle {
    /// Запустить единицу работы в новом нативном потоке.
    pub fn spawn(unit: ClosureUnit, config: Arc<RuntimeConfig>) -> SpindleResult<Self> {
        let context_config = Arc::clone(&config);
        Self::spawn_with(&config, move || {
            ExecutionContext::new(unit, context_config).run()
        })
    }

    /// Запустить произвольную работу под координатором join.
    ///
    /// Ошибка и паника в `work` публикуются как Failed.
    pub fn spawn_with<F>(config: &RuntimeConfig, work: F) -> SpindleResult<Self>
    where
        F: FnOnce() -> SpindleResult<Value> + Send + 'static,
    {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let coordinator = Arc::new(JoinCoordinator::new());

        let mut builder =
            thread::Builder::new().name(format!("{}-{}", config.thread_name_prefix, id));
        if let Some(size) = config.thread_stack_size {
            builder = builder.stack_size(size);
        }

        let worker_coordinator = Arc::clone(&coordinator);
        let native = builder
            .spawn(move || {
                let guard = PublishGuard {
                    id,
                    coordinator: worker_coordinator,
                };
                run_worker(guard, work)
            })
            .map_err(|e| {
                log::error!("failed to spawn thread #{}: {}", id, e);
                SpindleError::Concurrency("cannot create a new thread.".to_string())
            })?;

        log::debug!("spawned thread #{}", id);
        Ok(Self {
            inner: Arc::new(HandleInner {
                id,
                coordinator,
                native: Mutex::new(Some(native)),
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Снимок текущего состояния.
    pub fn state(&self) -> ThreadState {
        self.inner.coordinator.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.inner.coordinator.is_terminal()
    }

    /// Дождаться завершения и вернуть результат.
    ///
    /// Упавший поток даёт `Value::Error` с сообщением ошибки. Повторный
    /// join возвращает то же значение без ожидания.
    pub fn join(&self) -> Value {
        match self.join_outcome() {
            Ok(value) => value,
            Err(info) => Value::Error(info.message),
        }
    }

    /// Как `join`, но различает успешное завершение и ошибку.
    pub fn join_outcome(&self) -> Result<Value, ErrorInfo> {
        log::trace!("joining thread #{}", self.inner.id);
        let outcome = self.inner.coordinator.wait();
        self.inner.reap();
        outcome
    }
}

impl PartialEq for ThreadHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl fmt::Debug for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadHandle")
            .field("id", &self.inner.id)
            .field("state", &self.state().name())
            .finish()
    }
}

/// Запустить через захват значения: `spawn(f, args)`.
pub fn spawn(callable: &Value, args: Vec<Value>) -> SpindleResult<ThreadHandle> {
    let unit = super::capture::capture(callable, args)?;
    ThreadHandle::spawn(unit, Arc::new(RuntimeConfig::default()))
}

fn run_worker<F>(guard: PublishGuard, work: F)
where
    F: FnOnce() -> SpindleResult<Value>,
{
    let id = guard.id;
    let outcome = match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(Ok(value)) => {
            log::debug!("thread #{} finished", id);
            ThreadState::Finished(value)
        }
        Ok(Err(err)) => {
            log::warn!("thread #{} failed: {}", id, err);
            ThreadState::Failed(ErrorInfo::from_error(id, &err))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("thread #{} panicked: {}", id, message);
            ThreadState::Failed(ErrorInfo::new(id, format!("panic: {}", message)))
        }
    };
    guard.coordinator.publish(outcome);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use std::time::{Duration, Instant};

    fn callable(src: &str) -> Value {
        Interpreter::new().eval_source(src).unwrap()
    }

    #[test]
    fn test_join_returns_body_value() {
        let handle = spawn(&callable(r#"(lambda () "test")"#), vec![]).unwrap();
        assert_eq!(handle.join(), Value::from("test"));
        assert_eq!(handle.state(), ThreadState::Finished(Value::from("test")));
    }

    #[test]
    fn test_join_empty_body_is_nil() {
        let handle = spawn(&callable("(lambda ())"), vec![]).unwrap();
        assert_eq!(handle.join(), Value::Nil);
    }

    #[test]
    fn test_join_is_idempotent() {
        let handle = spawn(&callable("(lambda (x) (* x 2))"), vec![Value::Int(21)]).unwrap();
        let first = handle.join();
        let copy = handle.clone();
        assert_eq!(first, Value::Int(42));
        assert_eq!(handle.join(), first);
        assert_eq!(copy.join(), first);
    }

    #[test]
    fn test_spawn_does_not_block() {
        let slow = callable("(lambda () (sleep 300) 1)");
        let start = Instant::now();
        let handle = spawn(&slow, vec![]).unwrap();
        assert!(start.elapsed() < Duration::from_millis(250));
        assert!(!handle.is_finished());
        assert_eq!(handle.join(), Value::Int(1));
        assert!(handle.is_finished());
    }

    #[test]
    fn test_join_finished_thread_is_immediate() {
        let handle = spawn(&callable("(lambda () 5)"), vec![]).unwrap();
        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        let start = Instant::now();
        assert_eq!(handle.join(), Value::Int(5));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_failed_thread_joins_to_error() {
        let handle = spawn(&callable(r#"(lambda () (throw "broken"))"#), vec![]).unwrap();
        assert_eq!(handle.join(), Value::Error("broken".to_string()));
        assert_eq!(handle.state().name(), "failed");
        assert_eq!(
            handle.join_outcome(),
            Err(ErrorInfo::new(handle.id(), "broken"))
        );
    }

    #[test]
    fn test_panic_is_published_as_failed() {
        let handle =
            ThreadHandle::spawn_with(&RuntimeConfig::default(), || panic!("kaboom")).unwrap();
        match handle.join_outcome() {
            Err(info) => assert!(info.message.contains("kaboom")),
            other => panic!("Expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_thread_name_uses_config_prefix() {
        let config = RuntimeConfig {
            thread_name_prefix: "worker".to_string(),
            thread_stack_size: Some(4 * 1024 * 1024),
            ..RuntimeConfig::default()
        };
        let handle = ThreadHandle::spawn_with(&config, || {
            Ok(Value::String(
                thread::current().name().unwrap_or_default().to_string(),
            ))
        })
        .unwrap();
        assert_eq!(handle.join(), Value::String(format!("worker-{}", handle.id())));
    }

    #[test]
    fn test_ids_are_unique() {
        let f = callable("(lambda () nil)");
        let a = spawn(&f, vec![]).unwrap();
        let b = spawn(&f, vec![]).unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        a.join();
        b.join();
    }

    #[test]
    fn test_drop_without_join_waits_for_thread() {
        let handle = ThreadHandle::spawn_with(&RuntimeConfig::default(), || {
            thread::sleep(Duration::from_millis(30));
            Ok(Value::Nil)
        })
        .unwrap();
        let coordinator = Arc::clone(&handle.inner.coordinator);
        drop(handle);
        assert!(coordinator.is_terminal());
    }
}
