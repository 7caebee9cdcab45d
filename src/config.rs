//! Конфигурация рантайма.
//!
//! Загружается из JSON; отсутствующие поля берутся из `Default`.
//!
//! ```json
//! { "thread_name_prefix": "worker", "thread_stack_size": 4194304 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SpindleError, SpindleResult};

/// Конфигурация рантайма.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Префикс имени нативного потока: `"{prefix}-{id}"`
    pub thread_name_prefix: String,
    /// Размер стека нативного потока (байт); `None` означает размер по умолчанию ОС
    pub thread_stack_size: Option<usize>,
    /// Остаток стека, при котором интерпретатор выделяет новый сегмент
    pub stack_red_zone: usize,
    /// Размер нового сегмента стека
    pub stack_growth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "spindle-thread".to_string(),
            thread_stack_size: None,
            stack_red_zone: 256 * 1024,    // 256KB
            stack_growth: 8 * 1024 * 1024, // 8MB
        }
    }
}

impl RuntimeConfig {
    /// Разобрать конфигурацию из JSON-строки.
    pub fn from_json_str(json: &str) -> SpindleResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Загрузить конфигурацию из файла.
    pub fn load(path: impl AsRef<Path>) -> SpindleResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        log::debug!("loading runtime config from {}", path.display());
        Self::from_json_str(&text)
    }

    fn validate(&self) -> SpindleResult<()> {
        if self.thread_name_prefix.contains('\0') {
            return Err(SpindleError::Config(
                "thread_name_prefix must not contain NUL".to_string(),
            ));
        }
        if self.stack_red_zone == 0 || self.stack_growth == 0 {
            return Err(SpindleError::Config(
                "stack_red_zone and stack_growth must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RuntimeConfig::from_json_str(r#"{ "thread_name_prefix": "worker" }"#).unwrap();
        assert_eq!(config.thread_name_prefix, "worker");
        assert_eq!(config.thread_stack_size, None);
        assert_eq!(config.stack_growth, RuntimeConfig::default().stack_growth);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            RuntimeConfig::from_json_str(r#"{ "stack_growth": 0 }"#),
            Err(SpindleError::Config(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_json_str("not json"),
            Err(SpindleError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "thread_stack_size": 1048576 }}"#).unwrap();

        let config = RuntimeConfig::load(file.path()).unwrap();
        assert_eq!(config.thread_stack_size, Some(1024 * 1024));
        assert_eq!(config.thread_name_prefix, "spindle-thread");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RuntimeConfig::load(dir.path().join("absent.json")),
            Err(SpindleError::IoError(_))
        ));
    }
}
