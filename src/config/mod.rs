//! 全局配置
//!
//! 从 TOML 文件加载，缺失的段和字段取默认值。加载后会做一次校验，
//! 非法取值在启动时就报错，不会留到规划或执行阶段。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{ConfigError, ConfigResult};
use crate::query::optimizer::optimizer_config::{OptimizerConfig, MAX_DP_NODES};
use crate::query::optimizer::join::bitset;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "groupdb".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

/// 执行阶段配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// 是否在计划根部包一层可取消游标
    pub check_cancellation: bool,
    /// flatten 游标待输出队列的告警阈值
    pub max_pending_rows: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            check_cancellation: true,
            max_pending_rows: 1024,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub log: LogConfig,
    pub optimizer: OptimizerConfig,
    pub execution: ExecutionConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let level = self.log.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid(
                "log.level",
                format!("未知的日志级别 {}", self.log.level),
            ));
        }
        if self.log.max_files == 0 {
            return Err(ConfigError::invalid("log.max_files", "至少保留一个日志文件"));
        }

        let opt = &self.optimizer;
        if opt.max_join_tables == 0 || opt.max_join_tables > bitset::CAPACITY {
            return Err(ConfigError::invalid(
                "optimizer.max_join_tables",
                format!("取值范围 1..={}", bitset::CAPACITY),
            ));
        }
        if opt.dp_threshold == 0 || opt.dp_threshold > MAX_DP_NODES {
            return Err(ConfigError::invalid(
                "optimizer.dp_threshold",
                format!("取值范围 1..={}", MAX_DP_NODES),
            ));
        }

        if self.execution.max_pending_rows == 0 {
            return Err(ConfigError::invalid(
                "execution.max_pending_rows",
                "必须大于 0",
            ));
        }
        Ok(())
    }
}
