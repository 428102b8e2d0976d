//! 契约校验服务 - 业务能力层
//!
//! 只负责"按名称校验 JSON 实例"能力，不关心实例从哪里来
//!
//! 契约以 JSON Schema 文档形式存放在 `contracts/` 目录，
//! 可以从配置的目录加载，也可以使用编译进二进制的内置版本。

use jsonschema::Validator;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{AppResult, SchemaError};

/// 契约名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaName {
    QueryBundle,
    Paper,
    PaperCard,
    Review,
}

impl SchemaName {
    pub const ALL: [SchemaName; 4] = [
        SchemaName::QueryBundle,
        SchemaName::Paper,
        SchemaName::PaperCard,
        SchemaName::Review,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SchemaName::QueryBundle => "query_bundle",
            SchemaName::Paper => "paper",
            SchemaName::PaperCard => "paper_card",
            SchemaName::Review => "review",
        }
    }

    /// 契约文件名
    pub fn file_name(self) -> String {
        format!("{}.schema.json", self.name())
    }

    fn bundled_source(self) -> &'static str {
        match self {
            SchemaName::QueryBundle => include_str!("../../contracts/query_bundle.schema.json"),
            SchemaName::Paper => include_str!("../../contracts/paper.schema.json"),
            SchemaName::PaperCard => include_str!("../../contracts/paper_card.schema.json"),
            SchemaName::Review => include_str!("../../contracts/review.schema.json"),
        }
    }
}

impl std::fmt::Display for SchemaName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 契约校验器
///
/// 构造时一次性编译全部契约，任何一份加载失败都直接报错。
pub struct SchemaValidator {
    validators: HashMap<SchemaName, Validator>,
}

impl SchemaValidator {
    /// 使用内置契约
    pub fn bundled() -> AppResult<Self> {
        let mut validators = HashMap::new();
        for name in SchemaName::ALL {
            let document: Value = serde_json::from_str(name.bundled_source()).map_err(|e| {
                SchemaError::LoadFailed {
                    name: name.file_name(),
                    source: Box::new(e),
                }
            })?;
            validators.insert(name, compile(name, &document)?);
        }
        Ok(Self { validators })
    }

    /// 从目录加载契约（文件名见 [`SchemaName::file_name`]）
    pub fn from_dir(dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = dir.as_ref();
        let mut validators = HashMap::new();
        for name in SchemaName::ALL {
            let path = dir.join(name.file_name());
            debug!("加载契约: {}", path.display());
            let content = std::fs::read_to_string(&path).map_err(|e| SchemaError::LoadFailed {
                name: path.display().to_string(),
                source: Box::new(e),
            })?;
            let document: Value =
                serde_json::from_str(&content).map_err(|e| SchemaError::LoadFailed {
                    name: path.display().to_string(),
                    source: Box::new(e),
                })?;
            validators.insert(name, compile(name, &document)?);
        }
        Ok(Self { validators })
    }

    /// 校验实例，不符合时返回全部错误
    pub fn validate(&self, instance: &Value, schema: SchemaName) -> Result<(), SchemaError> {
        let validator = self
            .validators
            .get(&schema)
            .ok_or_else(|| SchemaError::InvalidSchema {
                name: schema.file_name(),
                message: "契约未加载".to_string(),
            })?;

        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Violation {
                name: schema.name().to_string(),
                errors,
            })
        }
    }

    /// 校验一个类型化的值（先序列化为 JSON）
    pub fn validate_typed<T: Serialize>(&self, value: &T, schema: SchemaName) -> Result<(), SchemaError> {
        let instance = serde_json::to_value(value).map_err(|source| SchemaError::Conversion {
            name: schema.name().to_string(),
            source,
        })?;
        self.validate(&instance, schema)
    }
}

fn compile(name: SchemaName, document: &Value) -> Result<Validator, SchemaError> {
    jsonschema::validator_for(document).map_err(|e| SchemaError::InvalidSchema {
        name: name.file_name(),
        message: e.to_string(),
    })
}
