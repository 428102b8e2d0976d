use serde::{Deserialize, Serialize};

/// 检索策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 首轮
    Initial,
    /// 放宽
    Broaden,
    /// 收窄
    Narrow,
    /// 转向相邻领域
    ShiftDomain,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Initial => "initial",
            Strategy::Broaden => "broaden",
            Strategy::Narrow => "narrow",
            Strategy::ShiftDomain => "shift_domain",
        }
    }

    /// 每种策略固定的说明文字
    pub fn rationale(self) -> &'static str {
        match self {
            Strategy::Initial => "Initial query formulation.",
            Strategy::Broaden => "Expanding scope with broader terminology.",
            Strategy::Narrow => "Narrowing scope with constraints.",
            Strategy::ShiftDomain => "Shifting to adjacent domain vocabulary.",
        }
    }

    pub fn is_iteration(self) -> bool {
        self != Strategy::Initial
    }
}

/// 从字符串解析策略（精确匹配，`shift` 为 `shift_domain` 的简写）
impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(Strategy::Initial),
            "broaden" => Ok(Strategy::Broaden),
            "narrow" => Ok(Strategy::Narrow),
            "shift_domain" | "shift" => Ok(Strategy::ShiftDomain),
            other => Err(format!("未知策略: {}", other)),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 一轮检索的查询方案，生成后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryBundle {
    pub topic: String,
    pub round: u32,
    pub strategy: Strategy,
    pub rationale: String,
    pub core_terms: Vec<String>,
    pub synonyms: Vec<String>,
    pub narrow_terms: Vec<String>,
    pub exclude_terms: Vec<String>,
    pub domain_shift_terms: Vec<String>,
    /// 按优先级排序
    pub search_queries: Vec<String>,
}

impl QueryBundle {
    /// 优先级最高的查询
    pub fn primary_query(&self) -> Option<&str> {
        self.search_queries.first().map(String::as_str)
    }
}
