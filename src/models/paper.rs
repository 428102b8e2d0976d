use serde::{Deserialize, Serialize};

/// 检索结果中的一篇论文（由检索适配器创建，下游只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub provider: String,
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub published_year: i32,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub pdf_url: Option<String>,
    pub categories: Vec<String>,
    pub score: Option<f64>,
}

impl Paper {
    /// 引用格式：前三位作者 (年份). 标题.
    pub fn citation(&self) -> String {
        let authors = self
            .authors
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} ({}). {}.", authors, self.published_year, self.title)
            .trim()
            .to_string()
    }
}
