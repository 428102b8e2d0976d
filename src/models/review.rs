use serde::{Deserialize, Serialize};

/// 综述草稿
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub topic: String,
    pub mode: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub sections: Vec<ReviewSection>,
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSection {
    pub heading: String,
    pub content_markdown: String,
    pub paper_ids: Vec<String>,
}

/// 参考文献，每篇购物篮论文一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub paper_id: String,
    pub citation_text: String,
    pub url: Option<String>,
}

impl Review {
    /// 综述中出现过的全部论文 ID（章节 + 参考文献）
    pub fn cited_ids(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .flat_map(|s| s.paper_ids.iter())
            .chain(self.references.iter().map(|r| &r.paper_id))
            .map(String::as_str)
    }
}
