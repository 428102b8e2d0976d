use serde::Serialize;

use super::paper::Paper;

/// 用户挑选的论文集合，按 ID 去重
///
/// 同一 ID 再次加入时用新版本覆盖旧版本（保留原位置），
/// 新论文追加在末尾，下游生成因此看到稳定的顺序。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Basket {
    papers: Vec<Paper>,
}

impl Basket {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或覆盖，返回是否为新论文
    pub fn upsert(&mut self, paper: Paper) -> bool {
        match self.papers.iter_mut().find(|p| p.id == paper.id) {
            Some(existing) => {
                *existing = paper;
                false
            }
            None => {
                self.papers.push(paper);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Paper> {
        self.papers.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.papers.iter().map(|p| p.id.as_str())
    }
}
