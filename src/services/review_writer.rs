//! 综述导出服务 - 业务能力层
//!
//! 只负责"把综述写成 Markdown 文件"能力，不关心综述怎么来的

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, FileError};
use crate::models::Review;

/// 综述导出服务
///
/// 职责：
/// - 把综述渲染为 Markdown
/// - 写入 `<output_dir>/review_<时间戳>.md`
pub struct ReviewWriter {
    output_dir: PathBuf,
}

impl ReviewWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 写入默认路径，返回文件路径
    pub async fn write(&self, review: &Review) -> AppResult<PathBuf> {
        let file_name = format!("review_{}.md", chrono::Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.output_dir.join(file_name);
        self.write_to(review, &path).await?;
        Ok(path)
    }

    /// 写入指定路径，必要时创建父目录
    pub async fn write_to(&self, review: &Review, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FileError::CreateDirFailed {
                    path: parent.display().to_string(),
                    source,
                })?;
        }

        let markdown = render_markdown(review);
        debug!("写入综述: {} ({} 字节)", path.display(), markdown.len());

        tokio::fs::write(path, markdown)
            .await
            .map_err(|source| AppError::file_write_failed(path.display().to_string(), source))?;

        info!("💾 综述已导出: {}", path.display());
        Ok(())
    }
}

/// 渲染为 Markdown
pub fn render_markdown(review: &Review) -> String {
    let mut out = format!("# {}\n\n{}\n\n", review.title, review.abstract_text);

    for section in &review.sections {
        out.push_str(&format!("## {}\n{}\n\n", section.heading, section.content_markdown));
    }

    out.push_str("## References\n");
    for reference in &review.references {
        out.push_str(&format!("- {}\n", reference.citation_text));
    }
    out
}
