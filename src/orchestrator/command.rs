//! 控制台命令解析

use crate::models::Strategy;

/// 控制台命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Topic(String),
    Bundle,
    Search,
    Results,
    Iterate(Strategy),
    Select(Vec<String>),
    Basket,
    Cards,
    Review,
    Export(Option<String>),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
命令:
  topic <主题>        提交研究主题，生成首轮查询方案
  bundle              查看当前查询方案
  search              用首条查询检索
  results             查看检索结果
  broaden|narrow|shift  换策略迭代并检索（最多 3 轮）
  select <id>...      把结果中的论文加入篮子
  basket              查看篮子
  cards               为篮子里的论文生成卡片
  review              生成综述草稿
  export [路径]       导出综述为 Markdown
  status              查看会话状态
  help                显示帮助
  quit                退出";

impl Command {
    /// 解析一行输入，空行返回 `Ok(None)`
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        let command = match head.to_lowercase().as_str() {
            "topic" => {
                if rest.is_empty() {
                    return Err("用法: topic <主题>".to_string());
                }
                Command::Topic(rest.to_string())
            }
            "bundle" => Command::Bundle,
            "search" => Command::Search,
            "results" => Command::Results,
            "select" | "add" => {
                let ids: Vec<String> = rest
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect();
                if ids.is_empty() {
                    return Err("用法: select <id>...".to_string());
                }
                Command::Select(ids)
            }
            "basket" => Command::Basket,
            "cards" => Command::Cards,
            "review" => Command::Review,
            "export" => Command::Export((!rest.is_empty()).then(|| rest.to_string())),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => match other.parse::<Strategy>() {
                Ok(strategy) if strategy.is_iteration() => Command::Iterate(strategy),
                _ => return Err(format!("未知命令: {}（输入 help 查看帮助）", other)),
            },
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_keeps_full_text() {
        assert_eq!(
            Command::parse("topic  graph neural networks ").unwrap(),
            Some(Command::Topic("graph neural networks".to_string()))
        );
        assert!(Command::parse("topic").is_err());
    }

    #[test]
    fn test_iteration_commands() {
        assert_eq!(Command::parse("broaden").unwrap(), Some(Command::Iterate(Strategy::Broaden)));
        assert_eq!(Command::parse("shift").unwrap(), Some(Command::Iterate(Strategy::ShiftDomain)));
        assert!(Command::parse("initial").is_err());
    }

    #[test]
    fn test_select_splits_ids() {
        assert_eq!(
            Command::parse("select 1234.5678, 2345.6789 3456.7890").unwrap(),
            Some(Command::Select(vec![
                "1234.5678".to_string(),
                "2345.6789".to_string(),
                "3456.7890".to_string(),
            ]))
        );
    }

    #[test]
    fn test_blank_and_unknown() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert!(Command::parse("frobnicate").is_err());
        assert_eq!(Command::parse("export").unwrap(), Some(Command::Export(None)));
    }
}
