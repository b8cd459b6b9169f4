use std::fmt;
use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;

use crate::config::SearchOptions;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("failed to build regex")
});

/// 允许使用的向量距离运算符
const DISTANCE_OPS: &[&str] = &["<->", "<=>", "<#>", "<+>"];

/// 排序查询的输入类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Image,
    Text,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 启动时拼接好的 SQL 语句
///
/// 表名、列名、函数名无法作为参数绑定，只能拼接进语句，因此在这里统一校验
#[derive(Debug, Clone)]
pub struct Queries {
    location: String,
    rank_by_image: String,
    rank_by_text: String,
}

impl Queries {
    pub fn new(opts: &SearchOptions) -> Result<Self> {
        let table = identifier(&opts.table)?;
        let column = identifier(&opts.vector_column)?;
        let image_fn = identifier(&opts.image_embed_fn)?;
        let text_fn = identifier(&opts.text_embed_fn)?;
        let op = distance_op(&opts.distance_op)?;

        Ok(Self {
            location: format!("SELECT location FROM {table} WHERE id = $1"),
            rank_by_image: rank_sql(table, column, op, image_fn),
            rank_by_text: rank_sql(table, column, op, text_fn),
        })
    }

    /// 根据 ID 查询图片路径，参数为 `$1 = id`
    pub fn location(&self) -> &str {
        &self.location
    }

    /// 相似度排序，参数为 `$1 = 图片路径或文本`、`$2 = 数量`
    pub fn rank(&self, kind: QueryKind) -> &str {
        match kind {
            QueryKind::Image => &self.rank_by_image,
            QueryKind::Text => &self.rank_by_text,
        }
    }
}

fn rank_sql(table: &str, column: &str, op: &str, embed_fn: &str) -> String {
    format!("SELECT id::int8 FROM {table} ORDER BY {column} {op} {embed_fn}($1) ASC LIMIT $2")
}

fn identifier(s: &str) -> Result<&str> {
    if !IDENTIFIER.is_match(s) {
        bail!("无效的 SQL 标识符: {:?}", s);
    }
    Ok(s)
}

fn distance_op(s: &str) -> Result<&str> {
    if !DISTANCE_OPS.contains(&s) {
        bail!("不支持的距离运算符: {:?}，可选值为 {:?}", s, DISTANCE_OPS);
    }
    Ok(s)
}
