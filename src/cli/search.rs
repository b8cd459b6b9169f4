use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::debug;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, OutputFormat, SearchOptions};
use crate::db::{self, ImageStore, PgImageStore, Queries};
use crate::server::SearchResponse;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub search: SearchOptions,
    /// 搜索文本
    #[arg(long, value_name = "QUERY", required_unless_present = "image", conflicts_with = "image")]
    pub text: Option<String>,
    /// 被搜索的图片路径，数据库进程需要能读取该文件
    #[arg(long, value_name = "PATH")]
    pub image: Option<PathBuf>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let queries = Queries::new(&self.search)?;
        let limit = self.search.result_limit;

        let image = match &self.image {
            Some(image) => Some(
                std::fs::canonicalize(image)
                    .with_context(|| format!("无法读取图片: {}", image.display()))?,
            ),
            None => None,
        };
        let text = self.text.as_deref().map(str::trim);
        if text == Some("") {
            bail!("搜索文本不能为空");
        }

        let store = PgImageStore::new(db::init_db(&opts.db).await?, queries);

        let start = Instant::now();
        let mut ids = match (text, image) {
            (Some(text), _) => store.rank_by_text(text, limit).await?,
            (None, Some(image)) => store.rank_by_image(&image, limit).await?,
            (None, None) => bail!("需要指定 --text 或 --image"),
        };
        ids.truncate(limit as usize);
        debug!("搜索耗时: {:.2}ms", start.elapsed().as_secs_f64() * 1000.);

        print_result(&store, ids, self.output_format).await
    }
}

async fn print_result(store: &impl ImageStore, ids: Vec<i64>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&SearchResponse { ids })?)
        }
        OutputFormat::Table => {
            for (rank, id) in ids.iter().enumerate() {
                let location = store.image_location(*id).await?.unwrap_or_default();
                println!("{}\t{}\t{}", rank + 1, id, location);
            }
        }
    }
    Ok(())
}
