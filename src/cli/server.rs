use anyhow::Context;
use clap::Parser;
use log::{error, info};
use prometheus::{BasicAuthentication, labels};
use tokio::net::TcpListener;
use tokio::task::spawn_blocking;
use tokio::time::{Duration, sleep};

use crate::cli::SubCommandExtend;
use crate::config::{SearchOptions, UploadOptions};
use crate::db::{self, PgImageStore, Queries};
use crate::server::{self, GatewayConfig};
use crate::{Opts, staging};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub search: SearchOptions,
    #[command(flatten)]
    pub upload: UploadOptions,
    /// 监听地址
    #[arg(long, env = "SEMSEARCH_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: String,
    /// prometheus 主动推送地址
    #[arg(long, value_name = "URL")]
    pub prometheus_push: Option<String>,
    /// 自定义 instance 标签值
    #[arg(long, value_name = "NAME")]
    pub prometheus_instance: Option<String>,
    /// prometheus 认证信息，格式为 username:password
    #[arg(long, value_name = "AUTH", value_parser = parse_auth)]
    pub prometheus_auth: Option<(String, String)>,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let queries = Queries::new(&self.search)?;

        // 数据库函数按路径读取暂存文件，必须使用绝对路径
        let upload_dir = &self.upload.upload_dir;
        tokio::fs::create_dir_all(upload_dir)
            .await
            .with_context(|| format!("无法创建暂存目录: {}", upload_dir.display()))?;
        let upload_dir = tokio::fs::canonicalize(upload_dir).await?;
        // 暂存文件的存活时间不超过一次查询超时，更新的文件可能属于其他实例
        let removed = staging::sweep(&upload_dir, opts.db.query_timeout() * 2)?;
        if removed > 0 {
            info!("清理残留暂存文件 {removed} 个");
        }
        info!("上传暂存目录: {}", upload_dir.display());

        let pool = db::init_db(&opts.db).await?;
        let store = PgImageStore::new(pool, queries);

        let config = GatewayConfig {
            upload_dir,
            max_upload_size: self.upload.max_upload_size,
            result_limit: self.search.result_limit,
            query_timeout: opts.db.query_timeout(),
        };

        // 创建应用状态
        let state = server::AppState::new(store, config);

        // 创建应用
        let app = server::create_app(state);

        if let Some(url) = self.prometheus_push.clone() {
            let instance = self.prometheus_instance.clone().unwrap_or_else(|| self.addr.clone());
            tokio::spawn(push_metrics(url, instance, self.prometheus_auth.clone()));
        }

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
        info!("服务器已停止");

        Ok(())
    }
}

/// 每 30 秒向 pushgateway 推送一次指标
async fn push_metrics(url: String, instance: String, auth: Option<(String, String)>) {
    loop {
        let metric_families = prometheus::gather();
        let url = url.clone();
        let instance = instance.clone();
        let auth = auth.clone();
        let r = spawn_blocking(move || {
            prometheus::push_metrics(
                "semsearch",
                labels! {
                    "instance".to_string() => instance,
                },
                &url,
                metric_families,
                auth.map(|(username, password)| BasicAuthentication { username, password }),
            )
        })
        .await;
        match r {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("推送指标失败: {e}"),
            Err(e) => error!("推送指标任务异常退出: {e}"),
        }
        sleep(Duration::from_secs(30)).await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("无法监听退出信号: {e}");
        std::future::pending::<()>().await;
    }
    info!("收到退出信号，等待请求处理完毕");
}

fn parse_auth(s: &str) -> anyhow::Result<(String, String)> {
    let (username, password) =
        s.split_once(':').context("认证信息格式应为 username:password")?;
    Ok((username.to_string(), password.to_string()))
}
