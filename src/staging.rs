//! 上传图片的本地暂存
//!
//! 数据库函数只能按路径读取图片，因此上传内容需要先落盘。
//! 每个请求独占一个随机命名的文件，[`StagedFile`] 离开作用域时删除该文件。

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use axum::body::Bytes;
use log::{debug, warn};
use tempfile::{Builder, TempPath};
use tokio::task::spawn_blocking;

/// 暂存文件名前缀，用于启动时清理残留文件
pub const STAGED_PREFIX: &str = "upload-";

/// 已落盘的上传文件
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    /// 在 `dir` 下创建唯一文件并写入 `data`
    pub fn create(dir: &Path, suffix: &str, data: &[u8]) -> Result<Self> {
        let mut builder = Builder::new();
        builder.prefix(STAGED_PREFIX).suffix(suffix).rand_bytes(16);
        // 数据库进程通常以其他用户身份运行
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o644));
        }

        let mut file = builder.tempfile_in(dir).context("Error creating file")?;
        file.write_all(data).context("Error writing file")?;
        file.flush().context("Error writing file")?;

        let path = file.into_temp_path();
        debug!("暂存上传文件: {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 显式删除文件，返回删除时的错误
    ///
    /// 不调用该方法时文件会在 drop 时删除，但错误会被忽略
    pub fn remove(self) -> io::Result<()> {
        self.path.close()
    }
}

/// 在阻塞线程池中暂存上传内容
///
/// 文件扩展名取自上传时的文件名，便于数据库端按扩展名识别格式
pub async fn stage(dir: &Path, file_name: Option<&str>, data: Bytes) -> Result<StagedFile> {
    let dir = dir.to_path_buf();
    let suffix = extension_suffix(file_name);
    spawn_blocking(move || StagedFile::create(&dir, &suffix, &data))
        .await
        .context("Error creating file")?
}

/// 删除目录中残留的暂存文件，返回删除的数量
///
/// 目录可能被多个实例共享，修改时间在 `max_age` 以内的文件视为仍在使用
pub fn sweep(dir: &Path, max_age: Duration) -> io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_staged = entry.file_name().to_str().is_some_and(|name| name.starts_with(STAGED_PREFIX));
        if !is_staged || !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        // 时钟回拨时 duration_since 失败，按新文件处理
        if !now.duration_since(modified).is_ok_and(|age| age >= max_age) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!("删除残留文件 {} 失败: {}", entry.path().display(), e),
        }
    }
    Ok(removed)
}

/// 从上传文件名中提取安全的扩展名，形如 `.jpg`
fn extension_suffix(file_name: Option<&str>) -> String {
    file_name
        .map(PathBuf::from)
        .as_deref()
        .and_then(Path::extension)
        .and_then(|ext| ext.to_str())
        .filter(|ext| (1..=8).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
