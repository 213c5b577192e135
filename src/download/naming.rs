use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

const MAX_SUFFIX: usize = 10_000;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 根据响应的 Content-Type 推断扩展名，未知类型按 jpeg 处理
pub fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match essence.as_str() {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/jpeg" | "image/jpg" => "jpeg",
        _ => "jpeg",
    }
}

/// `image_001.jpeg`，冲突时 `image_001_1.jpeg`、`image_001_2.jpeg` ...
pub fn artifact_file_name(index: usize, suffix: usize, extension: &str) -> String {
    if suffix == 0 {
        format!("image_{index:03}.{extension}")
    } else {
        format!("image_{index:03}_{suffix}.{extension}")
    }
}

/// 把内容写入 `dir` 下第一个未被占用的文件名
///
/// 先写临时文件，再用硬链接原子地占用目标名：目标已存在时链接失败，换下一个后缀，
/// 因此并发写同一目录也不会覆盖已有文件，且目标文件出现时内容已经完整。
/// 文件系统不支持硬链接时退化为 `create_new` 后写入。
pub async fn persist_unique(
    dir: &Path,
    index: usize,
    extension: &str,
    bytes: &[u8],
) -> io::Result<PathBuf> {
    let temp = temp_path(dir, index);
    persist_via(dir, index, extension, bytes, &temp, fs::write(&temp, bytes)).await
}

fn temp_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!(
        ".image_{index:03}.{}-{}.part",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ))
}

/// 临时文件无论写入或占名是否成功都会被删除
async fn persist_via<F>(
    dir: &Path,
    index: usize,
    extension: &str,
    bytes: &[u8],
    temp: &Path,
    write_temp: F,
) -> io::Result<PathBuf>
where
    F: Future<Output = io::Result<()>>,
{
    let outcome = match write_temp.await {
        Ok(()) => claim_name(dir, index, extension, temp, bytes).await,
        Err(err) => Err(err),
    };

    match fs::remove_file(temp).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::debug!(path = %temp.display(), error = %err, "failed to remove temp file");
        }
    }
    outcome
}

async fn claim_name(
    dir: &Path,
    index: usize,
    extension: &str,
    temp: &Path,
    bytes: &[u8],
) -> io::Result<PathBuf> {
    let mut linking = true;
    for suffix in 0..MAX_SUFFIX {
        let candidate = dir.join(artifact_file_name(index, suffix, extension));

        if linking {
            match fs::hard_link(temp, &candidate).await {
                Ok(()) => return Ok(candidate),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    tracing::debug!(
                        error = %err,
                        "hard link unavailable, falling back to create_new"
                    );
                    linking = false;
                }
            }
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(mut file) => {
                if let Err(err) = write_all(&mut file, bytes).await {
                    drop(file);
                    let _ = fs::remove_file(&candidate).await;
                    return Err(err);
                }
                return Ok(candidate);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name for image {index} after {MAX_SUFFIX} attempts"),
    ))
}

async fn write_all(file: &mut fs::File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(extension_for_content_type(Some("image/png")), "png");
        assert_eq!(extension_for_content_type(Some("image/webp")), "webp");
        assert_eq!(extension_for_content_type(Some("image/jpeg")), "jpeg");
        assert_eq!(
            extension_for_content_type(Some("Image/PNG; charset=binary")),
            "png"
        );
        assert_eq!(extension_for_content_type(Some("application/octet-stream")), "jpeg");
        assert_eq!(extension_for_content_type(None), "jpeg");
    }

    #[test]
    fn file_names_are_zero_padded() {
        assert_eq!(artifact_file_name(1, 0, "jpeg"), "image_001.jpeg");
        assert_eq!(artifact_file_name(12, 2, "png"), "image_012_2.png");
        assert_eq!(artifact_file_name(1234, 0, "webp"), "image_1234.webp");
    }

    #[tokio::test]
    async fn persist_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("image_001.png"), b"old").unwrap();
        std::fs::write(dir.path().join("image_001_1.png"), b"older").unwrap();

        let path = persist_unique(dir.path(), 1, "png", b"new").await.unwrap();
        assert_eq!(path, dir.path().join("image_001_2.png"));
        assert_eq!(std::fs::read(dir.path().join("image_001.png")).unwrap(), b"old");
        assert_eq!(std::fs::read(&path).unwrap(), b"new");

        assert!(part_files(dir.path()).is_empty());
    }

    fn part_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".part"))
            .collect()
    }

    #[tokio::test]
    async fn failed_temp_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let temp = temp_path(dir.path(), 1);
        let half_written = async {
            std::fs::write(&temp, b"half")?;
            Err::<(), io::Error>(io::Error::other("no space left on device"))
        };

        let err = persist_via(dir.path(), 1, "png", b"full body", &temp, half_written)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no space left on device");
        assert!(part_files(dir.path()).is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn concurrent_writers_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let writes = (0..8).map(|i| {
            let dir = dir.path().to_path_buf();
            async move { persist_unique(&dir, 1, "jpeg", format!("payload {i}").as_bytes()).await }
        });
        let mut paths: Vec<PathBuf> = futures::future::join_all(writes)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 8);
    }
}
