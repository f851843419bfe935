//! 答案缓存 - 业务能力层
//!
//! 每门课一个文件：`{answer_store_dir}/{course_key}/all.json`，
//! 内容是答案批次的数组，每个批次是一次成功提交的 `{id, question, answer_id}` 列表。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::{AnswerRecord, QuizQuestion};

const CACHE_FILE: &str = "all.json";
const TEMP_SUFFIX: &str = "tmp";

/// 答案缓存
#[async_trait]
pub trait AnswerCache: Send + Sync {
    /// 读取课程的全部答案批次，文件不存在时返回空
    async fn read_all(&self, course_key: &str) -> Result<Vec<Vec<AnswerRecord>>>;

    /// 追加一个答案批次
    async fn append(&self, course_key: &str, batch: Vec<AnswerRecord>) -> Result<()>;
}

/// 基于 JSON 文件的答案缓存
///
/// 职责：
/// - 读写 `all.json`，先写临时文件再改名替换
/// - 串行化同一进程内的读改写
/// - 写入时遇到损坏的文件会把它挪到一边重新开始
/// - 不关心答案从哪来
pub struct FileAnswerCache {
    store_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAnswerCache {
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// 课程缓存文件路径
    pub fn cache_path(&self, course_key: &str) -> PathBuf {
        self.store_dir.join(sanitize_key(course_key)).join(CACHE_FILE)
    }

    async fn read_content(path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::file_read_failed(path.display().to_string(), e)),
        }
    }

    async fn load(path: &Path) -> Result<Vec<Vec<AnswerRecord>>> {
        match Self::read_content(path).await? {
            None => Ok(Vec::new()),
            Some(content) => serde_json::from_str(&content)
                .map_err(|e| AppError::file_read_failed(path.display().to_string(), e)),
        }
    }

    /// 读取已有批次；文件损坏时改名保留，从空列表开始
    async fn load_for_append(path: &Path) -> Result<Vec<Vec<AnswerRecord>>> {
        let Some(content) = Self::read_content(path).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&content) {
            Ok(batches) => Ok(batches),
            Err(e) => {
                let backup = path.with_extension(format!(
                    "corrupt-{}.json",
                    chrono::Local::now().format("%Y%m%d%H%M%S")
                ));
                warn!("⚠️ 答案缓存 {} 已损坏 ({})，另存为 {}", path.display(), e, backup.display());
                tokio::fs::rename(path, &backup)
                    .await
                    .map_err(|e| AppError::file_write_failed(backup.display().to_string(), e))?;
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl AnswerCache for FileAnswerCache {
    async fn read_all(&self, course_key: &str) -> Result<Vec<Vec<AnswerRecord>>> {
        let path = self.cache_path(course_key);
        let batches = Self::load(&path).await?;
        debug!("读取答案缓存 {}: {} 个批次", path.display(), batches.len());
        Ok(batches)
    }

    async fn append(&self, course_key: &str, batch: Vec<AnswerRecord>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let path = self.cache_path(course_key);
        let mut batches = Self::load_for_append(&path).await?;
        batches.push(batch);

        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::file_write_failed(dir.display().to_string(), e))?;
        }
        let content = serde_json::to_string_pretty(&batches)?;
        let temp_path = path.with_extension(TEMP_SUFFIX);
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| AppError::file_write_failed(temp_path.display().to_string(), e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

        debug!("答案已写入缓存 {}: 共 {} 个批次", path.display(), batches.len());
        Ok(())
    }
}

/// 在缓存中查找页面上题目的答案
///
/// 每道题取缓存中第一条 id 相同的记录，结果按页面题目顺序排列。
pub fn lookup_answers(batches: &[Vec<AnswerRecord>], questions: &[QuizQuestion]) -> Vec<AnswerRecord> {
    questions
        .iter()
        .filter_map(|q| batches.iter().flatten().find(|r| r.id == q.id).cloned())
        .collect()
}

/// 课程 key 来自页面链接，落盘前去掉路径分隔符
fn sanitize_key(course_key: &str) -> String {
    let key: String = course_key
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    match key.trim_matches('.') {
        "" => "default".to_string(),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnswerOption;

    fn record(id: i64, answer_id: i64) -> AnswerRecord {
        AnswerRecord {
            id,
            question: format!("Câu {}", id),
            answer_id,
        }
    }

    fn question(id: i64) -> QuizQuestion {
        QuizQuestion {
            id,
            question: format!("Câu {}", id),
            answer_options: vec![AnswerOption {
                id: id * 10,
                text: "A".to_string(),
                is_correct_hint: None,
            }],
        }
    }

    #[test]
    fn test_lookup_takes_first_record_in_live_order() {
        let batches = vec![vec![record(2, 21)], vec![record(1, 11), record(2, 22)]];
        let found = lookup_answers(&batches, &[question(1), question(2), question(3)]);

        assert_eq!(found, vec![record(1, 11), record(2, 21)]);
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("co-so-du-lieu-12"), "co-so-du-lieu-12");
        assert_eq!(sanitize_key("../etc"), "_etc");
        assert_eq!(sanitize_key(".."), "default");
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAnswerCache::new(dir.path());

        assert!(cache.read_all("mang-may-tinh").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_then_read_keeps_batches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAnswerCache::new(dir.path());

        cache.append("ktmt", vec![record(1, 11)]).await.unwrap();
        cache
            .append("ktmt", vec![record(2, 21), record(3, 31)])
            .await
            .unwrap();

        let batches = cache.read_all("ktmt").await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1][1], record(3, 31));
        assert!(dir.path().join("ktmt").join("all.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAnswerCache::new(dir.path());
        let path = cache.cache_path("hong");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        assert!(cache.read_all("hong").await.is_err());
    }

    #[tokio::test]
    async fn test_append_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAnswerCache::new(dir.path());
        let path = cache.cache_path("hong");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[[{\"id\": 1, \"question\": \"Câu").unwrap();

        cache.append("hong", vec![record(4, 41)]).await.unwrap();

        let batches = cache.read_all("hong").await.unwrap();
        assert_eq!(batches, vec![vec![record(4, 41)]]);
        let kept: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("all.corrupt-"))
            .collect();
        assert_eq!(kept.len(), 1);
        assert!(!path.with_extension(TEMP_SUFFIX).exists());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let cache = std::sync::Arc::new(FileAnswerCache::new(dir.path()));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.append("song-song", vec![record(i, i)]).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(cache.read_all("song-song").await.unwrap().len(), 8);
    }
}
