use super::model::ResultRecord;
use crate::Result;
use crate::config::DEFAULT_OUTPUT_DIR;
use crate::error::RqstrError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const RESULTS_FILE: &str = "results.jsonl";

// 文件超过 20MB 时压缩
const COMPACTION_THRESHOLD_BYTES: u64 = 20 * 1024 * 1024;
// 压缩后保留最近 50,000 条
const MAX_RECORDS: usize = 50_000;

/// 以 JSON Lines 追加保存执行结果
pub struct ResultStore {
    file_path: PathBuf,
    compaction_threshold: u64,
    max_records: usize,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::in_dir(DEFAULT_OUTPUT_DIR)
    }
}

impl ResultStore {
    /// 在指定输出目录下保存
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new_with_path(dir.as_ref().join(RESULTS_FILE))
    }

    /// Create with specific file path (internal/testing use)
    pub fn new_with_path(path: PathBuf) -> Self {
        Self {
            file_path: path,
            compaction_threshold: COMPACTION_THRESHOLD_BYTES,
            max_records: MAX_RECORDS,
        }
    }

    #[cfg(test)]
    fn with_limits(mut self, compaction_threshold: u64, max_records: usize) -> Self {
        self.compaction_threshold = compaction_threshold;
        self.max_records = max_records;
        self
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(RqstrError::IoError)?;
        }
        Ok(())
    }

    /// 追加一批记录
    ///
    /// 写入期间持有 `fs2` 排他锁，多个进程同时写同一文件时行不会交错。
    pub fn append(&self, records: &[ResultRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.ensure_dir()?;

        let mut buffer = String::new();
        for record in records {
            buffer.push_str(&serde_json::to_string(record)?);
            buffer.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.file_path)
            .map_err(RqstrError::IoError)?;

        file.lock_exclusive().map_err(RqstrError::IoError)?;
        file.write_all(buffer.as_bytes())
            .map_err(RqstrError::IoError)?;
        self.compact_locked(&mut file)?;
        // 锁随 file drop 释放
        drop(file);

        Ok(())
    }

    /// 文件超过阈值时只保留最近的记录，调用方必须持有排他锁
    fn compact_locked(&self, file: &mut File) -> Result<()> {
        let metadata = file.metadata().map_err(RqstrError::IoError)?;
        if metadata.len() < self.compaction_threshold {
            return Ok(());
        }

        file.seek(SeekFrom::Start(0)).map_err(RqstrError::IoError)?;
        let records: Vec<ResultRecord> = BufReader::new(&*file)
            .lines()
            .map_while(|l| l.ok())
            .filter_map(|l| serde_json::from_str(&l).ok())
            .collect();
        if records.len() <= self.max_records {
            return Ok(());
        }

        let skip = records.len() - self.max_records;
        let mut buffer = String::new();
        for record in &records[skip..] {
            buffer.push_str(&serde_json::to_string(record)?);
            buffer.push('\n');
        }

        // append 模式下截断后写入即从头开始
        file.set_len(0).map_err(RqstrError::IoError)?;
        file.write_all(buffer.as_bytes())
            .map_err(RqstrError::IoError)?;
        debug!(
            "Compacted {} to the last {} records",
            self.file_path.display(),
            self.max_records
        );
        Ok(())
    }

    /// 按时间顺序读取所有记录，损坏的行被跳过
    pub fn list(&self) -> Result<Vec<ResultRecord>> {
        if !self.file_path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.file_path).map_err(RqstrError::IoError)?;
        file.lock_shared().map_err(RqstrError::IoError)?;

        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(RqstrError::IoError)?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<ResultRecord>(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// 最近的 N 条记录（旧 -> 新）
    pub fn tail(&self, n: usize) -> Result<Vec<ResultRecord>> {
        let records = self.list()?;
        let skip = records.len().saturating_sub(n);
        Ok(records.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_dummy_record(id: &str) -> ResultRecord {
        ResultRecord {
            id: id.to_string(),
            run_id: "run".to_string(),
            timestamp: chrono::Utc::now(),
            collection: "c".to_string(),
            request: "r".to_string(),
            attempt: 1,
            method: "GET".to_string(),
            url: "https://example.com".to_string(),
            passed: true,
            status: Some(200),
            duration_ms: Some(100),
            error: None,
        }
    }

    #[test]
    fn test_append_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResultStore::in_dir(temp_dir.path().join("nested"));

        store.append(&[create_dummy_record("1")]).unwrap();
        store.append(&[create_dummy_record("2"), create_dummy_record("3")]).unwrap();

        let list = store.list().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].id, "1");
        assert_eq!(list[2].id, "3");
    }

    #[test]
    fn test_tail() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResultStore::new_with_path(temp_dir.path().join("results.jsonl"));

        for i in 0..10 {
            store.append(&[create_dummy_record(&i.to_string())]).unwrap();
        }

        let tail = store.tail(3).unwrap();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].id, "7");
        assert_eq!(tail[2].id, "9");
    }

    #[test]
    fn test_compaction_keeps_latest_records() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResultStore::in_dir(temp_dir.path()).with_limits(0, 3);

        for i in 0..5 {
            store.append(&[create_dummy_record(&i.to_string())]).unwrap();
        }

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["2", "3", "4"]);

        // 压缩后仍可继续追加
        store.append(&[create_dummy_record("5")]).unwrap();
        let ids: Vec<String> = store.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["3", "4", "5"]);
    }

    #[test]
    fn test_no_compaction_below_threshold() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResultStore::in_dir(temp_dir.path()).with_limits(u64::MAX, 1);

        for i in 0..4 {
            store.append(&[create_dummy_record(&i.to_string())]).unwrap();
        }
        assert_eq!(store.list().unwrap().len(), 4);
    }

    #[test]
    fn test_list_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResultStore::in_dir(temp_dir.path());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_corrupt_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("results.jsonl");
        let store = ResultStore::new_with_path(path.clone());
        store.append(&[create_dummy_record("ok")]).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();
        drop(file);

        let list = store.list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "ok");
    }
}
