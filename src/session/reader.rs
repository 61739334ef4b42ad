//! Line reader over a log file, bounded or tailing

use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Nothing more right now. In tail mode a partial trailing line stays
    /// buffered until its newline arrives.
    Eof,
}

pub struct LineReader {
    inner: BufReader<File>,
    pending: Vec<u8>,
    tail: bool,
    /// Byte offset just past the last complete line handed out
    consumed: u64,
}

impl LineReader {
    /// Open `path` and position the cursor at `offset`
    pub async fn open(path: &Path, offset: u64, tail: bool) -> std::io::Result<Self> {
        let file = File::open(path).await?;
        let mut inner = BufReader::new(file);
        if offset > 0 {
            inner.seek(SeekFrom::Start(offset)).await?;
        }

        Ok(Self {
            inner,
            pending: Vec::new(),
            tail,
            consumed: offset,
        })
    }

    pub async fn next_line(&mut self) -> std::io::Result<ReadOutcome> {
        self.inner.read_until(b'\n', &mut self.pending).await?;

        if self.pending.ends_with(b"\n") {
            return Ok(ReadOutcome::Line(self.take_line()));
        }
        if self.pending.is_empty() || self.tail {
            return Ok(ReadOutcome::Eof);
        }
        // Bounded mode: hand out the unterminated last line
        Ok(ReadOutcome::Line(self.take_line()))
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    fn take_line(&mut self) -> String {
        self.consumed += self.pending.len() as u64;
        let line = String::from_utf8_lossy(&self.pending)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        self.pending.clear();
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_bounded_reads_unterminated_last_line() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("combat.log");
        tokio::fs::write(&path, b"one\r\ntwo\nthree").await.unwrap();

        let mut reader = LineReader::open(&path, 0, false).await.unwrap();
        assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::Line("one".into()));
        assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::Line("two".into()));
        assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::Line("three".into()));
        assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::Eof);
        assert_eq!(reader.consumed(), 14);
    }

    #[tokio::test]
    async fn test_tail_waits_for_newline() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("combat.log");
        tokio::fs::write(&path, b"par").await.unwrap();

        let mut reader = LineReader::open(&path, 0, true).await.unwrap();
        assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::Eof);

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .unwrap();
        file.write_all(b"tial\n").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::Line("partial".into()));
        assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::Eof);
    }

    #[tokio::test]
    async fn test_open_at_offset() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("combat.log");
        tokio::fs::write(&path, b"skip me\nkeep me\n").await.unwrap();

        let mut reader = LineReader::open(&path, 8, false).await.unwrap();
        assert_eq!(reader.next_line().await.unwrap(), ReadOutcome::Line("keep me".into()));
        assert_eq!(reader.consumed(), 16);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced_not_fatal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("combat.log");
        tokio::fs::write(&path, b"ok \xff\n").await.unwrap();

        let mut reader = LineReader::open(&path, 0, false).await.unwrap();
        match reader.next_line().await.unwrap() {
            ReadOutcome::Line(line) => assert!(line.starts_with("ok ")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
