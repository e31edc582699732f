//! 追踪输出（只追加）

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use super::record::TraceRecord;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("create trace file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("write trace record: {0}")]
    Write(#[from] std::io::Error),
}

/// 有序、只追加的记录目的地。
pub trait TraceSink: Send {
    fn append(&mut self, record: TraceRecord) -> Result<(), TraceError>;

    fn flush(&mut self) -> Result<(), TraceError> {
        Ok(())
    }
}

/// 多个观察者共享同一个 sink 时使用（单线程仿真，锁只是为了满足 `Send`）。
pub type SharedTraceSink = Arc<Mutex<dyn TraceSink>>;

pub fn shared<S: TraceSink + 'static>(sink: S) -> SharedTraceSink {
    Arc::new(Mutex::new(sink))
}

/// 文本行输出：每条记录一行。
#[derive(Debug)]
pub struct AsciiTraceSink<W: Write + Send> {
    out: W,
    lines: u64,
}

impl AsciiTraceSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| TraceError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> AsciiTraceSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> TraceSink for AsciiTraceSink<W> {
    fn append(&mut self, record: TraceRecord) -> Result<(), TraceError> {
        writeln!(self.out, "{record}")?;
        self.lines += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TraceError> {
        self.out.flush()?;
        Ok(())
    }
}

/// 内存中的记录序列（测试与汇总用）。
#[derive(Debug, Default, Clone)]
pub struct MemoryTraceSink {
    pub records: Vec<TraceRecord>,
}

impl TraceSink for MemoryTraceSink {
    fn append(&mut self, record: TraceRecord) -> Result<(), TraceError> {
        self.records.push(record);
        Ok(())
    }
}
