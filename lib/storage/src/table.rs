// Table files on local disk: JSON lines for row tables, JSON for single objects
use anyhow::{anyhow, Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TABLE_EXT: &str = "jsonl";
const OBJECT_EXT: &str = "json";
const GZIP_EXT: &str = "gz";

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some(GZIP_EXT)
}

fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(BufReader::new(file)))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Write through a temporary file and rename, so readers never see a half-written table.
fn write_atomic<F>(path: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let compress = is_gzip(path);
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|file| -> io::Result<()> {
            if compress {
                let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
                body(&mut encoder)?;
                encoder.finish()?.flush()
            } else {
                let mut writer = BufWriter::new(file);
                body(&mut writer)?;
                writer.flush()
            }
        })
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Read a JSON-lines file, one record per non-empty line. `.gz` files are decompressed.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = open_reader(path)?;
    let mut rows = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid record", path.display(), lineno + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write records as JSON lines, gzip-compressed when the path ends in `.gz`.
pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    write_atomic(path, |out| {
        for row in rows {
            serde_json::to_writer(&mut *out, row)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = open_reader(path)?;
    serde_json::from_reader(reader).with_context(|| format!("{}: invalid document", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |out| {
        serde_json::to_writer(&mut *out, value)?;
        Ok(())
    })
}

/// Named tables and objects under one data directory.
///
/// A table `hackernews.comments` lives in `hackernews.comments.jsonl` or
/// `hackernews.comments.jsonl.gz`; an object `user_story_matrix` in
/// `user_story_matrix.json[.gz]`. Either form is read; new files are written
/// compressed when [`gzip`](Self::gzip) is enabled.
#[derive(Debug, Clone)]
pub struct TableStore {
    data_dir: PathBuf,
    compress: bool,
}

impl TableStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        Ok(Self {
            data_dir,
            compress: false,
        })
    }

    #[must_use]
    pub fn gzip(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn target_path(&self, name: &str, ext: &str) -> PathBuf {
        if self.compress {
            self.data_dir.join(format!("{}.{}.{}", name, ext, GZIP_EXT))
        } else {
            self.data_dir.join(format!("{}.{}", name, ext))
        }
    }

    /// Existing file for `name`, preferring the uncompressed form.
    fn existing_path(&self, name: &str, ext: &str) -> Option<PathBuf> {
        let plain = self.data_dir.join(format!("{}.{}", name, ext));
        let gzipped = self.data_dir.join(format!("{}.{}.{}", name, ext, GZIP_EXT));
        [plain, gzipped].into_iter().find(|p| p.exists())
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.existing_path(name, TABLE_EXT).is_some()
    }

    pub fn has_object(&self, name: &str) -> bool {
        self.existing_path(name, OBJECT_EXT).is_some()
    }

    pub fn load_table<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self
            .existing_path(name, TABLE_EXT)
            .ok_or_else(|| anyhow!("Table '{}' not found in {}", name, self.data_dir.display()))?;
        let rows = read_jsonl(&path)?;
        info!("Loaded {} rows from table {}", rows.len(), name);
        Ok(rows)
    }

    pub fn save_table<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<PathBuf> {
        let path = self.target_path(name, TABLE_EXT);
        self.remove_stale(name, TABLE_EXT, &path)?;
        write_jsonl(&path, rows)?;
        info!("Wrote {} rows to table {}", rows.len(), name);
        Ok(path)
    }

    pub fn load_object<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self
            .existing_path(name, OBJECT_EXT)
            .ok_or_else(|| anyhow!("Object '{}' not found in {}", name, self.data_dir.display()))?;
        debug!("Loading object {} from {}", name, path.display());
        read_json(&path)
    }

    pub fn save_object<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.target_path(name, OBJECT_EXT);
        self.remove_stale(name, OBJECT_EXT, &path)?;
        write_json(&path, value)?;
        debug!("Wrote object {} to {}", name, path.display());
        Ok(path)
    }

    /// Drop the other encoding of `name` so a later load cannot pick up old data.
    fn remove_stale(&self, name: &str, ext: &str, keep: &Path) -> Result<()> {
        let candidates = [
            self.data_dir.join(format!("{}.{}", name, ext)),
            self.data_dir.join(format!("{}.{}.{}", name, ext, GZIP_EXT)),
        ];
        for stale in candidates.iter().filter(|p| p.as_path() != keep && p.exists()) {
            fs::remove_file(stale)
                .with_context(|| format!("Failed to remove {}", stale.display()))?;
        }
        Ok(())
    }
}
