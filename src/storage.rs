use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::debug;

/// Read trimmed, non-empty lines. A missing file reads as empty.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(vec![]);
    }

    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = BufReader::new(file);
    let mut lines = Vec::new();

    for line in reader.lines() {
        let line = line.with_context(|| format!("Failed to read line from {:?}", path))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        lines.push(line.to_string());
    }

    Ok(lines)
}

/// Load the search keyword pool. Missing or empty is fatal.
pub fn load_keyword_pool(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        bail!("Keyword pool {:?} not found", path);
    }
    let pool = load_lines(path)?;
    if pool.is_empty() {
        bail!("Keyword pool {:?} is empty", path);
    }
    Ok(pool)
}

/// Append-only record of every channel id already emitted.
///
/// Membership is permanent: ids are only ever added, one per line, and the
/// file is never rewritten.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    ids: HashSet<String>,
}

impl Ledger {
    pub fn open(path: &Path) -> Result<Self> {
        let ids: HashSet<String> = load_lines(path)?.into_iter().collect();
        debug!(path = %path.display(), entries = ids.len(), "Loaded ledger");
        Ok(Self {
            path: path.to_path_buf(),
            ids,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Append ids not yet present, flush and sync. Returns how many were added.
    pub fn append<'a, I>(&mut self, ids: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut fresh: Vec<&str> = Vec::new();
        let mut batch: HashSet<&str> = HashSet::new();
        for id in ids {
            let id = id.trim();
            if !id.is_empty() && !self.ids.contains(id) && batch.insert(id) {
                fresh.push(id);
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }

        let needs_newline = ends_mid_line(&self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger {:?}", self.path))?;
        let mut writer = BufWriter::new(file);

        // A crash mid-append can leave a torn last line; start on a fresh one
        if needs_newline {
            writer.write_all(b"\n")?;
        }
        for id in &fresh {
            writeln!(writer, "{}", id)
                .with_context(|| format!("Failed to append to ledger {:?}", self.path))?;
        }
        writer.flush()?;
        writer
            .get_ref()
            .sync_all()
            .with_context(|| format!("Failed to sync ledger {:?}", self.path))?;

        for id in &fresh {
            self.ids.insert(id.to_string());
        }
        Ok(fresh.len())
    }
}

fn ends_mid_line(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let mut file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
