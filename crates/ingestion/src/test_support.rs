//! Fixtures shared by the importer tests

use acadex_common::config::DatabaseConfig;
use acadex_common::db::{init_schema, DbPool};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Fresh temp directory, removed when dropped
pub fn scratch_dir(name: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(&format!("acadex-{}-", name))
        .tempdir()
        .unwrap()
}

pub fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

pub fn write_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (entry, content) in entries {
        zip.start_file(*entry, opts).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// Single-connection in-memory SQLite pool with the schema created
pub async fn test_pool() -> DbPool {
    let mut config = DatabaseConfig::with_url("sqlite::memory:");
    config.max_connections = 1;
    config.min_connections = 1;

    let pool = DbPool::new(&config).await.unwrap();
    init_schema(pool.conn()).await.unwrap();
    pool
}
