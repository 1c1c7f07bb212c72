use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::model::{NamedTable, NormalizedTable};

const MANIFEST_FILE: &str = "tables.json";

/// Where extracted tables are recorded between extraction and normalization.
pub trait TableSink {
    fn put(&mut self, name: &str, table: &NormalizedTable) -> Result<(), ExtractError>;

    /// Titles in insertion order.
    fn list_titles(&self) -> Vec<String>;
}

/// Reads tables back in the order they were stored.
pub trait TableSource {
    fn read_tables(&self) -> Result<Vec<NamedTable>, ExtractError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    tables: Vec<NamedTable>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

}

impl TableSink for MemorySink {
    fn put(&mut self, name: &str, table: &NormalizedTable) -> Result<(), ExtractError> {
        self.tables.push(NamedTable {
            name: name.to_string(),
            table: table.clone(),
        });
        Ok(())
    }

    fn list_titles(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|named| named.table.title.clone())
            .collect()
    }
}

impl TableSource for MemorySink {
    fn read_tables(&self) -> Result<Vec<NamedTable>, ExtractError> {
        Ok(self.tables.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ManifestEntry {
    name: String,
    title: String,
}

/// One CSV file per table plus a `tables.json` manifest of names and titles.
///
/// Each file holds the title on its first record, the header on the second,
/// and the body after that.
#[derive(Debug, Clone)]
pub struct CsvTableDir {
    dir: PathBuf,
    manifest: Vec<ManifestEntry>,
}

impl CsvTableDir {
    pub fn create(dir: &Path) -> Result<Self, ExtractError> {
        fs::create_dir_all(dir)?;
        let sink = Self {
            dir: dir.to_path_buf(),
            manifest: Vec::new(),
        };
        sink.write_manifest()?;
        Ok(sink)
    }

    pub fn open(dir: &Path) -> Result<Self, ExtractError> {
        let raw = fs::read_to_string(dir.join(MANIFEST_FILE))?;
        let manifest = serde_json::from_str(&raw)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
        })
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }

    fn write_manifest(&self) -> Result<(), ExtractError> {
        let json = serde_json::to_string_pretty(&self.manifest)?;
        fs::write(self.dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    fn read_table(&self, entry: &ManifestEntry) -> Result<NamedTable, ExtractError> {
        let malformed = |reason: &str| ExtractError::MalformedTable {
            name: entry.name.clone(),
            reason: reason.to_string(),
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(self.table_path(&entry.name))?;
        let mut records = reader
            .records()
            .map(|record| record.map(|record| record.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?
            .into_iter();

        let title = records
            .next()
            .and_then(|record| record.into_iter().next())
            .ok_or_else(|| malformed("missing title record"))?;
        let header = records.next().ok_or_else(|| malformed("missing header record"))?;
        let body = records.collect::<Vec<_>>();
        if body.iter().any(|row| row.len() != header.len()) {
            return Err(malformed("body row width differs from header"));
        }

        Ok(NamedTable {
            name: entry.name.clone(),
            table: NormalizedTable {
                title,
                header,
                body,
            },
        })
    }
}

impl TableSink for CsvTableDir {
    fn put(&mut self, name: &str, table: &NormalizedTable) -> Result<(), ExtractError> {
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_path(self.table_path(name))?;
        writer.write_record([table.title.as_str()])?;
        writer.write_record(&table.header)?;
        for row in &table.body {
            writer.write_record(row)?;
        }
        writer.flush()?;

        self.manifest.push(ManifestEntry {
            name: name.to_string(),
            title: table.title.clone(),
        });
        self.write_manifest()
    }

    fn list_titles(&self) -> Vec<String> {
        self.manifest.iter().map(|entry| entry.title.clone()).collect()
    }
}

impl TableSource for CsvTableDir {
    fn read_tables(&self) -> Result<Vec<NamedTable>, ExtractError> {
        self.manifest
            .iter()
            .map(|entry| self.read_table(entry))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::{CsvTableDir, MemorySink, TableSink, TableSource};
    use crate::model::NormalizedTable;

    fn sample(title: &str) -> NormalizedTable {
        NormalizedTable {
            title: title.to_string(),
            header: vec![
                "Survey Round".to_string(),
                "Current Perception -Increased".to_string(),
                "Note, with \"quotes\"".to_string(),
            ],
            body: vec![
                vec!["May-25".to_string(), "40.10".to_string(), String::new()],
                vec!["Jun-25".to_string(), "007".to_string(), " padded ".to_string()],
            ],
        }
    }

    #[test]
    fn memory_sink_keeps_insertion_order() {
        let mut sink = MemorySink::new();
        sink.put("b", &sample("Table 2")).expect("put");
        sink.put("a", &sample("Table 1")).expect("put");

        assert_eq!(sink.list_titles(), vec!["Table 2", "Table 1"]);
        let names = sink
            .read_tables()
            .expect("read")
            .into_iter()
            .map(|named| named.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn csv_dir_round_trips_exact_strings() {
        let dir = tempdir().expect("tempdir should be created");
        let mut sink = CsvTableDir::create(dir.path()).expect("sink should be created");
        let first = sample("Table 1: Perceptions on Income");
        let second = sample("Table 2: Perceptions on Prices");
        sink.put("Table 1 Perceptions on Income", &first).expect("put");
        sink.put("Table 2 Perceptions on Prices", &second).expect("put");

        let reopened = CsvTableDir::open(dir.path()).expect("sink should reopen");
        assert_eq!(
            reopened.list_titles(),
            vec!["Table 1: Perceptions on Income", "Table 2: Perceptions on Prices"]
        );
        let tables = reopened.read_tables().expect("tables should read back");
        assert_eq!(tables[0].name, "Table 1 Perceptions on Income");
        assert_eq!(tables[0].table, first);
        assert_eq!(tables[1].table, second);
    }

    #[test]
    fn open_without_manifest_fails() {
        let dir = tempdir().expect("tempdir should be created");
        assert!(CsvTableDir::open(dir.path()).is_err());
    }
}
