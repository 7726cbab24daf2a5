use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use crate::extract::{RatingRecord, TechSpecRecord};

// ── Links ──

/// One URL per line; lines are trimmed and blank lines skipped.
pub fn load_links(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read links file {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Overwrites `path` with one URL per line.
pub fn save_links(path: &Path, links: &[String]) -> Result<()> {
    ensure_parent(path)?;
    let mut out = String::with_capacity(links.iter().map(|l| l.len() + 1).sum());
    for link in links {
        out.push_str(link);
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))
}

// ── Ratings ──

/// Semicolon-delimited rating rows appended to one file.
pub struct RatingsWriter {
    writer: csv::Writer<File>,
}

impl RatingsWriter {
    pub fn open_append(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_writer(file);
        Ok(Self { writer })
    }

    /// Write and flush one row so an aborted batch keeps everything before it.
    pub fn write(&mut self, record: &RatingRecord) -> Result<()> {
        self.writer.write_record(record.to_row())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Raw cells of every row in a ratings file.
pub fn load_rating_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

// ── Technical data ──

/// `<name>.json` for the first file, `<name>_<n>.json` after each rollover.
pub fn spec_file_path(dir: &Path, name: &str, number: usize) -> PathBuf {
    if number <= 1 {
        dir.join(format!("{}.json", name))
    } else {
        dir.join(format!("{}_{}.json", name, number))
    }
}

/// Base file plus every consecutive rollover file present on disk.
pub fn existing_spec_files(dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let base = spec_file_path(dir, name, 1);
    if base.exists() {
        files.push(base);
    }
    for number in 2.. {
        let path = spec_file_path(dir, name, number);
        if !path.exists() {
            break;
        }
        files.push(path);
    }
    files
}

/// In-memory record array mirrored to the current output file.
pub struct TechSpecFile {
    dir: PathBuf,
    name: String,
    number: usize,
    records: Vec<TechSpecRecord>,
}

impl TechSpecFile {
    /// Resume from the base file; missing or unreadable state starts empty.
    pub fn open(dir: &Path, name: &str) -> Self {
        let path = spec_file_path(dir, name, 1);
        let records = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("{} is invalid or empty ({}), starting fresh", path.display(), e);
                Vec::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Cannot read {} ({}), starting fresh", path.display(), e);
                Vec::new()
            }
        };

        Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            number: 1,
            records,
        }
    }

    pub fn path(&self) -> PathBuf {
        spec_file_path(&self.dir, &self.name, self.number)
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Leave the current file as it is and continue, empty, in the next one.
    pub fn roll_over(&mut self) {
        self.records.clear();
        self.number += 1;
    }

    pub fn extend(&mut self, records: Vec<TechSpecRecord>) {
        self.records.extend(records);
    }

    /// Rewrite the whole current file from memory.
    pub fn save(&self) -> Result<()> {
        let path = self.path();
        ensure_parent(&path)?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.records.serialize(&mut ser)?;

        // a crash mid-write must not leave a truncated array behind
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &buf).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

pub fn load_spec_records(path: &Path) -> Result<Vec<TechSpecRecord>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

// ── Error log ──

/// Append-only log of links the tech-spec pass could not scrape.
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, url: &str, err: &anyhow::Error) -> Result<()> {
        ensure_parent(&self.path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let message = format!("{:#}", err).replace('\n', " ");
        writeln!(file, "Error scraping {}: {}", url, message)?;
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ratings::Field;

    fn spec(model: &str) -> TechSpecRecord {
        TechSpecRecord::from_pairs(
            ["Model", "Moc silnika"].map(String::from),
            [model, "150 KM"].map(String::from),
        )
    }

    #[test]
    fn links_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/links.txt");
        let links = vec!["https://a/1".to_string(), "https://a/2".to_string()];
        save_links(&path, &links).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "https://a/1\nhttps://a/2\n");

        fs::write(&path, "  https://a/1  \n\nhttps://a/3\r\n").unwrap();
        assert_eq!(load_links(&path).unwrap(), ["https://a/1", "https://a/3"]);
    }

    #[test]
    fn ratings_rows_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("car_ratings.txt");
        let rec = RatingRecord {
            model: "audi a4 b8".into(),
            fields: vec![Some(Field::Price(120500)), None, Some(Field::Score(0.82))],
        };
        for _ in 0..2 {
            let mut w = RatingsWriter::open_append(&path).unwrap();
            w.write(&rec).unwrap();
        }
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "audi a4 b8;120500;;0.82\naudi a4 b8;120500;;0.82\n"
        );
        assert_eq!(load_rating_rows(&path).unwrap()[1][3], "0.82");
    }

    #[test]
    fn spec_file_names_follow_rollover_number() {
        let dir = Path::new("data");
        assert_eq!(spec_file_path(dir, "specs", 1), Path::new("data/specs.json"));
        assert_eq!(spec_file_path(dir, "specs", 3), Path::new("data/specs_3.json"));
    }

    #[test]
    fn spec_file_reload_appends_to_existing_array() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = TechSpecFile::open(dir.path(), "specs");
        assert!(file.is_empty());
        file.extend(vec![spec("a"), spec("b")]);
        file.save().unwrap();

        let mut file = TechSpecFile::open(dir.path(), "specs");
        assert_eq!(file.len(), 2);
        file.extend(vec![spec("c")]);
        file.save().unwrap();

        let on_disk = load_spec_records(&file.path()).unwrap();
        let models: Vec<_> = on_disk.iter().filter_map(TechSpecRecord::model).collect();
        assert_eq!(models, ["a", "b", "c"]);
        assert!(!dir.path().join("specs.json.tmp").exists());
    }

    #[test]
    fn saved_json_is_indented_and_keeps_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = TechSpecFile::open(dir.path(), "specs");
        file.extend(vec![TechSpecRecord::from_pairs(
            ["Model", "Długość"].map(String::from),
            ["x", "4703"].map(String::from),
        )]);
        file.save().unwrap();
        let text = fs::read_to_string(file.path()).unwrap();
        assert_eq!(
            text,
            "[\n    {\n        \"Model\": \"x\",\n        \"Długość\": \"4703\"\n    }\n]"
        );
    }

    #[test]
    fn corrupt_state_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("specs.json"), "[{\"Model\": \"a\"},").unwrap();
        assert!(TechSpecFile::open(dir.path(), "specs").is_empty());
        fs::write(dir.path().join("specs.json"), "").unwrap();
        assert!(TechSpecFile::open(dir.path(), "specs").is_empty());
    }

    #[test]
    fn roll_over_moves_to_next_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = TechSpecFile::open(dir.path(), "specs");
        file.extend(vec![spec("a")]);
        file.save().unwrap();
        file.roll_over();
        assert!(file.is_empty());
        assert_eq!(file.number(), 2);
        file.extend(vec![spec("b")]);
        file.save().unwrap();

        assert_eq!(
            existing_spec_files(dir.path(), "specs"),
            [dir.path().join("specs.json"), dir.path().join("specs_2.json")]
        );
        assert_eq!(load_spec_records(&dir.path().join("specs.json")).unwrap().len(), 1);
    }

    #[test]
    fn error_log_lines_name_the_link() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("errors.txt"));
        log.record("https://x/1", &anyhow::anyhow!("timed out")).unwrap();
        log.record("https://x/2", &anyhow::anyhow!("HTTP 404")).unwrap();
        assert_eq!(
            fs::read_to_string(log.path()).unwrap(),
            "Error scraping https://x/1: timed out\nError scraping https://x/2: HTTP 404\n"
        );
    }
}
