use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use scenario_rollup::config::{PoolConfig, PublishConfig, ScenarioConfig};
use scenario_rollup::{JsonCredentialStore, LocalObjectStore, PipelineConfig, Publisher, Result};
use tempfile::TempDir;

/// Header of a simulation output file, with an extra column that must be ignored
pub const SIMULATION_HEADER: &str =
    "geoid,sim_num,time,hosp_curr,incidH,icu_curr,incidICU,incidI,incidD,comp";

/// Date used for every test run
#[must_use]
pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 4, 1).unwrap()
}

/// One simulation row with every metric set to `value`
#[must_use]
pub fn uniform_row(geoid: i64, sim_num: i64, time: &str, value: f64) -> String {
    format!("{geoid},{sim_num},{time},{value},{value},{value},{value},{value},{value},x")
}

/// Write a simulation output file with the standard header
pub fn write_simulation_file(dir: &Path, name: &str, rows: &[String]) {
    fs::create_dir_all(dir).unwrap();
    let mut content = String::from(SIMULATION_HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(dir.join(name), content).unwrap();
}

/// Temporary input, output, credential and object store roots for one run
pub struct Fixture {
    pub root: TempDir,
}

impl Fixture {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    #[must_use]
    pub fn input(&self) -> PathBuf {
        self.root.path().join("input")
    }

    #[must_use]
    pub fn output(&self) -> PathBuf {
        self.root.path().join("output")
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.output().join("data")
    }

    #[must_use]
    pub fn store_root(&self) -> PathBuf {
        self.root.path().join("store")
    }

    #[must_use]
    pub fn credentials_root(&self) -> PathBuf {
        self.root.path().join("credentials")
    }

    /// Path of an uploaded object in the default bucket
    #[must_use]
    pub fn object(&self, key: &str) -> PathBuf {
        self.store_root()
            .join(PublishConfig::default().bucket)
            .join(key)
    }

    /// Config over this fixture's directories with the given scenarios
    #[must_use]
    pub fn config(&self, scenarios: &[(&str, &str)]) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.input(), self.output());
        config.scenarios = scenarios
            .iter()
            .map(|(name, path)| ScenarioConfig::new(*name, *path))
            .collect();
        config.pools = PoolConfig {
            max_threads: Some(2),
        };
        config.run_date = run_date();
        config
    }

    /// Store a credential record whose bucket is `bucket`
    pub fn write_credentials(&self, bucket: &str) {
        let publish = PublishConfig::default();
        let path = JsonCredentialStore::new(self.credentials_root()).record_path(&publish);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            format!(
                r#"{{"username": "{}", "aws-region": "{}", "bucketname": "{bucket}",
                    "aws-access-key": "AK", "aws-secret-access-key": "SK"}}"#,
                publish.username, publish.region
            ),
        )
        .unwrap();
    }

    /// Connect a publisher against this fixture's stores
    pub fn publisher(&self, config: &PipelineConfig) -> Result<Publisher> {
        Publisher::connect(
            Box::new(LocalObjectStore::new(self.store_root())),
            &JsonCredentialStore::new(self.credentials_root()),
            &config.publish,
            config.date_slug(),
        )
    }
}

/// Lines of a text file
#[must_use]
pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Value of a named column in a CSV line, given its header line
#[must_use]
pub fn csv_value(header: &str, line: &str, column: &str) -> f64 {
    let idx = header.split(',').position(|c| c == column).unwrap();
    line.split(',').nth(idx).unwrap().parse().unwrap()
}
