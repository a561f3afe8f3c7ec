//! Report storage under `.contractcheck/reports/`
//!
//! Every `contractcheck run` is saved regardless of `--output` mode.
//! Directory layout: `{host_port}_{timestamp}/`

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use contractcheck_core::{Config, RunReport, TestOutcome, to_http_file};

pub const DEFAULT_REPORT_DIR: &str = ".contractcheck/reports";

/// Everything needed to persist one run.
pub struct ReportData<'a> {
    pub config: &'a Config,
    pub report: &'a RunReport,
    pub exit_code: u8,
    pub duration_secs: f64,
}

/// Save a run under `base/{host_port}_{timestamp}/`.
///
/// Writes `config.toml`, `summary.json`, and, when anything failed,
/// `failures.json` and `reproductions.http`. Returns the run directory.
pub fn save_report(data: &ReportData, base: &Path) -> Result<PathBuf, std::io::Error> {
    let now = UtcTime::now();
    let report_dir = base.join(dir_name(&data.config.base_url, &now));
    std::fs::create_dir_all(&report_dir)?;

    let config_toml =
        toml::to_string_pretty(data.config).map_err(|e| std::io::Error::other(e.to_string()))?;
    std::fs::write(report_dir.join("config.toml"), config_toml)?;

    let summary = serde_json::json!({
        "summary": data.report.summary,
        "exit_code": data.exit_code,
        "meta": {
            "timestamp": now.iso(),
            "duration_secs": data.duration_secs,
            "base_url": data.config.base_url,
            "spec": data.config.spec.display().to_string(),
        },
    });
    std::fs::write(
        report_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary).map_err(std::io::Error::other)?,
    )?;

    let failures: Vec<&TestOutcome> = data.report.failures().collect();
    if !failures.is_empty() {
        std::fs::write(
            report_dir.join("failures.json"),
            serde_json::to_string_pretty(&failures).map_err(std::io::Error::other)?,
        )?;
        let http = to_http_file(&data.report.outcomes, &data.config.base_url, "base_url");
        std::fs::write(report_dir.join("reproductions.http"), http)?;
    }

    Ok(report_dir)
}

/// `localhost_8080_20261014T093000`
fn dir_name(base_url: &str, now: &UtcTime) -> String {
    format!("{}_{}", host_port(base_url), now.compact())
}

/// `"http://localhost:8080/path"` → `"localhost_8080"`
fn host_port(url: &str) -> String {
    url.split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .filter(|host| !host.is_empty())
        .unwrap_or("unknown")
        .replace(':', "_")
}

/// Wall-clock UTC time, split into calendar fields.
struct UtcTime {
    year: i64,
    month: u32,
    day: u32,
    secs_of_day: u64,
}

impl UtcTime {
    fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self::from_epoch_secs(secs)
    }

    fn from_epoch_secs(secs: u64) -> Self {
        let (year, month, day) = civil_from_days(i64::try_from(secs / 86_400).unwrap_or(0));
        Self {
            year,
            month,
            day,
            secs_of_day: secs % 86_400,
        }
    }

    fn hms(&self) -> (u64, u64, u64) {
        let t = self.secs_of_day;
        (t / 3600, (t % 3600) / 60, t % 60)
    }

    /// `"20261014T093000"`
    fn compact(&self) -> String {
        let (h, mi, s) = self.hms();
        format!(
            "{:04}{:02}{:02}T{h:02}{mi:02}{s:02}",
            self.year, self.month, self.day
        )
    }

    /// `"2026-10-14T09:30:00Z"`
    fn iso(&self) -> String {
        let (h, mi, s) = self.hms();
        format!(
            "{:04}-{:02}-{:02}T{h:02}:{mi:02}:{s:02}Z",
            self.year, self.month, self.day
        )
    }
}

/// Days since the Unix epoch to `(year, month, day)`, proleptic Gregorian.
///
/// Reference: <https://howardhinnant.github.io/date_algorithms.html#civil_from_days>
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (
        year,
        u32::try_from(month).unwrap_or(1),
        u32::try_from(day).unwrap_or(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use contractcheck_core::{CaseFailure, Method, RequestRecord, Suite, Summary};
    use std::collections::BTreeMap;

    #[test]
    fn host_port_from_urls() {
        assert_eq!(host_port("http://localhost:8080"), "localhost_8080");
        assert_eq!(host_port("https://api.example.com"), "api.example.com");
        assert_eq!(host_port("http://10.0.0.1:3000/v1"), "10.0.0.1_3000");
        assert_eq!(host_port("http://"), "unknown");
    }

    #[test]
    fn calendar_dates() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(20_489), (2026, 2, 5));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn timestamps() {
        // 2026-10-14 09:30:05 UTC
        let t = UtcTime::from_epoch_secs(20_740 * 86_400 + 9 * 3600 + 30 * 60 + 5);
        assert_eq!(t.compact(), "20261014T093005");
        assert_eq!(t.iso(), "2026-10-14T09:30:05Z");
        assert!(dir_name("http://localhost:8080", &t).starts_with("localhost_8080_2026"));
    }

    #[test]
    fn saves_failures_and_reproductions() {
        let dir = tempfile::tempdir().unwrap();
        let mut failed = TestOutcome::new("not-found-0", Suite::NotFound, "GET /widgets/{id}")
            .with_failure(CaseFailure::UnexpectedStatus {
                expected: vec![404],
                actual: 200,
            });
        failed.request = Some(RequestRecord {
            method: Method::Get,
            url: "http://localhost:8080/widgets/0".into(),
            headers: BTreeMap::new(),
            body: None,
        });
        let report = RunReport {
            summary: Summary {
                total: 1,
                passed: 0,
                failed: 1,
                skipped: 0,
            },
            outcomes: vec![failed],
            skipped: Vec::new(),
        };
        let config = Config::default();
        let data = ReportData {
            config: &config,
            report: &report,
            exit_code: 1,
            duration_secs: 0.5,
        };

        let run_dir = save_report(&data, dir.path()).unwrap();
        assert!(run_dir.join("config.toml").exists());
        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(run_dir.join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["summary"]["failed"], 1);
        assert_eq!(summary["exit_code"], 1);
        assert!(run_dir.join("failures.json").exists());
        let http = std::fs::read_to_string(run_dir.join("reproductions.http")).unwrap();
        assert!(http.contains("GET {{base_url}}/widgets/0"));
    }
}
