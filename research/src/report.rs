use crate::record::ResearchRecord;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub fn render(record: &ResearchRecord) -> String {
    let mut out = format!(
        "Topic: {}\n\nSummary:\n{}\n\nSources ({}):\n",
        record.topic(),
        record.summary(),
        record.sources().len()
    );

    for source in record.sources() {
        out.push_str(&format!("- {}\n", source));
    }

    let tools = if record.tools_used().is_empty() {
        "None".to_string()
    } else {
        record.tools_used().join(", ")
    };
    out.push_str(&format!("\nTools Used ({}):\n{}\n", record.tools_used().len(), tools));

    out
}

fn file_name(topic: &str, timestamp: &DateTime<Local>) -> String {
    let stem: String = topic
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();

    format!(
        "{}_research_{}.txt",
        stem,
        timestamp.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Writes the rendered record into `dir` and returns the new file's path.
pub fn save_to_file(
    dir: &Path,
    record: &ResearchRecord,
    timestamp: &DateTime<Local>,
) -> std::io::Result<PathBuf> {
    let path = dir.join(file_name(record.topic(), timestamp));
    std::fs::write(&path, render(record))?;
    tracing::info!(path = %path.display(), "saved research record");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{file_name, render, save_to_file};
    use crate::record::ResearchRecord;
    use agent::OutputParser;
    use chrono::{Local, TimeZone};
    use pretty_assertions::assert_eq;

    fn record(raw: &str) -> ResearchRecord {
        OutputParser::<ResearchRecord>::new()
            .unwrap()
            .parse(raw)
            .unwrap()
    }

    #[test]
    fn test_render() {
        let rec = record(
            r#"{"topic":"Black holes","summary":"Dense.","sources":["NASA","ESA"],"tools_used":["search"]}"#,
        );
        assert_eq!(
            render(&rec),
            "Topic: Black holes\n\nSummary:\nDense.\n\nSources (2):\n- NASA\n- ESA\n\nTools Used (1):\nsearch\n"
        );
    }

    #[test]
    fn test_render_without_tools() {
        let rec = record(r#"{"topic":"t","summary":"s","sources":[]}"#);
        assert!(render(&rec).ends_with("Tools Used (0):\nNone\n"));
    }

    #[test]
    fn test_file_name_stays_in_dir() {
        let ts = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            file_name("TCP/IP over carrier pigeons", &ts),
            "TCP_IP_over_carrier_pigeons_research_2024-03-09_14-05-07.txt"
        );
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let rec = record(r#"{"topic":"Black holes","summary":"Dense.","sources":["NASA"]}"#);
        let ts = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        let path = save_to_file(dir.path(), &rec, &ts).unwrap();

        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), render(&rec));
    }
}
