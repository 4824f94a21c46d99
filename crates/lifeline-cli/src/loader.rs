//! Reading event files and building a finalized collection.

use std::fs;
use std::path::Path;

use anyhow::Context;
use lifeline_model::{FinalizeConfig, FinalizeReport, LifecycleEvent, ObjectCollection, TypeRegistry};
use tracing::debug;

/// Parse a JSON array of events, or one JSON event per non-blank line.
pub fn parse_events(text: &str) -> anyhow::Result<Vec<LifecycleEvent>> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).context("parsing event array");
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("parsing event on line {}", n + 1))
        })
        .collect()
}

pub fn read_events(path: &Path) -> anyhow::Result<Vec<LifecycleEvent>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading trace {}", path.display()))?;
    let events = parse_events(&text).with_context(|| format!("in trace {}", path.display()))?;
    debug!(path = %path.display(), events = events.len(), "loaded trace");
    Ok(events)
}

/// Ingest `events` in order, then run every finalization pass.
pub fn build_collection(
    events: &[LifecycleEvent],
    config: &FinalizeConfig,
) -> anyhow::Result<(ObjectCollection, FinalizeReport)> {
    let mut objects = ObjectCollection::new(TypeRegistry::default());
    for (index, event) in events.iter().enumerate() {
        objects
            .apply(event)
            .with_context(|| format!("event #{} ({} of {})", index + 1, event.kind(), event.id()))?;
    }
    let report = objects.finalize(config).context("finalizing trace")?;
    Ok((objects, report))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use lifeline_types::{ObjectId, Timestamp};

    use super::*;

    const JSONL: &str = r#"
{"event": "created", "id": 5, "category": "cat", "name": "Foo", "ts": 10}
{"event": "snapshot", "id": 5, "category": "cat", "name": "Foo", "ts": 15, "args": {"a": 1}}

{"event": "deleted", "id": 5, "category": "cat", "name": "Foo", "ts": 20}
"#;

    #[test]
    fn parse_jsonl_skips_blank_lines() {
        let events = parse_events(JSONL).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].kind(), "snapshot");
    }

    #[test]
    fn parse_array() {
        let text = r#"[{"event": "created", "id": "0xa", "cat": "c", "name": "N", "ts": 1}]"#;
        let events = parse_events(text).unwrap();
        assert_eq!(events[0].id(), &ObjectId::from("0xa"));
    }

    #[test]
    fn parse_error_names_the_line() {
        let text = "{\"event\": \"created\", \"id\": 1, \"category\": \"c\", \"name\": \"N\", \"ts\": 1}\nnot json\n";
        let err = parse_events(text).unwrap_err();
        assert!(format!("{err}").contains("line 2"));
    }

    #[test]
    fn read_events_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(JSONL.as_bytes()).unwrap();
        assert_eq!(read_events(file.path()).unwrap().len(), 3);
    }

    #[test]
    fn build_collection_finalizes() {
        let events = parse_events(JSONL).unwrap();
        let (objects, report) = build_collection(&events, &FinalizeConfig::default()).unwrap();
        assert_eq!(report.instances, 1);
        assert_eq!(report.snapshots, 1);
        assert_eq!(report.auto_deleted, 0);
        let snap = objects
            .get_snapshot_at(&ObjectId::from(5), Timestamp::from_ms(17.0))
            .unwrap();
        assert_eq!(snap.args()["a"], 1);
    }

    #[test]
    fn build_collection_reports_failing_event() {
        let text = r#"[
            {"event": "created", "id": 9, "category": "catA", "name": "Foo", "ts": 1},
            {"event": "snapshot", "id": 9, "category": "catB", "name": "Foo", "ts": 2}
        ]"#;
        let events = parse_events(text).unwrap();
        let err = build_collection(&events, &FinalizeConfig::default()).unwrap_err();
        assert!(format!("{err}").contains("event #2"));
    }
}
