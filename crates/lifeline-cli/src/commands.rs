use std::collections::BTreeSet;

use anyhow::Context;
use colored::Colorize;
use lifeline_model::{
    Deletion, FinalizeReport, ObjectCollection, ObjectEvent, ObjectInstance, Snapshot,
};
use lifeline_types::{ObjectId, Timestamp};
use serde_json::{json, Value};

use crate::cli::*;
use crate::config::CliConfig;
use crate::loader;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load_or_default(cli.config.as_deref())?;
    let format = cli.format;
    let output = match cli.command {
        Command::Summary(args) => {
            let (objects, report) = load(&args, &config)?;
            render_summary(&objects, &report, format)
        }
        Command::InstanceAt(args) => {
            let (objects, id, ts) = load_point(&args, &config)?;
            render_instance_at(&objects, &id, ts, format)
        }
        Command::SnapshotAt(args) => {
            let (objects, id, ts) = load_point(&args, &config)?;
            render_snapshot_at(&objects, &id, ts, format)
        }
        Command::List(args) => {
            let trace = TraceArgs { trace: args.trace };
            let (objects, _) = load(&trace, &config)?;
            render_list(&objects, args.name.as_deref(), format)
        }
        Command::Categories(args) => {
            let (objects, _) = load(&args, &config)?;
            render_categories(&objects, format)
        }
        Command::Events(args) => {
            let (objects, _) = load(&args, &config)?;
            render_events(&objects, format)
        }
    };
    println!("{output}");
    Ok(())
}

fn load(args: &TraceArgs, config: &CliConfig) -> anyhow::Result<(ObjectCollection, FinalizeReport)> {
    let events = loader::read_events(&args.trace)?;
    loader::build_collection(&events, &config.finalize)
}

fn load_point(
    args: &PointArgs,
    config: &CliConfig,
) -> anyhow::Result<(ObjectCollection, ObjectId, Timestamp)> {
    let ts = Timestamp::new(args.ts).context("invalid timestamp")?;
    let trace = TraceArgs {
        trace: args.trace.clone(),
    };
    let (objects, _) = load(&trace, config)?;
    let id = resolve_id(&objects, &args.id)?;
    Ok((objects, id, ts))
}

/// Parse a command-line id. Digits parse as a numeric id, but when the trace
/// only knows the same digits as a string id, that one is used instead.
fn resolve_id(objects: &ObjectCollection, raw: &str) -> anyhow::Result<ObjectId> {
    let id: ObjectId = raw.parse().context("invalid object id")?;
    if id.is_numeric() && objects.instance_map(&id).is_none() {
        let named = ObjectId::from(raw.trim());
        if objects.instance_map(&named).is_some() {
            return Ok(named);
        }
    }
    Ok(id)
}

fn render_summary(objects: &ObjectCollection, report: &FinalizeReport, format: OutputFormat) -> String {
    let by_type = objects.get_all_instances_by_type_name();
    if format == OutputFormat::Json {
        let types: serde_json::Map<String, Value> = by_type
            .iter()
            .map(|(name, instances)| (name.to_string(), json!(instances.len())))
            .collect();
        return pretty(&json!({ "report": report, "types": types }));
    }

    let mut out = format!(
        "{} {} ids, {} lifetimes, {} snapshots",
        "Trace:".bold(),
        report.ids.to_string().bold(),
        report.instances,
        report.snapshots
    );
    if report.auto_deleted > 0 {
        out += &format!("\n  auto-deleted: {}", report.auto_deleted.to_string().yellow());
    }
    if report.shifted_by != 0.0 {
        out += &format!("\n  shifted by: {}ms", report.shifted_by);
    }
    match (report.bounds.min(), report.bounds.max()) {
        (Some(min), Some(max)) => {
            out += &format!("\n  bounds: {min} .. {max} ({}ms)", report.bounds.duration())
        }
        _ => out += "\n  bounds: (empty)",
    }
    for (name, instances) in &by_type {
        out += &format!("\n  {:>6}  {}", instances.len(), name.cyan());
    }
    out
}

fn render_instance_at(objects: &ObjectCollection, id: &ObjectId, ts: Timestamp, format: OutputFormat) -> String {
    let found = objects.get_object_instance_at(id, ts);
    match format {
        OutputFormat::Json => pretty(&found.map_or(Value::Null, instance_json)),
        OutputFormat::Text => match found {
            Some(instance) => describe_instance(instance),
            None => format!("No lifetime of {} covers {}", id.to_string().bold(), ts),
        },
    }
}

fn render_snapshot_at(objects: &ObjectCollection, id: &ObjectId, ts: Timestamp, format: OutputFormat) -> String {
    let found = objects.get_snapshot_at(id, ts);
    match format {
        OutputFormat::Json => pretty(&found.map_or(Value::Null, snapshot_json)),
        OutputFormat::Text => match found {
            Some(snapshot) => {
                let owner = objects
                    .instance(snapshot.instance())
                    .map(describe_instance)
                    .unwrap_or_default();
                format!("{}\n{}", owner, describe_snapshot(snapshot))
            }
            None => format!("No snapshot of {} at {}", id.to_string().bold(), ts),
        },
    }
}

fn render_list(objects: &ObjectCollection, name: Option<&str>, format: OutputFormat) -> String {
    let instances = match name {
        Some(name) => objects.get_all_instances_named(name),
        None => objects.get_all_object_instances(),
    };
    match format {
        OutputFormat::Json => pretty(&Value::Array(instances.into_iter().map(instance_json).collect())),
        OutputFormat::Text if instances.is_empty() => "No lifetimes.".to_string(),
        OutputFormat::Text => instances
            .into_iter()
            .map(describe_instance)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_categories(objects: &ObjectCollection, format: OutputFormat) -> String {
    let mut categories = BTreeSet::new();
    objects.add_categories_to_dict(&mut categories);
    match format {
        OutputFormat::Json => pretty(&json!(categories)),
        OutputFormat::Text => categories.into_iter().collect::<Vec<_>>().join("\n"),
    }
}

fn render_events(objects: &ObjectCollection, format: OutputFormat) -> String {
    let mut lines = Vec::new();
    let mut values = Vec::new();
    objects.iterate_all_events(|event| match format {
        OutputFormat::Json => values.push(match event {
            ObjectEvent::Instance(instance) => json!({ "instance": instance_json(instance) }),
            ObjectEvent::Snapshot(snapshot) => json!({ "snapshot": snapshot_json(snapshot) }),
        }),
        OutputFormat::Text => lines.push(match event {
            ObjectEvent::Instance(instance) => describe_instance(instance),
            ObjectEvent::Snapshot(snapshot) => describe_snapshot(snapshot),
        }),
    });
    match format {
        OutputFormat::Json => pretty(&Value::Array(values)),
        OutputFormat::Text => lines.join("\n"),
    }
}

fn describe_instance(instance: &ObjectInstance) -> String {
    let created = if instance.creation_ts_was_explicit() {
        "created"
    } else {
        "first seen"
    };
    let end = match instance.deletion() {
        Deletion::Open => "open".green().to_string(),
        Deletion::Explicit(ts) => format!("deleted {ts}"),
        Deletion::Implicit(ts) => format!("closed {ts}").dimmed().to_string(),
    };
    format!(
        "{} {} [{}] {} {}, {}, {} snapshots",
        instance.id().to_string().yellow(),
        instance.name().cyan(),
        instance.category(),
        created,
        instance.creation_ts(),
        end,
        instance.snapshots().len()
    )
}

fn describe_snapshot(snapshot: &Snapshot) -> String {
    format!("  @ {} {}", snapshot.ts(), snapshot.args())
}

fn instance_json(instance: &ObjectInstance) -> Value {
    json!({
        "id": instance.id(),
        "category": instance.category(),
        "name": instance.name(),
        "creation_ts": instance.creation_ts(),
        "creation_ts_was_explicit": instance.creation_ts_was_explicit(),
        "deletion_ts": instance.deletion_ts(),
        "deletion_ts_was_explicit": instance.deletion_ts_was_explicit(),
        "snapshots": instance.snapshots().len(),
        "behavior": instance.behavior().map(|b| b.kind()),
    })
}

fn snapshot_json(snapshot: &Snapshot) -> Value {
    json!({ "ts": snapshot.ts(), "args": snapshot.args() })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use lifeline_model::FinalizeConfig;

    use super::*;

    fn sample() -> (ObjectCollection, FinalizeReport) {
        let events = loader::parse_events(
            r#"[
                {"event": "created", "id": 5, "category": "cat", "name": "Foo", "ts": 10},
                {"event": "snapshot", "id": 5, "category": "cat", "name": "Foo", "ts": 15, "args": {"a": 1}},
                {"event": "deleted", "id": 5, "category": "cat", "name": "Foo", "ts": 20},
                {"event": "snapshot", "id": "0xb", "category": "gpu", "name": "Bar", "ts": 12}
            ]"#,
        )
        .unwrap();
        loader::build_collection(&events, &FinalizeConfig::default()).unwrap()
    }

    fn ts(ms: f64) -> Timestamp {
        Timestamp::from_ms(ms)
    }

    #[test]
    fn digit_string_ids_are_found_from_the_command_line() {
        let events = loader::parse_events(
            r#"[
                {"event": "created", "id": "42", "category": "cat", "name": "Quoted", "ts": 1},
                {"event": "created", "id": 7, "category": "cat", "name": "Plain", "ts": 1}
            ]"#,
        )
        .unwrap();
        let (objects, _) = loader::build_collection(&events, &FinalizeConfig::default()).unwrap();

        let quoted = resolve_id(&objects, "42").unwrap();
        assert_eq!(quoted, ObjectId::from("42"));
        let text = render_instance_at(&objects, &quoted, ts(1.0), OutputFormat::Text);
        assert!(text.contains("Quoted"));

        assert_eq!(resolve_id(&objects, "7").unwrap(), ObjectId::from(7));
        assert_eq!(resolve_id(&objects, "99").unwrap(), ObjectId::from(99));
        assert!(resolve_id(&objects, " ").is_err());
    }

    #[test]
    fn summary_json_counts_types() {
        let (objects, report) = sample();
        let out: Value = serde_json::from_str(&render_summary(&objects, &report, OutputFormat::Json)).unwrap();
        assert_eq!(out["report"]["instances"], 2);
        assert_eq!(out["report"]["auto_deleted"], 1);
        assert_eq!(out["types"]["Foo"], 1);
        assert_eq!(out["types"]["Bar"], 1);
    }

    #[test]
    fn instance_at_json() {
        let (objects, _) = sample();
        let out: Value =
            serde_json::from_str(&render_instance_at(&objects, &ObjectId::from(5), ts(17.0), OutputFormat::Json))
                .unwrap();
        assert_eq!(out["name"], "Foo");
        assert_eq!(out["deletion_ts"], 20.0);
        assert_eq!(out["deletion_ts_was_explicit"], true);
        assert_eq!(out["behavior"], "generic");
    }

    #[test]
    fn instance_at_gap_is_null_or_message() {
        let (objects, _) = sample();
        let json = render_instance_at(&objects, &ObjectId::from(5), ts(25.0), OutputFormat::Json);
        assert_eq!(json, "null");
        let text = render_instance_at(&objects, &ObjectId::from(5), ts(25.0), OutputFormat::Text);
        assert!(text.contains("No lifetime"));
    }

    #[test]
    fn snapshot_at_text_shows_owner_and_args() {
        let (objects, _) = sample();
        let text = render_snapshot_at(&objects, &ObjectId::from(5), ts(16.0), OutputFormat::Text);
        assert!(text.contains("Foo"));
        assert!(text.contains(r#"{"a":1}"#));
    }

    #[test]
    fn list_filters_by_name() {
        let (objects, _) = sample();
        let out: Value = serde_json::from_str(&render_list(&objects, Some("Bar"), OutputFormat::Json)).unwrap();
        assert_eq!(out.as_array().map(Vec::len), Some(1));
        assert_eq!(out[0]["creation_ts_was_explicit"], false);
        assert_eq!(render_list(&objects, Some("Nope"), OutputFormat::Text), "No lifetimes.");
    }

    #[test]
    fn categories_are_sorted() {
        let (objects, _) = sample();
        assert_eq!(render_categories(&objects, OutputFormat::Text), "cat\ngpu");
    }

    #[test]
    fn events_interleave_snapshots() {
        let (objects, _) = sample();
        let out: Value = serde_json::from_str(&render_events(&objects, OutputFormat::Json)).unwrap();
        let kinds: Vec<&str> = out
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_object().and_then(|o| o.keys().next()).map(String::as_str))
            .collect();
        assert_eq!(kinds, vec!["instance", "snapshot", "instance", "snapshot"]);
    }
}
