//! End-to-end resolution of the bundled sample schema

use std::sync::Arc;

use managed_config::core::{AppConfig, Event, Orchestrator};
use managed_config::restrictions::{
    keys, project, resolve, resolve_with_report, OverrideMap, OverrideValue, QueuedFeedback,
    Record, RestrictionValue, Source, StaticOverrides,
};
use managed_config::sample;

fn item(key: &str, value: &str) -> OverrideMap {
    OverrideMap::new()
        .with(keys::ITEM_KEY, OverrideValue::Text(key.into()))
        .with(keys::ITEM_VALUE, OverrideValue::Text(value.into()))
}

#[test]
fn defaults_without_overrides() {
    let schema = sample::schema().unwrap();
    let format = AppConfig::default().display.projection_format();

    let resolved = resolve(&schema, None);
    assert_eq!(resolved, resolve(&schema, Some(&OverrideMap::new())));
    assert_eq!(resolved.len(), schema.len());
    for entry in schema.entries() {
        assert_eq!(resolved.get(&entry.key), Some(&entry.default));
    }

    let facts = project(&resolved, &format);
    let hello = facts.get(keys::CAN_SAY_HELLO).unwrap();
    assert!(hello.enabled);
    assert_eq!(hello.display_text, "I can say hello to you.");
    assert_eq!(facts.get(keys::NUMBER).unwrap().display_text, "Your number: 10");
    assert_eq!(facts.get(keys::RANK).unwrap().display_text, "Your rank: apprentice");
    assert_eq!(
        facts.get(keys::APPROVALS).unwrap().display_text,
        "Approvals you have: none"
    );
    assert!(facts.get("secret_code").is_none());
}

#[test]
fn overrides_from_json() {
    let schema = sample::schema().unwrap();
    let overrides = OverrideMap::from_json_str(
        r#"{
            "can_say_hello": false,
            "number": "twelve",
            "approvals": ["alice", "bob"],
            "items": [
                {"key": "a", "value": "1"},
                {"key": "b"},
                {"key": "c", "value": "3"}
            ],
            "unknown": 5
        }"#,
    )
    .unwrap();

    let (resolved, report) = resolve_with_report(&schema, Some(&overrides));
    assert_eq!(resolved.bool(keys::CAN_SAY_HELLO), Some(false));
    assert_eq!(resolved.int(keys::NUMBER), Some(10));
    assert_eq!(report.source(keys::NUMBER), Some(Source::Mistyped));
    assert_eq!(report.source(keys::RANK), Some(Source::Default));
    assert_eq!(report.skipped_items(keys::ITEMS), 1);
    assert!(resolved.get("unknown").is_none());

    let records = resolved.records(keys::ITEMS).unwrap();
    assert_eq!(records.len(), 2);
    let expected: Record = [("key", "c"), ("value", "3")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert_eq!(records[1], expected);

    let facts = project(&resolved, &AppConfig::default().display.projection_format());
    let hello = facts.get(keys::CAN_SAY_HELLO).unwrap();
    assert!(!hello.enabled);
    assert_eq!(hello.display_text, "I am restricted from saying hello to you.");
    assert_eq!(
        facts.get(keys::APPROVALS).unwrap().display_text,
        "Approvals you have: alice, bob"
    );
    assert_eq!(facts.get(keys::ITEMS).unwrap().display_text, "Your items: a:1, c:3");
}

#[test]
fn empty_lists_resolve_to_none() {
    let schema = sample::schema().unwrap();
    let overrides = OverrideMap::new()
        .with(keys::APPROVALS, OverrideValue::TextList(Vec::new()))
        .with(keys::ITEMS, OverrideValue::BundleList(vec![OverrideMap::new()]));

    let resolved = resolve(&schema, Some(&overrides));
    assert_eq!(resolved.get(keys::APPROVALS), Some(&RestrictionValue::None));
    assert_eq!(resolved.get(keys::ITEMS), Some(&RestrictionValue::None));
}

#[test]
fn orchestrator_reports_feedback_and_changes() {
    let schema = sample::schema().unwrap();
    let config = AppConfig::default();
    let (channel, feedback) = QueuedFeedback::new();
    let supplier = Arc::new(StaticOverrides::new(None));
    let orchestrator = Orchestrator::new(config.session(schema, Box::new(channel)), supplier.clone());
    let observer = orchestrator.event_bus().subscribe();

    orchestrator.refresh();
    assert_eq!(orchestrator.say_hello().as_deref(), Some("Hello!"));
    let states: Vec<_> = feedback.try_iter().collect();
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].message.as_deref(), Some("Value is true"));
    observer.drain();

    supplier.replace(Some(
        OverrideMap::new()
            .with(keys::MESSAGE, OverrideValue::Text("Good morning".into()))
            .with(keys::ITEMS, OverrideValue::BundleList(vec![item("x", "y")])),
    ));
    let subscription = orchestrator.event_bus().subscribe();
    orchestrator.notify_restrictions_changed();
    orchestrator.shutdown();
    assert_eq!(orchestrator.run(subscription), 1);

    let changed: Vec<String> = observer
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            Event::FactsUpdated { key, .. } => Some(key),
            _ => None,
        })
        .collect();
    assert_eq!(changed, vec![keys::ITEMS.to_string()]);
    assert_eq!(orchestrator.say_hello().as_deref(), Some("Good morning"));

    let states: Vec<_> = feedback.try_iter().collect();
    assert_eq!(states[1].data.as_deref(), Some("Good morning"));
}
