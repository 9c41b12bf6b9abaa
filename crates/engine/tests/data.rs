mod common;

use std::rc::Rc;

use common::{Log, drain, new_log, probe, started};
use serde_json::json;
use taproot_dom::MemoryDocument;
use taproot_engine::{Context, Controller, ControllerDefinition, HookResult, Runtime};
use taproot_types::{Document, NodeId};

/// Mirrors its greeting into the text of its element.
struct Greeter {
    log: Log,
}

impl Controller for Greeter {
    fn changed(&mut self, hook: &str, cx: &mut Context<'_>) -> HookResult {
        if hook == "greetingChanged" {
            let greeting = cx.data().get_string("greeting")?.unwrap_or_default();
            self.log.borrow_mut().push(format!("{hook} {greeting}"));
            let element = cx.element();
            cx.document_mut().set_text_content(element, &greeting);
        }
        Ok(())
    }
}

fn greeter(log: &Log) -> ControllerDefinition {
    let log = Rc::clone(log);
    ControllerDefinition::new("GreeterController", move || Box::new(Greeter { log: Rc::clone(&log) }))
        .with_default("greeting", "Hello, World!")
        .on_change("greeting")
}

fn start_greeter(markup: &str, log: &Log) -> (Runtime<MemoryDocument>, Vec<NodeId>) {
    let (document, nodes) = common::document_with(markup);
    let mut runtime = Runtime::new(document);
    runtime.register(greeter(log)).expect("register greeter");
    runtime.tick();
    (runtime, nodes)
}

#[test]
fn change_hooks_deliver_defaults_before_connect() {
    let log = new_log();
    let (runtime, nodes) = start_greeter(r#"<div data-controllers="greeter"></div>"#, &log);

    assert_eq!(drain(&log), vec!["greetingChanged Hello, World!"]);
    assert_eq!(runtime.document().text_content(nodes[0]), "Hello, World!");
}

#[test]
fn present_attributes_win_over_defaults_on_connect() {
    let log = new_log();
    let (runtime, nodes) = start_greeter(r#"<div data-controllers="greeter" data-greeter-greeting="Howdy"></div>"#, &log);
    assert_eq!(drain(&log), vec!["greetingChanged Howdy"]);
    assert_eq!(runtime.document().text_content(nodes[0]), "Howdy");
}

#[test]
fn writes_within_one_tick_collapse_into_one_hook_call() {
    let log = new_log();
    let (mut runtime, nodes) = start_greeter(r#"<div data-controllers="greeter"></div>"#, &log);
    drain(&log);

    runtime.document_mut().set_attribute(nodes[0], "data-greeter-greeting", "hi");
    runtime.document_mut().set_attribute(nodes[0], "data-greeter-greeting", "ho");
    runtime.tick();

    assert_eq!(drain(&log), vec!["greetingChanged ho"]);
    assert_eq!(runtime.document().text_content(nodes[0]), "ho");
}

#[test]
fn writes_that_end_where_they_started_are_not_reported() {
    let log = new_log();
    let (mut runtime, nodes) = start_greeter(r#"<div data-controllers="greeter" data-greeter-greeting="A"></div>"#, &log);
    drain(&log);

    for value in ["B", "C", "A"] {
        runtime.document_mut().set_attribute(nodes[0], "data-greeter-greeting", value);
    }
    runtime.tick();
    assert!(drain(&log).is_empty());

    runtime.document_mut().set_attribute(nodes[0], "data-greeter-greeting", "B");
    runtime.tick();
    runtime.document_mut().set_attribute(nodes[0], "data-greeter-greeting", "A");
    runtime.tick();
    assert_eq!(drain(&log), vec!["greetingChanged B", "greetingChanged A"]);
}

#[test]
fn removing_a_data_attribute_falls_back_to_the_default() {
    let log = new_log();
    let (mut runtime, nodes) = start_greeter(r#"<div data-controllers="greeter" data-greeter-greeting="Howdy"></div>"#, &log);
    drain(&log);

    runtime.document_mut().remove_attribute(nodes[0], "data-greeter-greeting");
    runtime.tick();
    assert_eq!(drain(&log), vec!["greetingChanged Hello, World!"]);
}

#[test]
fn attributes_of_other_namespaces_are_not_observed() {
    let log = new_log();
    let (mut runtime, nodes) = start_greeter(r#"<div data-controllers="greeter"></div>"#, &log);
    drain(&log);

    runtime.document_mut().set_attribute(nodes[0], "data-other-greeting", "hi");
    runtime.document_mut().set_attribute(nodes[0], "data-greeting", "hi");
    runtime.tick();
    assert!(drain(&log).is_empty());
}

#[test]
fn attribute_observation_stops_when_hooked_controllers_leave() {
    let log = new_log();
    let (mut runtime, nodes) = start_greeter(r#"<div data-controllers="greeter"></div>"#, &log);
    assert_eq!(runtime.document().observer_count(), 2);

    runtime.document_mut().set_attribute(nodes[0], "data-controllers", "");
    runtime.tick();
    assert_eq!(runtime.document().observer_count(), 1);

    drain(&log);
    runtime.document_mut().set_attribute(nodes[0], "data-greeter-greeting", "ignored");
    runtime.tick();
    assert!(drain(&log).is_empty());
}

#[test]
fn hooks_follow_the_namespace_of_their_descriptor() {
    let log = new_log();
    let (document, nodes) = common::document_with(r#"<div data-controllers="greeter probe"></div>"#);
    let mut runtime = Runtime::new(document);
    runtime.register(greeter(&log)).expect("register greeter");
    runtime
        .register(probe("Probe", &log).with_default("greeting", "hey").on_change("greeting"))
        .expect("register probe");
    runtime.tick();
    drain(&log);

    runtime.document_mut().set_attribute(nodes[0], "data-probe-greeting", "yo");
    runtime.tick();
    assert_eq!(drain(&log), vec!["greetingChanged probe yo"]);
}

#[test]
fn json_defaults_round_trip_through_attributes() {
    struct Ledger {
        log: Log,
    }

    impl Controller for Ledger {
        fn connect(&mut self, cx: &mut Context<'_>) -> HookResult {
            let mut data = cx.data();
            let mut entries = data.get("entries")?.unwrap_or_else(|| json!([]));
            if let Some(list) = entries.as_array_mut() {
                list.push(json!("connected"));
            }
            data.set("entries", Some(entries))?;
            Ok(())
        }

        fn changed(&mut self, hook: &str, cx: &mut Context<'_>) -> HookResult {
            let entries = cx.data().get("entries")?.unwrap_or_default();
            self.log.borrow_mut().push(format!("{hook} {entries}"));
            Ok(())
        }
    }

    let log = new_log();
    let (document, nodes) = common::document_with(r#"<div data-controllers="ledger"></div>"#);
    let mut runtime = Runtime::new(document);
    let hook_log = Rc::clone(&log);
    runtime
        .register(
            ControllerDefinition::new("Ledger", move || Box::new(Ledger { log: Rc::clone(&hook_log) }))
                .with_default("entries", json!([]))
                .on_change("entries"),
        )
        .expect("register ledger");
    runtime.tick();

    assert_eq!(drain(&log), vec!["entriesChanged []", r#"entriesChanged ["connected"]"#]);
    assert_eq!(
        runtime.document().attribute(nodes[0], "data-ledger-entries").as_deref(),
        Some(r#"["connected"]"#)
    );
}

#[test]
fn malformed_json_is_contained_in_the_hook() {
    let log = new_log();
    let (document, nodes) = common::document_with(r#"<div data-controllers="probe" data-probe-count="oops"></div>"#);
    let mut runtime = Runtime::new(document);
    runtime
        .register(probe("Probe", &log).with_default("count", 0).on_change("count"))
        .expect("register probe");
    runtime.tick();

    assert_eq!(drain(&log), vec!["connect probe"]);
    runtime.document_mut().set_attribute(nodes[0], "data-probe-count", "4");
    runtime.tick();
    assert_eq!(drain(&log), vec!["countChanged probe 4"]);
}

#[test]
fn node_lookups_skip_nested_instances_of_the_same_controller() {
    struct Collector {
        log: Log,
    }

    impl Controller for Collector {
        fn connect(&mut self, cx: &mut Context<'_>) -> HookResult {
            let items = cx.node_sets().get("item")?;
            let first = cx.nodes().get("item")?;
            let texts: Vec<String> = items.iter().map(|node| cx.document().text_content(*node)).collect();
            let first = first.map(|node| cx.document().text_content(node)).unwrap_or_default();
            self.log.borrow_mut().push(format!("{} first={first}", texts.join(",")));
            Ok(())
        }
    }

    let log = new_log();
    let (document, _) = common::document_with(
        r#"<ul data-controllers="list">
             <li data-list-item>one</li>
             <li data-controllers="other"><span data-list-item>two</span></li>
             <li data-controllers="list"><span data-list-item>nested</span></li>
           </ul>"#,
    );
    let mut runtime = Runtime::new(document);
    let hook_log = Rc::clone(&log);
    runtime
        .register(ControllerDefinition::new("List", move || Box::new(Collector { log: Rc::clone(&hook_log) })))
        .expect("register list");
    runtime.tick();

    assert_eq!(drain(&log), vec!["one,two first=one", "nested first=nested"]);
}

#[test]
fn hook_writes_are_processed_within_the_same_tick() {
    struct Echo;

    impl Controller for Echo {
        fn changed(&mut self, hook: &str, cx: &mut Context<'_>) -> HookResult {
            if hook == "sourceChanged" {
                let source = cx.data().get_string("source")?.unwrap_or_default();
                cx.data().put("target", source.to_uppercase())?;
            }
            Ok(())
        }
    }

    let log = new_log();
    let (document, nodes) = common::document_with(r#"<div data-controllers="echo"></div>"#);
    let mut runtime = Runtime::new(document);
    runtime
        .register(
            ControllerDefinition::new("Echo", || Box::new(Echo))
                .with_default("source", "")
                .with_default("target", "")
                .on_change("source"),
        )
        .expect("register echo");
    runtime.tick();

    runtime.document_mut().set_attribute(nodes[0], "data-echo-source", "loud");
    runtime.tick();
    assert_eq!(runtime.document().attribute(nodes[0], "data-echo-target").as_deref(), Some("LOUD"));
    assert!(log.borrow().is_empty());
}

#[test]
fn probe_log_stays_quiet_without_hooks() {
    let log = new_log();
    let (mut runtime, nodes) = started(r#"<div data-controllers="probe"></div>"#, &log);
    drain(&log);
    runtime.document_mut().set_attribute(nodes[0], "data-probe-anything", "1");
    runtime.tick();
    assert!(drain(&log).is_empty());
}
