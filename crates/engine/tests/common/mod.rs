#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use anyhow::bail;
use taproot_dom::MemoryDocument;
use taproot_engine::{Context, Controller, ControllerDefinition, HookResult, Runtime};
use taproot_types::{Event, NodeId};

/// Shared record of hook calls, one line per call.
pub type Log = Rc<RefCell<Vec<String>>>;

pub fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Takes every line logged so far.
pub fn drain(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

pub fn count(log: &Log, line: &str) -> usize {
    log.borrow().iter().filter(|entry| entry.as_str() == line).count()
}

/// Logs `"{hook} {descriptor}"` for lifecycle hooks and `"{action} {descriptor}"`
/// for actions. A few action names steer the event or fail on purpose.
pub struct Probe {
    log: Log,
}

impl Controller for Probe {
    fn connect(&mut self, cx: &mut Context<'_>) -> HookResult {
        self.log.borrow_mut().push(format!("connect {}", cx.descriptor()));
        Ok(())
    }

    fn disconnect(&mut self, cx: &mut Context<'_>) -> HookResult {
        self.log.borrow_mut().push(format!("disconnect {}", cx.descriptor()));
        Ok(())
    }

    fn changed(&mut self, hook: &str, cx: &mut Context<'_>) -> HookResult {
        let key = hook.strip_suffix("Changed").unwrap_or(hook);
        let value = cx.data().get_string(key)?.unwrap_or_default();
        self.log.borrow_mut().push(format!("{hook} {} {value}", cx.descriptor()));
        Ok(())
    }

    fn perform(&mut self, action: &str, event: &mut Event, cx: &mut Context<'_>) -> HookResult {
        self.log.borrow_mut().push(format!("{action} {}", cx.descriptor()));
        match action {
            "fail" => bail!("action failed on purpose"),
            "explode" => panic!("action panicked on purpose"),
            "halt" => event.stop_immediate_propagation(),
            "stop" => event.stop_propagation(),
            "cancel" => event.prevent_default(),
            _ => {}
        }
        Ok(())
    }
}

pub fn probe(name: &str, log: &Log) -> ControllerDefinition {
    let log = Rc::clone(log);
    ControllerDefinition::new(name, move || Box::new(Probe { log: Rc::clone(&log) }))
}

/// A document whose body holds `markup`, plus every element the markup created.
pub fn document_with(markup: &str) -> (MemoryDocument, Vec<NodeId>) {
    init_tracing();
    let mut document = MemoryDocument::new();
    let body = document.body();
    let nodes = document.append_html(body, markup).expect("append markup");
    (document, nodes)
}

/// An initialized runtime over `markup` with a `probe` controller registered.
pub fn started(markup: &str, log: &Log) -> (Runtime<MemoryDocument>, Vec<NodeId>) {
    let (document, nodes) = document_with(markup);
    let mut runtime = Runtime::new(document);
    runtime.register(probe("ProbeController", log)).expect("register probe");
    runtime.tick();
    (runtime, nodes)
}

pub fn click(runtime: &mut Runtime<MemoryDocument>, target: NodeId) -> Event {
    let event = runtime.dispatch(target, Event::new("click", target));
    runtime.tick();
    event
}
