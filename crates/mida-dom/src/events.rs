//! DOM Events
//!
//! Custom events with a JSON detail payload, dispatched from a target node
//! up to the document node.

use crate::{Document, NodeId};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Event listener callback
pub type EventListener = Rc<dyn Fn(&DomEvent)>;

/// DOM event
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub event_type: String,
    pub target: NodeId,
    pub current_target: Option<NodeId>,
    pub detail: Value,
    pub bubbles: bool,
    propagation_stopped: std::cell::Cell<bool>,
}

impl DomEvent {
    /// Create a bubbling custom event
    pub fn custom(event_type: &str, target: NodeId, detail: Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: None,
            detail,
            bubbles: true,
            propagation_stopped: std::cell::Cell::new(false),
        }
    }

    /// Create a non-bubbling event
    pub fn non_bubbling(mut self) -> Self {
        self.bubbles = false;
        self
    }

    /// Stop propagation to further ancestors
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    /// Whether a listener stopped propagation
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

/// Listener table keyed by node then event type
#[derive(Default)]
pub(crate) struct Listeners {
    by_node: HashMap<NodeId, Vec<(String, EventListener)>>,
}

impl Listeners {
    pub(crate) fn add(&mut self, node: NodeId, event_type: &str, listener: EventListener) {
        self.by_node.entry(node).or_default().push((event_type.to_string(), listener));
    }

    pub(crate) fn remove_node(&mut self, node: NodeId) {
        self.by_node.remove(&node);
    }

    pub(crate) fn for_node(&self, node: NodeId, event_type: &str) -> Vec<EventListener> {
        self.by_node
            .get(&node)
            .map(|ls| ls.iter()
                .filter(|(t, _)| t == event_type)
                .map(|(_, l)| Rc::clone(l))
                .collect())
            .unwrap_or_default()
    }
}

/// Dispatch an event from its target toward the document node
///
/// The propagation path and listeners are collected first and the document
/// borrow is released before any listener runs, so listeners are free to
/// borrow the document themselves. Returns the number of listeners invoked.
pub fn dispatch_event(document: &RefCell<Document>, mut event: DomEvent) -> usize {
    let plan: Vec<(NodeId, Vec<EventListener>)> = {
        let doc = document.borrow();
        let tree = doc.tree();
        let mut path = vec![event.target];
        if event.bubbles {
            path.extend(tree.ancestors(event.target));
        }
        path.into_iter()
            .map(|node| (node, doc.listeners().for_node(node, &event.event_type)))
            .filter(|(_, ls)| !ls.is_empty())
            .collect()
    };

    tracing::trace!(event = %event.event_type, target = %event.target, "dispatching event");

    let mut invoked = 0;
    for (node, listeners) in plan {
        event.current_target = Some(node);
        for listener in listeners {
            listener(&event);
            invoked += 1;
        }
        if event.is_propagation_stopped() {
            break;
        }
    }
    invoked
}
