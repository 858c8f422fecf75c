//! Document builders and an in-memory provider

use async_trait::async_trait;
use serde_json::{json, Value};
use smil_common::{Document, Node};
use smil_player::document::DocumentProvider;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Layout shared by the tests: `main` split into `main-a`/`main-b`, plus `side`
pub fn layout() -> Value {
    json!({
        "root": { "name": "root", "width": 1920, "height": 1080 },
        "regions": [
            {
                "name": "main", "width": 1280, "height": 1080,
                "nested": [
                    { "name": "main-a", "width": 1280, "height": 540 },
                    { "name": "main-b", "top": 540, "width": 1280, "height": 540 }
                ]
            },
            { "name": "side", "left": 1280, "width": 640, "height": 1080 }
        ]
    })
}

pub fn node(value: Value) -> Node {
    serde_json::from_value(value).expect("invalid node JSON")
}

/// Document over the shared layout with `playlist` as its root
pub fn document(playlist: Value) -> Document {
    document_with_triggers(playlist, json!({}))
}

pub fn document_with_triggers(playlist: Value, triggers: Value) -> Document {
    serde_json::from_value(json!({
        "layout": layout(),
        "playlist": playlist,
        "triggers": triggers,
    }))
    .expect("invalid document JSON")
}

/// Provider serving a document from memory; `replace` marks it changed
pub struct MemoryProvider {
    current: Mutex<Document>,
    changed: AtomicBool,
    loads: AtomicUsize,
}

impl MemoryProvider {
    pub fn new(doc: Document) -> Self {
        Self {
            current: Mutex::new(doc),
            changed: AtomicBool::new(false),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn replace(&self, doc: Document) {
        *self.current.lock().unwrap() = doc;
        self.changed.store(true, Ordering::SeqCst);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentProvider for MemoryProvider {
    async fn load(&self) -> anyhow::Result<Document> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.changed.store(false, Ordering::SeqCst);
        Ok(self.current.lock().unwrap().clone())
    }

    async fn has_changed(&self) -> anyhow::Result<bool> {
        Ok(self.changed.load(Ordering::SeqCst))
    }
}
