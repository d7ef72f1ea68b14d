//! Handler registrations
//!
//! A `Handler` is the token returned by `subscribe` and passed back to
//! `unsubscribe`. Identity is per registration: two handlers wrapping the
//! same closure are distinct, while clones of one handler are the same
//! registration.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

/// Callback invoked for every delivery on a subscribed channel.
///
/// Runs on the transport's I/O task, so it should return quickly.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle(&self, channel: &str, data: &Value);
}

impl<F> MessageHandler for F
where
    F: Fn(&str, &Value) + Send + Sync + 'static,
{
    fn handle(&self, channel: &str, data: &Value) {
        self(channel, data)
    }
}

#[derive(Clone)]
pub struct Handler {
    id: Uuid,
    inner: Arc<dyn MessageHandler>,
}

impl Handler {
    pub fn new<H: MessageHandler>(handler: H) -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: Arc::new(handler),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run the callback, containing any panic. Returns `false` if it panicked.
    pub(crate) fn invoke(&self, channel: &str, data: &Value) -> bool {
        catch_unwind(AssertUnwindSafe(|| self.inner.handle(channel, data))).is_ok()
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Handler {}

impl Hash for Handler {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("id", &self.id).finish()
    }
}
