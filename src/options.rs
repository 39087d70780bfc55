//! Options handed to member configuration functions
//!
//! The same [`MemberOptions`] type serves two phases. At configuration time a
//! probe instance records calls to [`MemberOptions::map_from`],
//! [`MemberOptions::ignore`] and [`MemberOptions::condition`] so the builder can
//! shape the property tree before any real data exists. At mapping time a live
//! instance carries the source object and the intermediate value of the
//! transformation chain.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};

use crate::path::value_at_path;

/// Predicate over the whole source object
pub type ConditionFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Intent recorded while probing a member configuration function
#[derive(Default)]
pub(crate) struct ProbeRecord {
    pub(crate) map_from: Option<String>,
    pub(crate) ignore: bool,
    pub(crate) condition: Option<ConditionFn>,
}

pub(crate) type ProbeHandle = Arc<Mutex<ProbeRecord>>;

/// Options passed to `for_member` / `for_source_member` functions
pub struct MemberOptions {
    source_object: Option<Arc<Value>>,
    source_property_name: String,
    intermediate_property_value: Option<Value>,
    probe: Option<ProbeHandle>,
}

impl MemberOptions {
    pub(crate) fn live(
        source_object: Option<Arc<Value>>,
        source_property_name: impl Into<String>,
        intermediate_property_value: Option<Value>,
    ) -> Self {
        Self {
            source_object,
            source_property_name: source_property_name.into(),
            intermediate_property_value,
            probe: None,
        }
    }

    pub(crate) fn probe(source_property_name: impl Into<String>) -> (Self, ProbeHandle) {
        let handle = ProbeHandle::default();
        let options = Self {
            source_object: Some(Arc::new(Value::Object(Map::new()))),
            source_property_name: source_property_name.into(),
            intermediate_property_value: None,
            probe: Some(handle.clone()),
        };
        (options, handle)
    }

    /// The source item being mapped
    pub fn source_object(&self) -> Option<&Value> {
        self.source_object.as_deref()
    }

    /// Full dot path of the source member feeding this property
    pub fn source_property_name(&self) -> &str {
        &self.source_property_name
    }

    /// Output of the previous step, or the raw source value for the first step
    pub fn intermediate_property_value(&self) -> Option<&Value> {
        self.intermediate_property_value.as_ref()
    }

    /// True while the builder probes the function at configuration time
    pub fn is_probe(&self) -> bool {
        self.probe.is_some()
    }

    /// Take the value from another source member.
    ///
    /// While probing, this rebases the property onto `source_path`. At mapping
    /// time it reads `source_path` from the source object, makes it the
    /// intermediate value and returns it.
    pub fn map_from(&mut self, source_path: &str) -> Option<Value> {
        if let Some(probe) = &self.probe {
            record(probe).map_from = Some(source_path.to_string());
            return None;
        }

        let value = self
            .source_object
            .as_deref()
            .and_then(|source| value_at_path(source, source_path))
            .cloned();
        self.intermediate_property_value = value.clone();
        value
    }

    /// Exclude this property from the output
    pub fn ignore(&mut self) {
        if let Some(probe) = &self.probe {
            record(probe).ignore = true;
        }
    }

    /// Only map this property when `predicate` holds for the source object
    pub fn condition<P>(&mut self, predicate: P)
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        if let Some(probe) = &self.probe {
            record(probe).condition = Some(Arc::new(predicate));
        }
    }

    pub(crate) fn into_intermediate(self) -> Option<Value> {
        self.intermediate_property_value
    }
}

impl fmt::Debug for MemberOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberOptions")
            .field("source_property_name", &self.source_property_name)
            .field("intermediate_property_value", &self.intermediate_property_value)
            .field("probe", &self.is_probe())
            .finish()
    }
}

pub(crate) fn record(handle: &ProbeHandle) -> std::sync::MutexGuard<'_, ProbeRecord> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome delivered through a [`Completion`]
pub(crate) type StepResult = Result<Option<Value>, String>;

type CompletionFn = Box<dyn FnOnce(StepResult) + Send>;

/// Callback handle of an asynchronous transformation step or converter.
///
/// Exactly one of [`complete`](Self::complete), [`complete_with`](Self::complete_with),
/// [`skip`](Self::skip) or [`fail`](Self::fail) is expected. Dropping the handle
/// without calling any of them fails the step.
pub struct Completion {
    inner: Option<CompletionFn>,
}

impl Completion {
    pub(crate) fn new<F>(callback: F) -> Self
    where
        F: FnOnce(StepResult) + Send + 'static,
    {
        Self {
            inner: Some(Box::new(callback)),
        }
    }

    /// A completion that discards whatever it receives
    pub(crate) fn detached() -> Self {
        Self { inner: None }
    }

    /// Finish the step with a value
    pub fn complete(mut self, value: Value) {
        self.finish(Ok(Some(value)));
    }

    /// Finish the step with an optional value; `None` keeps the prior value
    pub fn complete_with(mut self, value: Option<Value>) {
        self.finish(Ok(value));
    }

    /// Finish the step without producing a value
    pub fn skip(mut self) {
        self.finish(Ok(None));
    }

    /// Fail the step; the mapping callback receives the error
    pub fn fail(mut self, reason: impl Into<String>) {
        self.finish(Err(reason.into()));
    }

    fn finish(&mut self, result: StepResult) {
        if let Some(callback) = self.inner.take() {
            callback(result);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.finish(Err("completion dropped without being invoked".to_string()));
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.inner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_probe_records_intent() {
        let (mut options, handle) = MemberOptions::probe("fullName");
        assert!(options.is_probe());
        assert_eq!(options.source_object(), Some(&json!({})));

        assert_eq!(options.map_from("name.first"), None);
        options.ignore();
        options.condition(|source| source.get("active").is_some());

        let recorded = record(&handle);
        assert_eq!(recorded.map_from.as_deref(), Some("name.first"));
        assert!(recorded.ignore);
        assert!(recorded.condition.is_some());
    }

    #[test]
    fn test_live_map_from_sets_intermediate() {
        let source = Arc::new(json!({"name": {"first": "John"}}));
        let mut options = MemberOptions::live(Some(source), "fullName", None);

        assert_eq!(options.map_from("name.first"), Some(json!("John")));
        assert_eq!(options.intermediate_property_value(), Some(&json!("John")));

        options.ignore();
        assert!(!options.is_probe());
    }

    #[test]
    fn test_completion_delivers_once() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let completion = Completion::new(move |result| sink.lock().unwrap().push(result));

        completion.complete(json!(1));

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], Ok(Some(json!(1))));
    }

    #[test]
    fn test_dropped_completion_fails() {
        let received = Arc::new(Mutex::new(None));
        let sink = received.clone();
        drop(Completion::new(move |result| {
            *sink.lock().unwrap() = Some(result);
        }));

        assert!(matches!(*received.lock().unwrap(), Some(Err(_))));
    }

    #[test]
    fn test_detached_completion_ignores_drop() {
        Completion::detached().fail("ignored");
        drop(Completion::detached());
    }
}
