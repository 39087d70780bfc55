//! Transformation steps attached to destination properties

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::options::{Completion, ConditionFn, MemberOptions, record};

/// Synchronous member function: returns the new intermediate value, or `None`
/// to keep the prior one
pub type MemberFn = Arc<dyn Fn(&mut MemberOptions) -> Option<Value> + Send + Sync>;

/// Asynchronous member function: finishes through the [`Completion`]
pub type AsyncMemberFn = Arc<dyn Fn(MemberOptions, Completion) + Send + Sync>;

/// One step of a transformation chain, tagged at registration time
#[derive(Clone)]
pub enum Transformation {
    /// Fixed literal captured at registration
    Constant(Value),
    /// Destination-centric function (`for_member`)
    MemberOptions(MemberFn),
    /// Source-centric function (`for_source_member`)
    SourceMemberOptions(MemberFn),
    /// Destination-centric function completing through a callback
    AsyncMemberOptions(AsyncMemberFn),
    /// Source-centric function completing through a callback
    AsyncSourceMemberOptions(AsyncMemberFn),
}

impl Transformation {
    /// Kind tag of this step
    pub fn kind(&self) -> TransformationKind {
        match self {
            Transformation::Constant(_) => TransformationKind::Constant,
            Transformation::MemberOptions(_) => TransformationKind::MemberOptions,
            Transformation::SourceMemberOptions(_) => TransformationKind::SourceMemberOptions,
            Transformation::AsyncMemberOptions(_) => TransformationKind::AsyncMemberOptions,
            Transformation::AsyncSourceMemberOptions(_) => {
                TransformationKind::AsyncSourceMemberOptions
            }
        }
    }

    /// Whether the step completes through a callback
    pub fn is_async(&self) -> bool {
        self.kind().is_async()
    }
}

impl fmt::Debug for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transformation::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            other => f.debug_tuple(&other.kind().to_string()).finish(),
        }
    }
}

/// Kind of a transformation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationKind {
    Constant,
    MemberOptions,
    SourceMemberOptions,
    AsyncMemberOptions,
    AsyncSourceMemberOptions,
}

impl TransformationKind {
    pub fn is_async(self) -> bool {
        matches!(
            self,
            TransformationKind::AsyncMemberOptions | TransformationKind::AsyncSourceMemberOptions
        )
    }
}

impl fmt::Display for TransformationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformationKind::Constant => write!(f, "constant"),
            TransformationKind::MemberOptions => write!(f, "member_options"),
            TransformationKind::SourceMemberOptions => write!(f, "source_member_options"),
            TransformationKind::AsyncMemberOptions => write!(f, "async_member_options"),
            TransformationKind::AsyncSourceMemberOptions => {
                write!(f, "async_source_member_options")
            }
        }
    }
}

/// Value-or-function argument of `for_member` and `for_source_member`
#[derive(Clone)]
pub enum MemberConfiguration {
    Value(Value),
    Function(MemberFn),
    AsyncFunction(AsyncMemberFn),
}

impl MemberConfiguration {
    /// Wrap a synchronous member function
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&mut MemberOptions) -> Option<Value> + Send + Sync + 'static,
    {
        MemberConfiguration::Function(Arc::new(f))
    }

    /// Wrap an asynchronous member function
    pub fn async_function<F>(f: F) -> Self
    where
        F: Fn(MemberOptions, Completion) + Send + Sync + 'static,
    {
        MemberConfiguration::AsyncFunction(Arc::new(f))
    }

    pub fn is_function(&self) -> bool {
        !matches!(self, MemberConfiguration::Value(_))
    }

    /// Call the function once with a probe options object and report what it
    /// asked for. The return value is discarded and panics are swallowed.
    /// The process panic hook still runs first, so the default hook prints
    /// the panic message to stderr.
    pub(crate) fn probe(&self, property: &str) -> Probe {
        let (options, handle) = MemberOptions::probe(property);
        let outcome = match self {
            MemberConfiguration::Value(_) => Ok(()),
            MemberConfiguration::Function(f) => {
                let mut options = options;
                catch_unwind(AssertUnwindSafe(|| {
                    let _ = f(&mut options);
                }))
            }
            MemberConfiguration::AsyncFunction(f) => {
                catch_unwind(AssertUnwindSafe(|| f(options, Completion::detached())))
            }
        };

        if outcome.is_err() {
            tracing::warn!(property, "Member configuration function panicked while probing");
        }

        let mut recorded = record(&handle);
        Probe {
            map_from: recorded.map_from.take(),
            ignore: recorded.ignore,
            condition: recorded.condition.take(),
        }
    }

    /// Transformation step for a destination-centric registration
    pub(crate) fn into_member_transformation(self) -> Transformation {
        match self {
            MemberConfiguration::Value(value) => Transformation::Constant(value),
            MemberConfiguration::Function(f) => Transformation::MemberOptions(f),
            MemberConfiguration::AsyncFunction(f) => Transformation::AsyncMemberOptions(f),
        }
    }

    /// Transformation step for a source-centric registration
    pub(crate) fn into_source_member_transformation(self) -> Transformation {
        match self {
            MemberConfiguration::Value(value) => Transformation::Constant(value),
            MemberConfiguration::Function(f) => Transformation::SourceMemberOptions(f),
            MemberConfiguration::AsyncFunction(f) => Transformation::AsyncSourceMemberOptions(f),
        }
    }
}

impl fmt::Debug for MemberConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberConfiguration::Value(value) => f.debug_tuple("Value").field(value).finish(),
            MemberConfiguration::Function(_) => f.write_str("Function"),
            MemberConfiguration::AsyncFunction(_) => f.write_str("AsyncFunction"),
        }
    }
}

impl From<Value> for MemberConfiguration {
    fn from(value: Value) -> Self {
        MemberConfiguration::Value(value)
    }
}

impl From<&str> for MemberConfiguration {
    fn from(value: &str) -> Self {
        MemberConfiguration::Value(Value::from(value))
    }
}

impl From<String> for MemberConfiguration {
    fn from(value: String) -> Self {
        MemberConfiguration::Value(Value::from(value))
    }
}

impl From<bool> for MemberConfiguration {
    fn from(value: bool) -> Self {
        MemberConfiguration::Value(Value::from(value))
    }
}

impl From<i32> for MemberConfiguration {
    fn from(value: i32) -> Self {
        MemberConfiguration::Value(Value::from(value))
    }
}

impl From<i64> for MemberConfiguration {
    fn from(value: i64) -> Self {
        MemberConfiguration::Value(Value::from(value))
    }
}

impl From<u64> for MemberConfiguration {
    fn from(value: u64) -> Self {
        MemberConfiguration::Value(Value::from(value))
    }
}

impl From<f64> for MemberConfiguration {
    fn from(value: f64) -> Self {
        MemberConfiguration::Value(Value::from(value))
    }
}

/// Shorthand for [`MemberConfiguration::function`]
pub fn member<F>(f: F) -> MemberConfiguration
where
    F: Fn(&mut MemberOptions) -> Option<Value> + Send + Sync + 'static,
{
    MemberConfiguration::function(f)
}

/// Shorthand for [`MemberConfiguration::async_function`]
pub fn async_member<F>(f: F) -> MemberConfiguration
where
    F: Fn(MemberOptions, Completion) + Send + Sync + 'static,
{
    MemberConfiguration::async_function(f)
}

/// What probing a member configuration function revealed
#[derive(Default)]
pub(crate) struct Probe {
    pub(crate) map_from: Option<String>,
    pub(crate) ignore: bool,
    pub(crate) condition: Option<ConditionFn>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literals_become_constants() {
        let config: MemberConfiguration = 42.into();
        assert!(!config.is_function());
        assert_eq!(
            config.into_member_transformation().kind(),
            TransformationKind::Constant
        );

        let config: MemberConfiguration = json!({"a": 1}).into();
        assert!(matches!(config, MemberConfiguration::Value(_)));
    }

    #[test]
    fn test_probe_detects_map_from_and_condition() {
        let config = member(|opts| {
            opts.condition(|source| source["enabled"] == json!(true));
            opts.map_from("other")
        });

        let probe = config.probe("target");
        assert_eq!(probe.map_from.as_deref(), Some("other"));
        assert!(probe.condition.is_some());
        assert!(!probe.ignore);
    }

    #[test]
    fn test_probe_swallows_panics() {
        let config = member(|opts| {
            opts.ignore();
            let value = opts.source_object()?.get("missing").cloned();
            Some(value.map(|v| v["x"].clone()).expect("no real source while probing"))
        });

        let probe = config.probe("target");
        assert!(probe.ignore);
    }

    #[test]
    fn test_probe_async_function() {
        let config = async_member(|mut opts, done| {
            opts.map_from("remote");
            done.complete(json!("late"));
        });

        let probe = config.probe("target");
        assert_eq!(probe.map_from.as_deref(), Some("remote"));
        assert_eq!(
            config.into_source_member_transformation().kind(),
            TransformationKind::AsyncSourceMemberOptions
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TransformationKind::AsyncMemberOptions.to_string(), "async_member_options");
        assert!(TransformationKind::AsyncSourceMemberOptions.is_async());
        assert!(!TransformationKind::MemberOptions.is_async());
    }
}
