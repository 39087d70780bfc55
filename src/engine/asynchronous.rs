//! Asynchronous engine
//!
//! Work is dispatched eagerly and finished through callbacks. Every item and
//! every array keeps a pending counter behind a mutex; the counter starts at
//! one for the dispatch loop itself, so completions that fire while dispatch
//! is still running cannot finish the aggregate early. Whoever brings the
//! counter to zero delivers the result, outside the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::trace;

use super::{EngineContext, auto_members, write_member, write_segments};
use crate::error::{MappingError, MappingResult};
use crate::mapping::{ForAllMembersFn, Mapping, TypeConverterFunction};
use crate::options::{Completion, MemberOptions, StepResult};
use crate::path;
use crate::transformation::Transformation;

/// Receiver of a finished asynchronous mapping
pub(crate) type Callback = Box<dyn FnOnce(MappingResult<Value>) + Send>;

type StepDone = Box<dyn FnOnce(StepResult) + Send>;

/// Map `source` through `mapping`, delivering the result to `callback`
/// exactly once
pub(crate) fn map_value(
    context: &EngineContext<'_>,
    mapping: &Mapping,
    source: Value,
    depth: usize,
    callback: Callback,
) {
    if source.is_null() {
        callback(Ok(Value::Null));
        return;
    }

    if let Some(converter) = mapping.type_converter_function() {
        let resolution = mapping.resolution_context(source);
        match converter {
            TypeConverterFunction::Sync(convert) => callback(Ok(convert(&resolution))),
            TypeConverterFunction::Async(convert) => {
                let key = mapping.key().to_string();
                convert(
                    resolution,
                    Completion::new(move |result| {
                        callback(match result {
                            Ok(value) => Ok(value.unwrap_or(Value::Null)),
                            Err(reason) => Err(MappingError::Transformation {
                                property: key,
                                reason,
                            }),
                        })
                    }),
                );
            }
        }
        return;
    }

    match source {
        Value::Array(items) => map_array(context, mapping, items, depth, callback),
        item => map_item(context, mapping, item, depth, callback),
    }
}

struct Aggregate<T> {
    value: T,
    pending: usize,
    callback: Option<Callback>,
}

type Shared<T> = Arc<Mutex<Aggregate<T>>>;

fn lock<T>(shared: &Shared<T>) -> MutexGuard<'_, Aggregate<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn shared<T>(value: T, callback: Callback) -> Shared<T> {
    Arc::new(Mutex::new(Aggregate {
        value,
        pending: 1,
        callback: Some(callback),
    }))
}

/// Count one unit of work as done; returns the callback and value when it
/// was the last one
fn settle<T: Default>(aggregate: &mut Aggregate<T>) -> Option<(Callback, T)> {
    aggregate.pending = aggregate.pending.saturating_sub(1);
    if aggregate.pending > 0 {
        return None;
    }
    let callback = aggregate.callback.take()?;
    Some((callback, std::mem::take(&mut aggregate.value)))
}

fn fail<T>(shared: &Shared<T>, error: MappingError) {
    let callback = lock(shared).callback.take();
    if let Some(callback) = callback {
        callback(Err(error));
    }
}

fn release<T, F>(shared: &Shared<T>, wrap: F)
where
    T: Default,
    F: FnOnce(T) -> Value,
{
    let finished = settle(&mut lock(shared));
    if let Some((callback, value)) = finished {
        callback(Ok(wrap(value)));
    }
}

fn map_array(
    context: &EngineContext<'_>,
    mapping: &Mapping,
    items: Vec<Value>,
    depth: usize,
    callback: Callback,
) {
    let aggregate = shared(vec![Value::Null; items.len()], callback);

    for (index, item) in items.into_iter().enumerate() {
        if item.is_null() {
            continue;
        }
        lock(&aggregate).pending += 1;

        let element = aggregate.clone();
        map_value(
            context,
            mapping,
            item,
            depth,
            Box::new(move |result| match result {
                Ok(value) => {
                    let finished = {
                        let mut state = lock(&element);
                        if let Some(slot) = state.value.get_mut(index) {
                            *slot = value;
                        }
                        settle(&mut state)
                    };
                    if let Some((callback, items)) = finished {
                        callback(Ok(Value::Array(items)));
                    }
                }
                Err(error) => fail(&element, error),
            }),
        );
    }

    release(&aggregate, Value::Array);
}

fn map_item(
    context: &EngineContext<'_>,
    mapping: &Mapping,
    source: Value,
    depth: usize,
    callback: Callback,
) {
    let mut destination = mapping.instantiate_destination();
    let hooks: Arc<[ForAllMembersFn]> = mapping.for_all_member_mappings().into();

    for member in auto_members(mapping, &source, &destination) {
        let value = match context.nested_class(mapping, member.source_name, member.value) {
            Some(class) => match context.map_nested(class, member.value, depth) {
                Ok(value) => value,
                Err(error) => {
                    callback(Err(error));
                    return;
                }
            },
            None => member.value.clone(),
        };
        write_segments(&hooks, &mut destination, &[member.destination_name.as_str()], value);
    }

    let aggregate = shared(destination, callback);
    let source = Arc::new(source);
    let properties = mapping.properties();

    for entry in properties.entries() {
        let property = properties.destination(entry.destination);
        if property.is_ignored() || !property.condition_holds(&source) {
            continue;
        }
        lock(&aggregate).pending += 1;

        let source_path = property.full_source_path().to_string();
        let destination_path = property.full_destination_path().to_string();
        let chain = Arc::new(Chain {
            steps: property.transformations().to_vec(),
            has_source: path::has_containing_object(&source, &source_path),
            source: source.clone(),
            source_path,
        });
        let initial = path::value_at_path(&chain.source, &chain.source_path).cloned();

        let item = aggregate.clone();
        let hooks = hooks.clone();
        advance(
            chain,
            0,
            initial,
            Box::new(move |result| match result {
                Ok(value) => {
                    let finished = {
                        let mut state = lock(&item);
                        if let Some(value) = value {
                            trace!(destination = %destination_path, "Resolved member");
                            write_member(&hooks, &mut state.value, &destination_path, value);
                        }
                        settle(&mut state)
                    };
                    if let Some((callback, destination)) = finished {
                        callback(Ok(destination));
                    }
                }
                Err(reason) => fail(
                    &item,
                    MappingError::Transformation {
                        property: destination_path,
                        reason,
                    },
                ),
            }),
        );
    }

    release(&aggregate, |destination| destination);
}

/// Transformation chain of one property, detached from the mapping
struct Chain {
    steps: Vec<Transformation>,
    source: Arc<Value>,
    source_path: String,
    has_source: bool,
}

/// Run the chain from step `index`. Synchronous steps run inline; an
/// asynchronous step hands the rest of the chain to its completion.
fn advance(chain: Arc<Chain>, mut index: usize, mut intermediate: Option<Value>, done: StepDone) {
    while let Some(step) = chain.steps.get(index) {
        match step {
            Transformation::Constant(value) => intermediate = Some(value.clone()),
            Transformation::MemberOptions(function)
            | Transformation::SourceMemberOptions(function) => {
                let mut options = MemberOptions::live(
                    Some(chain.source.clone()),
                    chain.source_path.as_str(),
                    intermediate.take(),
                );
                match function(&mut options) {
                    Some(value) => intermediate = Some(value),
                    None if !chain.has_source => {
                        done(Ok(None));
                        return;
                    }
                    None => intermediate = options.into_intermediate(),
                }
            }
            Transformation::AsyncMemberOptions(function)
            | Transformation::AsyncSourceMemberOptions(function) => {
                let options = MemberOptions::live(
                    Some(chain.source.clone()),
                    chain.source_path.as_str(),
                    intermediate.clone(),
                );
                let next = chain.clone();
                let completion = Completion::new(move |result| match result {
                    Ok(Some(value)) => advance(next, index + 1, Some(value), done),
                    Ok(None) if !next.has_source => done(Ok(None)),
                    Ok(None) => advance(next, index + 1, intermediate, done),
                    Err(reason) => done(Err(reason)),
                });
                function(options, completion);
                return;
            }
        }
        index += 1;
    }

    done(Ok(intermediate));
}
