// src/pipeline/handlers.rs

//! Extension points: per-component handlers and whole-document transforms.
//!
//! Both kinds of extension may answer immediately, later, or as a sequence
//! of partial documents. [`HandlerOutput`] captures all three and
//! [`HandlerOutput::resolve`] turns any of them into a single merged
//! partial, so the merge step never sees the difference.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::{PageUri, PartialDoc};

use super::transforms::TransformContext;

/// What a handler or custom transform produced.
pub enum HandlerOutput {
    /// A finished result; `None` contributes nothing.
    Ready(Option<PartialDoc>),
    /// A result that is still being computed.
    Deferred(BoxFuture<'static, Result<Option<PartialDoc>>>),
    /// Several partials, merged in arrival order.
    Sequence(BoxStream<'static, Result<PartialDoc>>),
}

impl HandlerOutput {
    /// Contribute no fields.
    pub fn none() -> Self {
        Self::Ready(None)
    }

    pub fn value(partial: PartialDoc) -> Self {
        Self::Ready(Some(partial))
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Option<PartialDoc>>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }

    pub fn sequence<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<PartialDoc>> + Send + 'static,
    {
        Self::Sequence(stream.boxed())
    }

    /// Wait for the output and collapse it into one partial document.
    ///
    /// An empty sequence resolves to `None`; the first error in a
    /// sequence aborts it.
    pub async fn resolve(self) -> Result<Option<PartialDoc>> {
        match self {
            Self::Ready(partial) => Ok(partial),
            Self::Deferred(future) => future.await,
            Self::Sequence(stream) => {
                stream
                    .try_fold(None, |acc: Option<PartialDoc>, partial| async move {
                        let mut merged = acc.unwrap_or_default();
                        merged.merge(partial);
                        Ok(Some(merged))
                    })
                    .await
            }
        }
    }
}

impl fmt::Debug for HandlerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(partial) => f.debug_tuple("Ready").field(partial).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::Sequence(_) => f.write_str("Sequence(..)"),
        }
    }
}

impl From<PartialDoc> for HandlerOutput {
    fn from(partial: PartialDoc) -> Self {
        Self::value(partial)
    }
}

impl From<Option<PartialDoc>> for HandlerOutput {
    fn from(partial: Option<PartialDoc>) -> Self {
        Self::Ready(partial)
    }
}

/// Turns one embedded component into document fields.
pub trait ComponentHandler: Send + Sync {
    /// `reference` is the component's `_ref`; `data` is the component
    /// object without it.
    fn handle(&self, reference: &str, data: Map<String, Value>, ctx: &TransformContext) -> HandlerOutput;
}

impl<F> ComponentHandler for F
where
    F: Fn(&str, Map<String, Value>, &TransformContext) -> HandlerOutput + Send + Sync,
{
    fn handle(&self, reference: &str, data: Map<String, Value>, ctx: &TransformContext) -> HandlerOutput {
        self(reference, data, ctx)
    }
}

/// Derives fields from the document assembled so far.
pub trait CustomTransform: Send + Sync {
    /// `doc` is a private copy; changing it has no effect on the page.
    fn transform(&self, uri: &PageUri, doc: PartialDoc, ctx: &TransformContext) -> HandlerOutput;
}

impl<F> CustomTransform for F
where
    F: Fn(&PageUri, PartialDoc, &TransformContext) -> HandlerOutput + Send + Sync,
{
    fn transform(&self, uri: &PageUri, doc: PartialDoc, ctx: &TransformContext) -> HandlerOutput {
        self(uri, doc, ctx)
    }
}

/// Component handlers keyed by component name.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ComponentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for components named `name`, replacing any
    /// earlier registration.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        H: ComponentHandler + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Register a closure; spelled out so closure arguments infer.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&str, Map<String, Value>, &TransformContext) -> HandlerOutput + Send + Sync + 'static,
    {
        self.register(name, handler)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ComponentHandler>> {
        self.handlers.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Custom transforms, applied in registration order.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: IndexMap<String, Arc<dyn CustomTransform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `transform` under `name`. Re-registering a name replaces
    /// the transform but keeps its original position.
    pub fn register<T>(&mut self, name: impl Into<String>, transform: T) -> &mut Self
    where
        T: CustomTransform + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
        self
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, transform: F) -> &mut Self
    where
        F: Fn(&PageUri, PartialDoc, &TransformContext) -> HandlerOutput + Send + Sync + 'static,
    {
        self.register(name, transform)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn CustomTransform>)> {
        self.transforms.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.transforms.keys()).finish()
    }
}
