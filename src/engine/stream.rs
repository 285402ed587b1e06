// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The public handle for building and driving stream graphs.
//!
//! A [`Stream`] points at one node. Constructors create a root producer on a
//! [`Dispatcher`]; chaining methods attach an operator below the node and
//! return a handle to it. Nothing runs until the dispatcher is driven.
//!
//! ```no_run
//! use the_millrace::{Dispatcher, Stream, Value};
//!
//! # async fn demo() {
//! let dispatcher = Dispatcher::new();
//! Stream::range(&dispatcher, 0, 10, 1)
//!     .filter(|v| v.as_i64().is_some_and(|i| i % 2 == 0))
//!     .scan(0i64, |acc, v| *acc += v.as_i64().unwrap_or_default())
//!     .on_completed_last(|total| println!("sum of evens: {:?}", total));
//! dispatcher.run().await;
//! # }
//! ```

use crate::bridge::{self, AsyncProducer};
use crate::engine::ownership::OwnedResource;
use crate::engine::drain;
use crate::errors::{BridgeError, StreamError};
use crate::observability::messages::engine::DetachedNode;
use crate::observability::messages::StructuredLog;
use crate::operators::{self, Buffer, Delay, Iterate, Scan, Split, WaitOp, Waiter};
use crate::scheduler::Dispatcher;
use crate::sources::{
    Container, ContainerLogic, FuncLogic, IteratorLogic, Merge, PullSource, Queue, QueueLogic,
    RangeLogic, RepeaterLogic, SingleLogic,
};
use crate::traits::{NodeId, Producer, Request, StreamNode};
use crate::value::Value;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone)]
pub struct Stream {
    node: Rc<dyn StreamNode>,
}

impl Stream {
    pub(crate) fn from_node(node: Rc<dyn StreamNode>) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &Rc<dyn StreamNode> {
        &self.node
    }

    pub fn id(&self) -> NodeId {
        self.node.core().id()
    }

    pub fn kind(&self) -> &'static str {
        self.node.core().kind()
    }

    /// The nearest producer at or above this stream's node.
    pub fn producer(&self) -> Option<Rc<dyn Producer>> {
        self.node.producer()
    }

    pub fn root(&self) -> Option<Rc<dyn Producer>> {
        self.node.root()
    }

    fn chain(&self, node: Rc<dyn StreamNode>) -> Self {
        Self::from_node(node)
    }

    fn producer_or_log(&self, operation: &'static str) -> Option<Rc<dyn Producer>> {
        let producer = self.producer();
        if producer.is_none() {
            DetachedNode {
                node_id: self.id().get(),
                kind: self.kind(),
                operation,
            }
            .log();
        }
        producer
    }

    // -- construction ------------------------------------------------------

    /// Integers from `begin` towards `end` (exclusive) by `step`.
    pub fn range(dispatcher: &Dispatcher, begin: i64, end: i64, step: i64) -> Self {
        Self::from_node(PullSource::spawn(dispatcher, RangeLogic::new(begin, end, step)))
    }

    pub fn from_values<V: Into<Value>>(
        dispatcher: &Dispatcher,
        items: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::container(dispatcher, items).0
    }

    /// Like [`Stream::from_values`], with a handle for appending later.
    pub fn container<V: Into<Value>>(
        dispatcher: &Dispatcher,
        items: impl IntoIterator<Item = V>,
    ) -> (Self, Container) {
        let logic = ContainerLogic::new(items.into_iter().map(Into::<Value>::into));
        let source = PullSource::spawn(dispatcher, logic);
        let handle = Container::new(Rc::downgrade(&source));
        (Self::from_node(source), handle)
    }

    /// The elements of a list, the `[key, value]` pairs of a map, or a
    /// scalar on its own.
    pub fn from_value(dispatcher: &Dispatcher, value: Value) -> Self {
        let items = match value {
            Value::List(_) | Value::Map(_) => value.into_elements(),
            scalar => vec![scalar],
        };
        Self::from_values(dispatcher, items)
    }

    pub fn single(dispatcher: &Dispatcher, value: Option<Value>) -> Self {
        Self::from_node(PullSource::spawn(dispatcher, SingleLogic::new(value)))
    }

    /// Emits what `generator` returns, once per request; `None` completes.
    pub fn from_fn(
        dispatcher: &Dispatcher,
        generator: impl FnMut() -> Option<Value> + 'static,
    ) -> Self {
        Self::from_node(PullSource::spawn(dispatcher, FuncLogic::new(generator)))
    }

    pub fn from_iter<I>(dispatcher: &Dispatcher, iter: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value> + 'static,
        I::IntoIter: 'static,
    {
        let iter = Box::new(iter.into_iter().map(Into::<Value>::into));
        Self::from_node(PullSource::spawn(dispatcher, IteratorLogic::new(iter, None)))
    }

    /// Pull from a `has_next`/`next` pair; `on_end` runs when the source is
    /// dropped.
    pub fn from_fns(
        dispatcher: &Dispatcher,
        has_next: impl FnMut() -> bool + 'static,
        next: impl FnMut() -> Value + 'static,
        on_end: impl FnOnce() + 'static,
    ) -> Self {
        let logic = IteratorLogic::from_fns(has_next, next, Some(Box::new(on_end)));
        Self::from_node(PullSource::spawn(dispatcher, logic))
    }

    pub fn queue(dispatcher: &Dispatcher) -> (Self, Queue) {
        let source = PullSource::spawn(dispatcher, QueueLogic::default());
        let handle = Queue::new(Rc::downgrade(&source));
        (Self::from_node(source), handle)
    }

    /// Emit `generator()` every `interval` until completed or cancelled.
    pub fn repeater(
        dispatcher: &Dispatcher,
        interval: Duration,
        generator: impl FnMut() -> Value + 'static,
    ) -> Self {
        let logic = RepeaterLogic::new(generator);
        Self::from_node(PullSource::spawn_with(
            dispatcher,
            logic,
            Request::Every(interval),
        ))
    }

    pub fn merge(dispatcher: &Dispatcher, streams: Vec<Stream>) -> Self {
        let sources = streams.into_iter().map(|s| s.node).collect();
        Self::from_node(Merge::spawn(dispatcher, sources))
    }

    /// Build a stream on a dedicated worker thread and consume it here.
    pub fn spawn_async<F>(dispatcher: &Dispatcher, factory: F) -> Result<Self, BridgeError>
    where
        F: FnOnce(&Dispatcher) -> Stream + Send + 'static,
    {
        let proxy = AsyncProducer::spawn(dispatcher, factory)?;
        Ok(Self::from_node(proxy))
    }

    // -- chaining ----------------------------------------------------------

    pub fn map(&self, f: impl FnMut(&Value) -> Value + 'static) -> Self {
        self.chain(operators::simple::map(&self.node, f))
    }

    pub fn filter(&self, predicate: impl FnMut(&Value) -> bool + 'static) -> Self {
        self.chain(operators::simple::filter(&self.node, predicate))
    }

    pub fn each(&self, f: impl FnMut(&Value) + 'static) -> Self {
        self.chain(operators::simple::each(&self.node, f))
    }

    /// Complete the producer on the first value matching `predicate`. That
    /// value is not forwarded.
    pub fn complete_when(&self, predicate: impl FnMut(&Value) -> bool + 'static) -> Self {
        self.chain(operators::simple::complete_when(&self.node, predicate))
    }

    /// Complete the producer on any value.
    pub fn complete_each(&self) -> Self {
        self.complete_when(|_| true)
    }

    pub fn with_index(&self, f: impl FnMut(usize, &Value) -> Value + 'static) -> Self {
        self.chain(operators::info::with_index(&self.node, f))
    }

    pub fn with_handle(&self, f: impl FnMut(&Value, &Stream) -> Value + 'static) -> Self {
        self.chain(operators::info::with_handle(&self.node, f))
    }

    /// Fold every value into `initial`; the result is emitted once, when the
    /// producer finishes.
    pub fn scan<S>(&self, initial: S, step: impl FnMut(&mut S, &Value) + 'static) -> Self
    where
        S: Clone + Into<Value> + 'static,
    {
        self.chain(Scan::attach(&self.node, initial, step))
    }

    pub fn delay(&self, interval: Duration) -> Self {
        self.chain(Delay::attach(&self.node, interval))
    }

    pub fn buffer(&self, capacity: usize) -> Self {
        self.chain(Buffer::attach(&self.node, capacity))
    }

    /// Buffer with the configured default capacity.
    pub fn buffer_default(&self) -> Self {
        let capacity = self
            .node
            .core()
            .dispatcher()
            .upgrade()
            .map(|d| d.config().operators.buffer_capacity)
            .unwrap_or(1);
        self.buffer(capacity)
    }

    /// Pair every value with the output of the branch `build` attaches to
    /// this stream. Returning the stream unchanged pairs with `None`.
    pub fn split(&self, build: impl FnOnce(Stream) -> Stream) -> Self {
        self.chain(Split::attach(&self.node, build))
    }

    /// Hold completion until the returned [`Waiter`] is released or dropped.
    pub fn wait_event(&self) -> (Self, Waiter) {
        let (node, waiter) = WaitOp::attach(&self.node);
        (self.chain(node), waiter)
    }

    /// Hold completion until `event` resolves.
    pub fn wait_for(&self, event: impl Future<Output = ()> + 'static) -> Self {
        self.chain(WaitOp::attach_future(&self.node, event))
    }

    pub fn iterate(&self) -> Self {
        self.chain(Iterate::attach(&self.node, None))
    }

    /// Expand `f(value)` instead of the value itself.
    pub fn iterate_with(&self, f: impl FnMut(&Value) -> Value + 'static) -> Self {
        self.chain(Iterate::attach(&self.node, Some(Box::new(f))))
    }

    /// Build a nested stream per value; the producer pauses until it
    /// completes.
    pub fn wait_complete(&self, build: impl FnMut(&Value) -> Stream + 'static) -> Self {
        self.chain(operators::spawn::wait_complete(&self.node, build))
    }

    /// Run the branch `build` attaches on a worker thread. Its output is
    /// emitted from the returned stream on this thread.
    pub fn async_op<F>(&self, build: F) -> Result<Self, BridgeError>
    where
        F: FnOnce(Stream) -> Stream + Send + 'static,
    {
        let node = bridge::AsyncWatcher::attach(&self.node, build)?;
        Ok(self.chain(node))
    }

    // -- control -----------------------------------------------------------

    /// Request with the integer encoding: `-1` one value now, `-2` defer,
    /// anything else an interval in milliseconds.
    pub fn request(&self, ms: i64) {
        self.request_with(Request::from_millis(ms));
    }

    pub fn request_with(&self, request: Request) {
        if let Some(producer) = self.producer_or_log("request") {
            producer.request(request);
        }
    }

    pub fn defer(&self) {
        if let Some(producer) = self.producer_or_log("defer") {
            producer.defer();
        }
    }

    /// Graceful: the producer completes once everything below it drained.
    pub fn complete(&self) {
        if let Some(producer) = self.producer_or_log("complete") {
            producer.complete();
        }
    }

    /// Imperative: tear the whole tree down now and report the cancellation
    /// error to its handlers. Completion callbacks never run.
    pub fn cancel(&self) {
        drain::do_cancel(&*self.node);
    }

    pub fn raise_error(&self, error: StreamError) {
        drain::raise(&*self.node, error);
    }

    // -- termination -------------------------------------------------------

    pub fn on_completed(&self, f: impl FnOnce() + 'static) -> Self {
        if let Some(producer) = self.producer_or_log("on_completed") {
            producer.producer_core().push_completion(Box::new(f));
        }
        self.clone()
    }

    /// Like [`Stream::on_completed`], with the last value seen here.
    pub fn on_completed_last(&self, f: impl FnOnce(Option<Value>) + 'static) -> Self {
        let slot = Rc::new(RefCell::new(None));
        let last = self.chain(operators::simple::last_value(&self.node, Rc::clone(&slot)));
        last.on_completed(move || f(slot.borrow_mut().take()))
    }

    /// Replace the error handler of this stream's producer.
    pub fn on_error(&self, f: impl Fn(&StreamError) + 'static) -> Self {
        if let Some(producer) = self.producer_or_log("on_error") {
            producer.producer_core().set_error_handler(Rc::new(f));
        }
        self.clone()
    }

    // -- resources ---------------------------------------------------------

    /// Keep `resource` alive until the producer is dropped.
    pub fn own<T: 'static>(&self, resource: T) -> Self {
        self.own_record(OwnedResource::new(resource))
    }

    /// Keep `resource` alive and hand it to `release` when the producer is
    /// dropped.
    pub fn own_with<T: 'static>(&self, resource: T, release: impl FnOnce(T) + 'static) -> Self {
        self.own_record(OwnedResource::with_release(resource, release))
    }

    fn own_record(&self, record: OwnedResource) -> Self {
        match self.producer_or_log("own") {
            Some(producer) => producer.producer_core().own(record),
            None => drop(record),
        }
        self.clone()
    }

    /// Move every resource `other`'s producer owns over to this producer.
    pub fn take(&self, other: &Stream) -> Self {
        let (Some(to), Some(from)) = (self.producer_or_log("take"), other.producer_or_log("take"))
        else {
            return self.clone();
        };
        if to.core().id() != from.core().id() {
            to.producer_core().extend_owned(from.producer_core().take_owned());
        }
        self.clone()
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .finish()
    }
}
