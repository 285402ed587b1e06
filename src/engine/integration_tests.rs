// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end behaviour of whole graphs driven by a real dispatcher.

use crate::errors::StreamError;
use crate::scheduler::{Dispatcher, Timer};
use crate::value::Value;
use crate::Stream;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

fn collector() -> Rc<RefCell<Vec<Value>>> {
    Rc::new(RefCell::new(Vec::new()))
}

fn collect_into(stream: &Stream, sink: &Rc<RefCell<Vec<Value>>>) -> Stream {
    let sink = Rc::clone(sink);
    stream.each(move |v| sink.borrow_mut().push(v.clone()))
}

fn ints(values: &[Value]) -> Vec<i64> {
    values.iter().filter_map(Value::as_i64).collect()
}

#[tokio::test(start_paused = true)]
async fn test_completion_waits_for_delayed_values() {
    let dispatcher = Dispatcher::new();
    let seen = collector();
    let finished_with = Rc::new(Cell::new(None));

    let started = Instant::now();
    let delayed = Stream::range(&dispatcher, 0, 3, 1).delay(Duration::from_millis(500));
    let sink = Rc::clone(&seen);
    let slot = Rc::clone(&finished_with);
    collect_into(&delayed, &seen).on_completed(move || {
        slot.set(Some((sink.borrow().len(), started.elapsed())));
    });

    dispatcher.run().await;

    let (count, elapsed) = finished_with.get().expect("completed");
    assert_eq!(count, 3);
    assert!(elapsed >= Duration::from_millis(500));
    assert_eq!(ints(&seen.borrow()), vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_reentrant_complete_finishes_once() {
    let dispatcher = Dispatcher::new();
    let completions = Rc::new(Cell::new(0));

    let source = Stream::range(&dispatcher, 0, 100, 1);
    let handle = source.clone();
    let counter = Rc::clone(&completions);
    source
        .each(move |_| {
            handle.complete();
            handle.complete();
        })
        .on_completed(move || counter.set(counter.get() + 1));

    dispatcher.run().await;
    assert_eq!(completions.get(), 1);
    assert_eq!(dispatcher.live_roots(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_suppresses_completion() {
    let dispatcher = Dispatcher::new();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let completed = Rc::new(Cell::new(false));

    let source = Stream::range(&dispatcher, 0, 10, 1);
    let handle = source.clone();
    let sink = Rc::clone(&errors);
    let flag = Rc::clone(&completed);
    source
        .each(move |v| {
            if v.as_i64() == Some(2) {
                handle.raise_error(StreamError::new("bad value", 5, true));
            }
        })
        .on_error(move |e| sink.borrow_mut().push((e.code, e.fatal)))
        .on_completed(move || flag.set(true));

    dispatcher.run().await;
    assert_eq!(*errors.borrow(), vec![(5, true)]);
    assert!(!completed.get());
}

#[tokio::test(start_paused = true)]
async fn test_data_errors_do_not_stop_the_stream() {
    let dispatcher = Dispatcher::new();
    let codes = Rc::new(RefCell::new(Vec::new()));
    let completed = Rc::new(Cell::new(false));

    let source = Stream::range(&dispatcher, 0, 4, 1);
    let handle = source.clone();
    let sink = Rc::clone(&codes);
    let flag = Rc::clone(&completed);
    source
        .each(move |v| {
            if let Some(i) = v.as_i64().filter(|i| i % 2 == 1) {
                handle.raise_error(StreamError::new(i, 100 + i as i32, false));
            }
        })
        .on_error(move |e| sink.borrow_mut().push(e.code))
        .on_completed(move || flag.set(true));

    dispatcher.run().await;
    assert_eq!(*codes.borrow(), vec![101, 103]);
    assert!(completed.get());
}

#[tokio::test(start_paused = true)]
async fn test_merge_delivers_every_value_and_completes_once() {
    let dispatcher = Dispatcher::new();
    let seen = collector();
    let completions = Rc::new(Cell::new(0));

    let merged = Stream::merge(
        &dispatcher,
        vec![
            Stream::range(&dispatcher, 0, 3, 1),
            Stream::range(&dispatcher, 10, 12, 1),
        ],
    );
    let counter = Rc::clone(&completions);
    collect_into(&merged, &seen).on_completed(move || counter.set(counter.get() + 1));

    dispatcher.run().await;
    let mut values = ints(&seen.borrow());
    values.sort_unstable();
    assert_eq!(values, vec![0, 1, 2, 10, 11]);
    assert_eq!(completions.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_split_pairs_values_with_branch_results() {
    let dispatcher = Dispatcher::new();
    let seen = collector();

    let split = Stream::from_values(&dispatcher, [1, 2, 3])
        .split(|branch| branch.map(|v| Value::from(v.as_i64().unwrap_or(0) * 2)));
    collect_into(&split, &seen);

    dispatcher.run().await;
    let pairs: Vec<Vec<i64>> = seen
        .borrow()
        .iter()
        .map(|v| ints(v.as_list().unwrap_or_default()))
        .collect();
    assert_eq!(pairs, vec![vec![1, 2], vec![2, 4], vec![3, 6]]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_reports_one_cancellation_and_no_completion() {
    let dispatcher = Dispatcher::new();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let completed = Rc::new(Cell::new(false));
    let ticks = Rc::new(Cell::new(0));

    let repeater = Stream::repeater(&dispatcher, Duration::from_millis(10), || Value::from(1));
    let handle = repeater.clone();
    let counter = Rc::clone(&ticks);
    let sink = Rc::clone(&errors);
    let flag = Rc::clone(&completed);
    repeater
        .each(move |_| {
            counter.set(counter.get() + 1);
            if counter.get() == 3 {
                handle.cancel();
            }
        })
        .on_error(move |e| sink.borrow_mut().push(e.clone()))
        .on_completed(move || flag.set(true));

    dispatcher.run().await;
    assert_eq!(ticks.get(), 3);
    assert_eq!(errors.borrow().len(), 1);
    assert!(errors.borrow()[0].is_cancellation());
    assert!(!completed.get());
}

struct DropCounter(Rc<Cell<usize>>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_owned_resource_released_once_after_teardown() {
    let dispatcher = Dispatcher::new();
    let released = Rc::new(Cell::new(0));

    let stream = Stream::range(&dispatcher, 0, 3, 1).own(DropCounter(Rc::clone(&released)));
    dispatcher.run().await;
    assert_eq!(released.get(), 0);

    drop(stream);
    assert_eq!(released.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_owned_resource_released_once_after_cancel() {
    let dispatcher = Dispatcher::new();
    let released = Rc::new(Cell::new(0));
    let ticks = Rc::new(Cell::new(0));

    let repeater = Stream::repeater(&dispatcher, Duration::from_millis(10), || Value::from(1))
        .own(DropCounter(Rc::clone(&released)));
    let handle = repeater.clone();
    let counter = Rc::clone(&ticks);
    repeater.each(move |_| {
        counter.set(counter.get() + 1);
        if counter.get() == 2 {
            handle.cancel();
        }
    });

    dispatcher.run().await;
    assert_eq!(ticks.get(), 2);
    assert_eq!(dispatcher.live_roots(), 0);
    assert_eq!(released.get(), 0);

    drop(repeater);
    assert_eq!(released.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_drops_values_held_by_delay() {
    let dispatcher = Dispatcher::new();
    let seen = collector();
    let errors = Rc::new(RefCell::new(Vec::new()));

    let source = Stream::range(&dispatcher, 0, 5, 1);
    let sink = Rc::clone(&errors);
    source.on_error(move |e| sink.borrow_mut().push(e.fatal));
    collect_into(&source.delay(Duration::from_millis(50)), &seen);

    let handle = source.clone();
    let timer = Timer::new(&dispatcher.downgrade(), move || {
        handle.raise_error(StreamError::new("upstream failed", 9, true));
    });
    timer.start_once(Duration::from_millis(10));

    dispatcher.run().await;
    assert!(seen.borrow().is_empty());
    assert_eq!(*errors.borrow(), vec![true]);
    assert_eq!(dispatcher.live_roots(), 0);
}

#[tokio::test]
async fn test_spawned_producer_feeds_origin_thread() {
    let dispatcher = Dispatcher::new();
    let seen = collector();
    let completions = Rc::new(Cell::new(0));

    let remote = Stream::spawn_async(&dispatcher, |d| {
        Stream::range(d, 0, 4, 1).map(|v| Value::from(v.as_i64().unwrap_or(0) * 10))
    })
    .expect("worker starts");
    let counter = Rc::clone(&completions);
    collect_into(&remote, &seen).on_completed(move || counter.set(counter.get() + 1));

    dispatcher.run().await;
    assert_eq!(ints(&seen.borrow()), vec![0, 10, 20, 30]);
    assert_eq!(completions.get(), 1);
}

#[tokio::test]
async fn test_async_branch_runs_off_thread_and_drains() {
    let dispatcher = Dispatcher::new();
    let seen = collector();
    let completed = Rc::new(Cell::new(false));
    let origin = std::thread::current().id();

    let branch = Stream::range(&dispatcher, 0, 5, 1)
        .async_op(|inlet| {
            inlet.map(|v| {
                let name = std::thread::current().name().unwrap_or_default().to_string();
                Value::List(vec![v.clone(), Value::from(name)])
            })
        })
        .expect("worker starts");
    let sink = Rc::clone(&seen);
    let flag = Rc::clone(&completed);
    branch
        .each(move |v| {
            assert_eq!(std::thread::current().id(), origin);
            sink.borrow_mut().push(v.clone());
        })
        .on_completed(move || flag.set(true));

    dispatcher.run().await;
    assert!(completed.get());
    let seen = seen.borrow();
    let values: Vec<i64> = seen
        .iter()
        .filter_map(|v| v.as_list().and_then(|pair| pair[0].as_i64()))
        .collect();
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
    assert!(seen.iter().all(|v| v
        .as_list()
        .and_then(|pair| pair[1].as_str())
        .is_some_and(|name| name.starts_with("millrace"))));
}
