// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resources a producer keeps alive for the rest of its life.
//!
//! Records are released exactly once, in the order they were added, when the
//! owning producer is dropped. A stream can take over another stream's
//! records wholesale, after which the source no longer releases them.

use std::any::type_name;
use std::cell::RefCell;

pub struct OwnedResource {
    label: &'static str,
    release: Option<Box<dyn FnOnce()>>,
}

impl OwnedResource {
    /// Own `resource`; releasing it drops it.
    pub fn new<T: 'static>(resource: T) -> Self {
        Self {
            label: type_name::<T>(),
            release: Some(Box::new(move || drop(resource))),
        }
    }

    /// Own `resource` and hand it to `release` at teardown.
    pub fn with_release<T: 'static>(resource: T, release: impl FnOnce(T) + 'static) -> Self {
        Self {
            label: type_name::<T>(),
            release: Some(Box::new(move || release(resource))),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Drop for OwnedResource {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

#[derive(Default)]
pub struct Ownership {
    records: RefCell<Vec<OwnedResource>>,
}

impl Ownership {
    pub fn push(&self, record: OwnedResource) {
        self.records.borrow_mut().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Move every record out; the caller becomes responsible for them.
    pub fn take_all(&self) -> Vec<OwnedResource> {
        std::mem::take(&mut *self.records.borrow_mut())
    }

    pub fn extend(&self, records: Vec<OwnedResource>) {
        self.records.borrow_mut().extend(records);
    }

    /// Release every record in FIFO order and return how many there were.
    pub fn release_all(&self) -> usize {
        let records = self.take_all();
        let count = records.len();
        for record in records {
            drop(record);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct Tracked {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.log.borrow_mut().push(self.name);
        }
    }

    #[test]
    fn test_release_is_fifo_and_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let ownership = Ownership::default();
        ownership.push(OwnedResource::new(Tracked {
            name: "first",
            log: Rc::clone(&log),
        }));
        let sink = Rc::clone(&log);
        ownership.push(OwnedResource::with_release(7, move |v| {
            assert_eq!(v, 7);
            sink.borrow_mut().push("second");
        }));

        assert_eq!(ownership.release_all(), 2);
        assert_eq!(ownership.release_all(), 0);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_transfer_moves_records() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let from = Ownership::default();
        let to = Ownership::default();
        from.push(OwnedResource::new(Tracked {
            name: "moved",
            log: Rc::clone(&log),
        }));

        to.extend(from.take_all());
        assert!(from.is_empty());
        assert_eq!(from.release_all(), 0);
        assert!(log.borrow().is_empty());

        assert_eq!(to.release_all(), 1);
        assert_eq!(*log.borrow(), vec!["moved"]);
    }

    #[test]
    fn test_label_names_the_type() {
        assert!(OwnedResource::new(String::new()).label().ends_with("String"));
    }
}
