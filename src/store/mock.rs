//! # Mock Store
//!
//! Utilities for testing the pipeline without a running [`StoreActor`](super::StoreActor).
//!
//! [`MockStore`] answers each [`DocumentStore`] call with the next scripted
//! expectation, in order. A call with no matching expectation panics, which makes
//! "this must not reach the store" assertions trivial: script nothing.
//!
//! # Example
//! ```ignore
//! let mock = MockStore::new();
//! mock.expect_get("u1").return_ok(doc);
//! mock.expect_update_fields("u1").return_ok(());
//!
//! let repo = Repository::<UserResource, _>::new(mock.clone());
//! // ... exercise the repository or service ...
//! mock.verify(); // Ensures all expectations were met
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Document, DocumentStore, FieldWrite, QueryResult, StoreError, StoreFilter};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// A scripted response for one expected store call.
enum Expectation {
    CreateIfAbsent {
        key: String,
        response: Result<(), StoreError>,
    },
    Get {
        key: String,
        response: Result<Document, StoreError>,
    },
    UpdateFields {
        key: String,
        response: Result<(), StoreError>,
    },
    Delete {
        key: String,
        response: Result<(), StoreError>,
    },
    Query {
        response: Result<QueryResult, StoreError>,
    },
}

/// A call the mock actually received, kept for later assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceivedCall {
    CreateIfAbsent { key: String, document: Document },
    Get { key: String },
    UpdateFields { key: String, writes: Vec<FieldWrite> },
    Delete { key: String },
    Query { filters: Vec<StoreFilter> },
}

/// A [`DocumentStore`] that replays scripted responses.
#[derive(Clone, Default)]
pub struct MockStore {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    received: Arc<Mutex<Vec<ReceivedCall>>>,
}

impl MockStore {
    /// Creates a new mock store with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_create_if_absent(&self, key: impl Into<String>) -> ExpectationBuilder<()> {
        ExpectationBuilder::new(self, Slot::CreateIfAbsent(key.into()))
    }

    pub fn expect_get(&self, key: impl Into<String>) -> ExpectationBuilder<Document> {
        ExpectationBuilder::new(self, Slot::Get(key.into()))
    }

    pub fn expect_update_fields(&self, key: impl Into<String>) -> ExpectationBuilder<()> {
        ExpectationBuilder::new(self, Slot::UpdateFields(key.into()))
    }

    pub fn expect_delete(&self, key: impl Into<String>) -> ExpectationBuilder<()> {
        ExpectationBuilder::new(self, Slot::Delete(key.into()))
    }

    pub fn expect_query(&self) -> ExpectationBuilder<QueryResult> {
        ExpectationBuilder::new(self, Slot::Query)
    }

    /// Every call received so far, oldest first.
    pub fn received(&self) -> Vec<ReceivedCall> {
        self.received.lock().unwrap().clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }

    fn next(&self, call: ReceivedCall) -> Expectation {
        self.received.lock().unwrap().push(call.clone());
        let expectation = self.expectations.lock().unwrap().pop_front();
        match expectation {
            Some(expectation) => expectation,
            None => panic!("Unexpected store call: {:?}", call),
        }
    }
}

/// Which call an [`ExpectationBuilder`] is scripting.
enum Slot {
    CreateIfAbsent(String),
    Get(String),
    UpdateFields(String),
    Delete(String),
    Query,
}

/// Builder returned by the `expect_*` methods of [`MockStore`].
pub struct ExpectationBuilder<T> {
    slot: Slot,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    _response: std::marker::PhantomData<T>,
}

impl<T> ExpectationBuilder<T> {
    fn new(mock: &MockStore, slot: Slot) -> Self {
        Self {
            slot,
            expectations: mock.expectations.clone(),
            _response: std::marker::PhantomData,
        }
    }
}

macro_rules! builder_responses {
    ($ty:ty, $($slot:ident => $variant:ident),+ $(,)?) => {
        impl ExpectationBuilder<$ty> {
            /// Sets the expectation to return a successful result.
            pub fn return_ok(self, value: $ty) {
                self.push(Ok(value));
            }

            /// Sets the expectation to return an error.
            pub fn return_err(self, error: StoreError) {
                self.push(Err(error));
            }

            fn push(self, response: Result<$ty, StoreError>) {
                let expectation = match self.slot {
                    $(Slot::$slot(key) => Expectation::$variant { key, response },)+
                    #[allow(unreachable_patterns)]
                    _ => unreachable!("expectation slot does not match its response type"),
                };
                self.expectations.lock().unwrap().push_back(expectation);
            }
        }
    };
}

builder_responses!((), CreateIfAbsent => CreateIfAbsent, UpdateFields => UpdateFields, Delete => Delete);
builder_responses!(Document, Get => Get);

impl ExpectationBuilder<QueryResult> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: QueryResult) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: StoreError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<QueryResult, StoreError>) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::Query { response });
    }
}

fn check_key(expected: &str, actual: &str) {
    if expected != actual {
        panic!("Expected call for key '{}', got '{}'", expected, actual);
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn create_if_absent(
        &self,
        _collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        let call = ReceivedCall::CreateIfAbsent {
            key: key.to_string(),
            document,
        };
        match self.next(call) {
            Expectation::CreateIfAbsent { key: expected, response } => {
                check_key(&expected, key);
                response
            }
            _ => panic!("Unexpected request or expectation mismatch"),
        }
    }

    async fn get(&self, _collection: &str, key: &str) -> Result<Document, StoreError> {
        match self.next(ReceivedCall::Get { key: key.to_string() }) {
            Expectation::Get { key: expected, response } => {
                check_key(&expected, key);
                response
            }
            _ => panic!("Unexpected request or expectation mismatch"),
        }
    }

    async fn update_fields(
        &self,
        _collection: &str,
        key: &str,
        writes: Vec<FieldWrite>,
    ) -> Result<(), StoreError> {
        let call = ReceivedCall::UpdateFields {
            key: key.to_string(),
            writes,
        };
        match self.next(call) {
            Expectation::UpdateFields { key: expected, response } => {
                check_key(&expected, key);
                response
            }
            _ => panic!("Unexpected request or expectation mismatch"),
        }
    }

    async fn delete(&self, _collection: &str, key: &str) -> Result<(), StoreError> {
        match self.next(ReceivedCall::Delete { key: key.to_string() }) {
            Expectation::Delete { key: expected, response } => {
                check_key(&expected, key);
                response
            }
            _ => panic!("Unexpected request or expectation mismatch"),
        }
    }

    async fn query(
        &self,
        _collection: &str,
        filters: Vec<StoreFilter>,
    ) -> Result<QueryResult, StoreError> {
        match self.next(ReceivedCall::Query { filters }) {
            Expectation::Query { response } => response,
            _ => panic!("Unexpected request or expectation mismatch"),
        }
    }
}
