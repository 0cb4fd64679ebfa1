//! Operation names, lifecycle events and the request registry.
//!
//! Every asynchronous operation a feature performs has a name, for example
//! `plugins/fetchAll`. The [`RequestRegistry`] keeps exactly one
//! [`RequestInfo`] per name, so concurrent invocations of the same operation
//! share a slot and whichever lifecycle event is processed last wins.
//!
//! # State machine
//!
//! ```text
//!              pending                fulfilled
//! NotStarted ──────────► Pending ─────────────────► Fulfilled
//!                          ▲  │                         │
//!                          │  │ rejected(e)             │
//!                          │  ▼                         │
//!                          Rejected(e)                  │
//!                          ▲       pending (any state)  │
//!                          └────────────────────────────┘
//! ```
//!
//! There is no terminal state: a `pending` event from any state starts the
//! slot over and clears the previous error.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

/// Name of a class of asynchronous operation.
///
/// Distinct from a single invocation: all invocations of one operation
/// share the same name and therefore the same status slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationName(String);

impl OperationName {
    /// Create an operation name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Create `<namespace>/<operation>`
    ///
    /// ```
    /// use loadstate_core::request::OperationName;
    ///
    /// assert_eq!(OperationName::scoped("plugins", "fetchAll").as_str(), "plugins/fetchAll");
    /// ```
    #[must_use]
    pub fn scoped(namespace: &str, operation: &str) -> Self {
        Self(format!("{namespace}/{operation}"))
    }

    /// The name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for OperationName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for OperationName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OperationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for OperationName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// Phase carried by a lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// The operation started
    Pending,
    /// The operation succeeded
    Fulfilled,
    /// The operation failed
    Rejected,
}

impl Phase {
    /// All phases, in lifecycle order
    pub const ALL: [Self; 3] = [Self::Pending, Self::Fulfilled, Self::Rejected];

    /// Wire form of the phase, as used in signal type suffixes
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the wire form of a phase
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|phase| phase.as_str() == suffix)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of an operation slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// No event has been recorded for this operation yet
    #[default]
    NotStarted,
    /// The latest recorded event was `pending`
    Pending,
    /// The latest recorded event was `fulfilled`
    Fulfilled,
    /// The latest recorded event was `rejected`
    Rejected,
}

impl From<Phase> for RequestStatus {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Pending => Self::Pending,
            Phase::Fulfilled => Self::Fulfilled,
            Phase::Rejected => Self::Rejected,
        }
    }
}

/// Status record for one operation name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo<E> {
    /// Current status
    pub status: RequestStatus,
    /// Error of the last rejection; only ever set while `status` is `Rejected`
    pub error: Option<E>,
}

impl<E> RequestInfo<E> {
    /// Record for an operation that has not been started
    #[must_use]
    pub const fn not_started() -> Self {
        Self {
            status: RequestStatus::NotStarted,
            error: None,
        }
    }

    /// Record for a started operation
    #[must_use]
    pub const fn pending() -> Self {
        Self {
            status: RequestStatus::Pending,
            error: None,
        }
    }

    /// Record for a succeeded operation
    #[must_use]
    pub const fn fulfilled() -> Self {
        Self {
            status: RequestStatus::Fulfilled,
            error: None,
        }
    }

    /// Record for a failed operation
    #[must_use]
    pub const fn rejected(error: Option<E>) -> Self {
        Self {
            status: RequestStatus::Rejected,
            error,
        }
    }
}

impl<E> Default for RequestInfo<E> {
    fn default() -> Self {
        Self::not_started()
    }
}

/// Lifecycle step of one invocation of a named operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle<T, E> {
    /// The operation started
    Pending,
    /// The operation succeeded with a payload
    Fulfilled(T),
    /// The operation failed with an error
    Rejected(E),
}

impl<T, E> Lifecycle<T, E> {
    /// The phase of this step
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Pending => Phase::Pending,
            Self::Fulfilled(_) => Phase::Fulfilled,
            Self::Rejected(_) => Phase::Rejected,
        }
    }

    /// Transform the success payload
    pub fn map<U, F>(self, f: F) -> Lifecycle<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Pending => Lifecycle::Pending,
            Self::Fulfilled(value) => Lifecycle::Fulfilled(f(value)),
            Self::Rejected(error) => Lifecycle::Rejected(error),
        }
    }
}

/// A lifecycle step tagged with the operation it belongs to.
///
/// This is the in-process message that drives the registry; it carries
/// the operation name, phase and payload as fields, so nothing has to be
/// parsed out of a type string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEvent<T, E> {
    /// Operation the step belongs to
    pub operation: OperationName,
    /// The step itself
    pub lifecycle: Lifecycle<T, E>,
}

impl<T, E> RequestEvent<T, E> {
    /// Create an event
    #[must_use]
    pub const fn new(operation: OperationName, lifecycle: Lifecycle<T, E>) -> Self {
        Self { operation, lifecycle }
    }

    /// A `pending` event for `operation`
    #[must_use]
    pub const fn pending(operation: OperationName) -> Self {
        Self::new(operation, Lifecycle::Pending)
    }

    /// A `fulfilled` event for `operation`
    #[must_use]
    pub const fn fulfilled(operation: OperationName, value: T) -> Self {
        Self::new(operation, Lifecycle::Fulfilled(value))
    }

    /// A `rejected` event for `operation`
    #[must_use]
    pub const fn rejected(operation: OperationName, error: E) -> Self {
        Self::new(operation, Lifecycle::Rejected(error))
    }

    /// The phase of this event
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    /// Transform the success payload
    pub fn map<U, F>(self, f: F) -> RequestEvent<U, E>
    where
        F: FnOnce(T) -> U,
    {
        RequestEvent {
            operation: self.operation,
            lifecycle: self.lifecycle.map(f),
        }
    }
}

/// Loading/error view of one operation, as rendered by consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestView<E> {
    /// Whether the operation is currently pending
    pub pending: bool,
    /// Error of the last rejection, if the operation is currently rejected
    pub error: Option<E>,
}

/// Status slots keyed by operation name.
///
/// Names without a slot are implicitly [`RequestStatus::NotStarted`]. Slots
/// are created by the first event for a name and overwritten by every later
/// one; they are never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRegistry<E> {
    requests: HashMap<OperationName, RequestInfo<E>>,
}

impl<E> RequestRegistry<E> {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: HashMap::new(),
        }
    }

    /// Record a `pending` event: status becomes `Pending`, error is cleared
    pub fn start(&mut self, operation: OperationName) {
        self.record(operation, Phase::Pending, None);
    }

    /// Record a `fulfilled` event: status becomes `Fulfilled`, error is cleared
    pub fn fulfill(&mut self, operation: OperationName) {
        self.record(operation, Phase::Fulfilled, None);
    }

    /// Record a `rejected` event: status becomes `Rejected` with `error`
    pub fn reject(&mut self, operation: OperationName, error: E) {
        self.record(operation, Phase::Rejected, Some(error));
    }

    /// Overwrite the slot for `operation` according to `phase`.
    ///
    /// `error` is only kept for [`Phase::Rejected`]; the other phases clear it.
    pub fn record(&mut self, operation: OperationName, phase: Phase, error: Option<E>) {
        let info = match phase {
            Phase::Pending => RequestInfo::pending(),
            Phase::Fulfilled => RequestInfo::fulfilled(),
            Phase::Rejected => RequestInfo::rejected(error),
        };

        tracing::trace!(operation = %operation, status = ?info.status, "Recorded request status");
        self.requests.insert(operation, info);
    }

    /// Record a tagged lifecycle event, handing back the success payload.
    ///
    /// Returns `Some(value)` for `fulfilled` events so the caller can apply
    /// the payload to its entities; `None` otherwise.
    pub fn observe<T>(&mut self, event: RequestEvent<T, E>) -> Option<T> {
        let RequestEvent { operation, lifecycle } = event;
        match lifecycle {
            Lifecycle::Pending => {
                self.start(operation);
                None
            },
            Lifecycle::Fulfilled(value) => {
                self.fulfill(operation);
                Some(value)
            },
            Lifecycle::Rejected(error) => {
                self.reject(operation, error);
                None
            },
        }
    }

    /// Slot for `operation`, if any event was recorded for it
    #[must_use]
    pub fn info(&self, operation: &str) -> Option<&RequestInfo<E>> {
        self.requests.get(operation)
    }

    /// Current status of `operation`
    #[must_use]
    pub fn status(&self, operation: &str) -> RequestStatus {
        self.info(operation).map_or(RequestStatus::NotStarted, |info| info.status)
    }

    /// Whether `operation` is currently pending
    #[must_use]
    pub fn is_pending(&self, operation: &str) -> bool {
        self.status(operation) == RequestStatus::Pending
    }

    /// Whether no event was ever recorded for `operation`
    #[must_use]
    pub fn is_not_started(&self, operation: &str) -> bool {
        self.status(operation) == RequestStatus::NotStarted
    }

    /// Error of the last rejection of `operation`, while it is rejected
    #[must_use]
    pub fn error(&self, operation: &str) -> Option<&E> {
        self.info(operation).and_then(|info| info.error.as_ref())
    }

    /// Number of operations with a slot
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether no operation has a slot yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Iterate over all slots
    pub fn iter(&self) -> impl Iterator<Item = (&OperationName, &RequestInfo<E>)> {
        self.requests.iter()
    }
}

impl<E: Clone> RequestRegistry<E> {
    /// Loading/error view of `operation`
    #[must_use]
    pub fn view(&self, operation: &str) -> RequestView<E> {
        RequestView {
            pending: self.is_pending(operation),
            error: self.error(operation).cloned(),
        }
    }
}

impl<E> Default for RequestRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
