//! In-memory transport for tests and demos.
//!
//! [`MockTransport`] answers from canned data, counts calls per method, can
//! be told to fail a method, and can hold individual calls back until the
//! test releases them through a [`Gate`]. Gates are how tests pick the
//! order in which concurrent calls settle.

use crate::error::TransportError;
use crate::plugins::{CatalogPlugin, PluginDetails};
use crate::teams::Team;
use crate::transport::{PluginTransport, TeamTransport, TransportFuture};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// Transport method, for failures and gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// [`PluginTransport::fetch_all`]
    FetchAll,
    /// [`PluginTransport::fetch_details`]
    FetchDetails,
    /// [`PluginTransport::install`]
    Install,
    /// [`PluginTransport::uninstall`]
    Uninstall,
    /// [`TeamTransport::fetch_teams`]
    FetchTeams,
}

/// Number of calls per method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `fetch_all` calls
    pub fetch_all: usize,
    /// `fetch_details` calls
    pub fetch_details: usize,
    /// `install` calls
    pub install: usize,
    /// `uninstall` calls
    pub uninstall: usize,
    /// `fetch_teams` calls
    pub fetch_teams: usize,
}

impl CallCounts {
    fn bump(&mut self, method: Method) {
        let counter = match method {
            Method::FetchAll => &mut self.fetch_all,
            Method::FetchDetails => &mut self.fetch_details,
            Method::Install => &mut self.install,
            Method::Uninstall => &mut self.uninstall,
            Method::FetchTeams => &mut self.fetch_teams,
        };
        *counter += 1;
    }
}

type GateKey = (Method, Option<String>);
type GateReceiver = oneshot::Receiver<Result<(), TransportError>>;

/// Holds one transport call until released.
///
/// Dropping a gate without releasing it fails the held call with a
/// [`TransportError::Network`] error.
#[derive(Debug)]
pub struct Gate {
    sender: oneshot::Sender<Result<(), TransportError>>,
}

impl Gate {
    /// Let the call proceed and answer normally
    pub fn open(self) {
        let _ = self.sender.send(Ok(()));
    }

    /// Let the call proceed and fail with `error`
    pub fn fail(self, error: TransportError) {
        let _ = self.sender.send(Err(error));
    }
}

#[derive(Debug, Default)]
struct Inner {
    plugins: Vec<CatalogPlugin>,
    details: HashMap<String, PluginDetails>,
    teams: Vec<Team>,
    failures: HashMap<Method, TransportError>,
    gates: HashMap<GateKey, VecDeque<GateReceiver>>,
    calls: CallCounts,
}

/// In-memory [`PluginTransport`] and [`TeamTransport`].
///
/// Clones share their data, failures, gates and counters.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    /// Transport with no data that answers every call successfully
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugins returned by `fetch_all`
    #[must_use]
    pub fn with_plugins(self, plugins: Vec<CatalogPlugin>) -> Self {
        self.lock().plugins = plugins;
        self
    }

    /// Details returned by `fetch_details(id)`
    #[must_use]
    pub fn with_details(self, id: impl Into<String>, details: PluginDetails) -> Self {
        self.lock().details.insert(id.into(), details);
        self
    }

    /// Teams returned by `fetch_teams`
    #[must_use]
    pub fn with_teams(self, teams: Vec<Team>) -> Self {
        self.lock().teams = teams;
        self
    }

    /// Fail every later call of `method` with `error`
    pub fn fail(&self, method: Method, error: TransportError) {
        self.lock().failures.insert(method, error);
    }

    /// Stop failing `method`
    pub fn recover(&self, method: Method) {
        self.lock().failures.remove(&method);
    }

    /// Hold the next call of `method` until the returned gate is released
    #[must_use]
    pub fn gate(&self, method: Method) -> Gate {
        self.add_gate((method, None))
    }

    /// Hold the next call of `method` for `id` until the returned gate is released
    #[must_use]
    pub fn gate_for(&self, method: Method, id: impl Into<String>) -> Gate {
        self.add_gate((method, Some(id.into())))
    }

    /// Calls made so far
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    fn add_gate(&self, key: GateKey) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.lock().gates.entry(key).or_default().push_back(receiver);
        Gate { sender }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and take what it has to wait for or fail with.
    fn begin(&self, method: Method, id: Option<&str>) -> (Option<GateReceiver>, Option<TransportError>) {
        let mut inner = self.lock();
        inner.calls.bump(method);

        let specific = id.and_then(|id| {
            inner
                .gates
                .get_mut(&(method, Some(id.to_string())))
                .and_then(VecDeque::pop_front)
        });
        let gate = specific.or_else(|| inner.gates.get_mut(&(method, None)).and_then(VecDeque::pop_front));

        (gate, inner.failures.get(&method).cloned())
    }

    /// Run one call: wait for its gate, apply a configured failure, then answer.
    fn call<T, F>(&self, method: Method, id: Option<&str>, answer: F) -> TransportFuture<'_, T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, TransportError> + Send + 'static,
    {
        let (gate, failure) = self.begin(method, id);
        tracing::trace!(?method, ?id, gated = gate.is_some(), "Mock transport call");

        Box::pin(async move {
            if let Some(gate) = gate {
                gate.await
                    .map_err(|_| TransportError::Network("gate dropped".to_string()))??;
            }
            if let Some(error) = failure {
                return Err(error);
            }
            answer(&self.lock())
        })
    }
}

impl PluginTransport for MockTransport {
    fn fetch_all(&self) -> TransportFuture<'_, Vec<CatalogPlugin>> {
        self.call(Method::FetchAll, None, |inner| Ok(inner.plugins.clone()))
    }

    fn fetch_details(&self, id: String) -> TransportFuture<'_, PluginDetails> {
        self.call(Method::FetchDetails, Some(&id), {
            let id = id.clone();
            move |inner| {
                inner
                    .details
                    .get(&id)
                    .cloned()
                    .ok_or(TransportError::NotFound(id))
            }
        })
    }

    fn install(&self, id: String, _version: String) -> TransportFuture<'_, ()> {
        self.call(Method::Install, Some(&id), |_| Ok(()))
    }

    fn uninstall(&self, id: String) -> TransportFuture<'_, ()> {
        self.call(Method::Uninstall, Some(&id), |_| Ok(()))
    }
}

impl TeamTransport for MockTransport {
    fn fetch_teams(&self) -> TransportFuture<'_, Vec<Team>> {
        self.call(Method::FetchTeams, None, |inner| Ok(inner.teams.clone()))
    }
}
