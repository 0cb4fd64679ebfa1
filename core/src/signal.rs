//! String-typed lifecycle signals.
//!
//! Transports that cannot produce [`RequestEvent`]s directly emit a
//! [`Signal`] whose type string has the form
//! `<namespace>/<operation>/<phase>`. [`classify`] strips the trailing phase
//! segment; everything before it is the operation name, which may itself
//! contain `/`. Signals without a recognized phase suffix are not lifecycle
//! signals and pass through untouched, so unrelated signals can share the
//! same stream.

use crate::effect::Effect;
use crate::reducer::Reducer;
use crate::request::{Lifecycle, OperationName, Phase, RequestEvent, RequestRegistry};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::marker::PhantomData;

/// Separator between the operation name and the phase suffix
pub const SEPARATOR: char = '/';

/// A string-typed signal with an optional payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub struct Signal<P> {
    /// Compound type string, e.g. `plugins/fetchAll/fulfilled`
    #[serde(rename = "type")]
    pub kind: String,
    /// Entity data on `fulfilled`, error value on `rejected`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<P>,
}

impl<P> Signal<P> {
    /// Signal without payload
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
        }
    }

    /// Signal carrying `payload`
    #[must_use]
    pub fn with_payload(kind: impl Into<String>, payload: P) -> Self {
        Self {
            kind: kind.into(),
            payload: Some(payload),
        }
    }

    /// Build the signal for `phase` of `operation`
    #[must_use]
    pub fn for_phase(operation: &OperationName, phase: Phase, payload: Option<P>) -> Self {
        Self {
            kind: format!("{operation}{SEPARATOR}{phase}"),
            payload,
        }
    }

    /// Split this signal into operation, phase and payload.
    ///
    /// # Errors
    ///
    /// Hands the signal back unchanged if its type string does not end in a
    /// recognized phase suffix.
    pub fn classify(self) -> Result<ClassifiedSignal<P>, Self> {
        match classify(&self.kind) {
            Some((operation, phase)) => Ok(ClassifiedSignal {
                operation: OperationName::new(operation),
                phase,
                payload: self.payload,
            }),
            None => Err(self),
        }
    }
}

/// A signal recognized as a lifecycle step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedSignal<P> {
    /// Operation name: the type string without its phase segment
    pub operation: OperationName,
    /// Phase from the type string suffix
    pub phase: Phase,
    /// Payload as carried by the signal
    pub payload: Option<P>,
}

impl<P> ClassifiedSignal<P> {
    /// Convert into a tagged lifecycle event
    ///
    /// The payload moves into `Fulfilled` or `Rejected`; it is dropped for `Pending`.
    #[must_use]
    pub fn into_event(self) -> RequestEvent<Option<P>, Option<P>> {
        let lifecycle = match self.phase {
            Phase::Pending => Lifecycle::Pending,
            Phase::Fulfilled => Lifecycle::Fulfilled(self.payload),
            Phase::Rejected => Lifecycle::Rejected(self.payload),
        };
        RequestEvent::new(self.operation, lifecycle)
    }
}

/// Classify a signal type string.
///
/// Returns the operation name and phase if `kind` is a non-empty operation
/// name followed by `/pending`, `/fulfilled` or `/rejected`.
///
/// ```
/// use loadstate_core::request::Phase;
/// use loadstate_core::signal::classify;
///
/// assert_eq!(classify("plugins/fetchAll/pending"), Some(("plugins/fetchAll", Phase::Pending)));
/// assert_eq!(classify("plugins/setSearchQuery"), None);
/// ```
#[must_use]
pub fn classify(kind: &str) -> Option<(&str, Phase)> {
    let (operation, suffix) = kind.rsplit_once(SEPARATOR)?;
    let phase = Phase::from_suffix(suffix)?;
    if operation.is_empty() {
        return None;
    }
    Some((operation, phase))
}

/// Reducer that records lifecycle signals into a [`RequestRegistry`].
///
/// The payload of a `rejected` signal becomes the stored error. Payloads of
/// other phases are ignored: this reducer only tracks status. Signals that do
/// not classify, or that fall outside the configured namespace, leave the
/// registry unchanged.
#[derive(Debug, Clone)]
pub struct SignalReducer<E> {
    namespace: Option<String>,
    _error: PhantomData<fn() -> E>,
}

impl<E> SignalReducer<E> {
    /// Track every lifecycle signal
    #[must_use]
    pub const fn new() -> Self {
        Self {
            namespace: None,
            _error: PhantomData,
        }
    }

    /// Track only operations named `<namespace>/...`
    #[must_use]
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            _error: PhantomData,
        }
    }

    /// Whether `operation` falls inside the configured namespace
    #[must_use]
    pub fn tracks(&self, operation: &OperationName) -> bool {
        self.namespace.as_deref().is_none_or(|namespace| {
            operation
                .as_str()
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with(SEPARATOR))
        })
    }
}

impl<E> Default for SignalReducer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Reducer for SignalReducer<E> {
    type State = RequestRegistry<E>;
    type Action = Signal<E>;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action.classify() {
            Ok(signal) if self.tracks(&signal.operation) => {
                let error = match signal.phase {
                    Phase::Rejected => signal.payload,
                    Phase::Pending | Phase::Fulfilled => None,
                };
                state.record(signal.operation, signal.phase, error);
            },
            Ok(signal) => {
                tracing::trace!(operation = %signal.operation, "Signal outside tracked namespace");
            },
            Err(unrelated) => {
                tracing::trace!(kind = %unrelated.kind, "Ignoring non-lifecycle signal");
            },
        }
        SmallVec::new()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::request::RequestStatus;

    #[test]
    fn classifies_each_phase() {
        assert_eq!(classify("plugins/fetchAll/pending"), Some(("plugins/fetchAll", Phase::Pending)));
        assert_eq!(
            classify("plugins/fetchAll/fulfilled"),
            Some(("plugins/fetchAll", Phase::Fulfilled))
        );
        assert_eq!(classify("plugins/fetchAll/rejected"), Some(("plugins/fetchAll", Phase::Rejected)));
    }

    #[test]
    fn strips_only_the_final_segment() {
        assert_eq!(
            classify("plugins/fetchDetails/pending"),
            Some(("plugins/fetchDetails", Phase::Pending))
        );
        assert_eq!(
            classify("admin/plugins/fetchDetails/rejected"),
            Some(("admin/plugins/fetchDetails", Phase::Rejected))
        );
        assert_eq!(classify("fetchAll/pending"), Some(("fetchAll", Phase::Pending)));
    }

    #[test]
    fn rejects_non_lifecycle_kinds() {
        assert_eq!(classify("plugins/setSearchQuery"), None);
        assert_eq!(classify("pending"), None);
        assert_eq!(classify("/pending"), None);
        assert_eq!(classify("plugins/fetchAll/pending/"), None);
        assert_eq!(classify("plugins/fetchAll/pendingX"), None);
        assert_eq!(classify("plugins/fetchAll-pending"), None);
    }

    #[test]
    fn classify_signal_keeps_payload() {
        let signal = Signal::with_payload("plugins/fetchAll/fulfilled", vec!["x", "y"]);

        let classified = signal.classify().unwrap_or_else(|s| panic!("not classified: {s:?}"));

        assert_eq!(classified.operation.as_str(), "plugins/fetchAll");
        assert_eq!(classified.phase, Phase::Fulfilled);
        assert_eq!(classified.payload, Some(vec!["x", "y"]));
    }

    #[test]
    fn unclassified_signal_is_handed_back() {
        let signal: Signal<u8> = Signal::with_payload("plugins/setSearchQuery", 1);
        assert_eq!(signal.clone().classify(), Err(signal));
    }

    #[test]
    fn for_phase_builds_classifiable_kind() {
        let op = OperationName::new("plugins/fetchDetails");
        let signal: Signal<()> = Signal::for_phase(&op, Phase::Rejected, None);

        assert_eq!(signal.kind, "plugins/fetchDetails/rejected");
        assert_eq!(classify(&signal.kind), Some(("plugins/fetchDetails", Phase::Rejected)));
    }

    #[test]
    fn into_event_routes_payload_by_phase() {
        let rejected = Signal::with_payload("teams/fetchAll/rejected", "boom")
            .classify()
            .unwrap_or_else(|s| panic!("not classified: {s:?}"))
            .into_event();
        assert_eq!(rejected.lifecycle, Lifecycle::Rejected(Some("boom")));

        let pending = Signal::with_payload("teams/fetchAll/pending", "dropped")
            .classify()
            .unwrap_or_else(|s| panic!("not classified: {s:?}"))
            .into_event();
        assert_eq!(pending.lifecycle, Lifecycle::Pending);
    }

    #[test]
    fn signal_reducer_tracks_lifecycle_and_ignores_the_rest() {
        let reducer = SignalReducer::new();
        let mut registry = RequestRegistry::new();

        reducer.reduce(&mut registry, Signal::new("plugins/fetchAll/pending"), &());
        reducer.reduce(&mut registry, Signal::new("plugins/setSearchQuery"), &());
        assert!(registry.is_pending("plugins/fetchAll"));
        assert_eq!(registry.len(), 1);

        reducer.reduce(
            &mut registry,
            Signal::with_payload("plugins/fetchAll/rejected", "timeout".to_string()),
            &(),
        );
        assert_eq!(registry.status("plugins/fetchAll"), RequestStatus::Rejected);
        assert_eq!(registry.error("plugins/fetchAll"), Some(&"timeout".to_string()));

        reducer.reduce(&mut registry, Signal::new("plugins/fetchAll/pending"), &());
        reducer.reduce(
            &mut registry,
            Signal::with_payload("plugins/fetchAll/fulfilled", "ignored".to_string()),
            &(),
        );
        assert_eq!(registry.status("plugins/fetchAll"), RequestStatus::Fulfilled);
        assert_eq!(registry.error("plugins/fetchAll"), None);
    }

    #[test]
    fn namespaced_reducer_skips_foreign_operations() {
        let reducer: SignalReducer<String> = SignalReducer::with_namespace("plugins");
        let mut registry = RequestRegistry::new();

        reducer.reduce(&mut registry, Signal::new("teams/fetchAll/pending"), &());
        reducer.reduce(&mut registry, Signal::new("pluginsExtra/fetchAll/pending"), &());
        reducer.reduce(&mut registry, Signal::new("plugins/fetchAll/pending"), &());

        assert!(registry.is_not_started("teams/fetchAll"));
        assert!(registry.is_not_started("pluginsExtra/fetchAll"));
        assert!(registry.is_pending("plugins/fetchAll"));
    }

    #[test]
    fn signal_uses_type_field_on_the_wire() {
        let signal: Signal<serde_json::Value> = serde_json::from_str(
            r#"{"type":"plugins/install/rejected","payload":{"message":"forbidden"}}"#,
        )
        .unwrap_or_else(|e| panic!("invalid json: {e}"));

        assert_eq!(signal.kind, "plugins/install/rejected");
        assert_eq!(signal.payload, Some(serde_json::json!({"message": "forbidden"})));

        let bare: Signal<serde_json::Value> = serde_json::from_str(r#"{"type":"plugins/install/pending"}"#)
            .unwrap_or_else(|e| panic!("invalid json: {e}"));
        assert_eq!(bare.payload, None);
    }
}
