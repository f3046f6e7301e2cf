use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tokio::sync::Notify;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

use crate::config::{BridgeConfig, ResponseOrdering};
use crate::protocol::{ElementFingerprint, StyleSyncResult};
use crate::service::{StyleService, SyncError};
use crate::store::{DerivedRecompute, StyleStore};

/// What became of one click's style sync.
#[derive(Debug)]
pub enum SyncOutcome {
    Applied,
    /// A later click was issued before this response arrived.
    Superseded { latest: u64 },
    /// The bridge was released or retargeted before the response arrived.
    Detached,
    Failed(SyncError),
}

/// Receives inspection failures that should reach the user.
pub trait FailureNotifier {
    fn inspection_failed(&self, seq: u64, fingerprint: &ElementFingerprint, error: &SyncError);
}

/// Reports failures through the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl FailureNotifier for LogNotifier {
    fn inspection_failed(&self, seq: u64, fingerprint: &ElementFingerprint, error: &SyncError) {
        warn!(
            target = "bridge",
            seq,
            node = %fingerprint.node_name,
            id = %fingerprint.id,
            error = %error,
            "style inspection failed for click"
        );
    }
}

pub struct PublisherOptions {
    pub ordering: ResponseOrdering,
    pub forward_reserved_rules: bool,
    pub notifier: Rc<dyn FailureNotifier>,
}

impl Default for PublisherOptions {
    fn default() -> Self {
        Self {
            ordering: ResponseOrdering::default(),
            forward_reserved_rules: false,
            notifier: Rc::new(LogNotifier),
        }
    }
}

impl PublisherOptions {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            ordering: config.ordering,
            forward_reserved_rules: config.forward_reserved_rules,
            ..Self::default()
        }
    }

    pub fn with_notifier(mut self, notifier: Rc<dyn FailureNotifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

struct PublisherState {
    service: Rc<dyn StyleService>,
    store: Rc<dyn StyleStore>,
    options: PublisherOptions,
    latest_seq: Cell<u64>,
    epoch: Cell<u64>,
    live: Cell<bool>,
    in_flight: RefCell<HashMap<u64, AbortHandle>>,
    settled: Notify,
}

/// Exchanges fingerprints for style rules and fans the result out to the
/// store. Must be used from within a [`tokio::task::LocalSet`].
#[derive(Clone)]
pub struct SyncPublisher {
    state: Rc<PublisherState>,
}

impl SyncPublisher {
    pub fn new(
        service: Rc<dyn StyleService>,
        store: Rc<dyn StyleStore>,
        options: PublisherOptions,
    ) -> Self {
        Self {
            state: Rc::new(PublisherState {
                service,
                store,
                options,
                latest_seq: Cell::new(0),
                epoch: Cell::new(0),
                live: Cell::new(true),
                in_flight: RefCell::new(HashMap::new()),
                settled: Notify::new(),
            }),
        }
    }

    pub fn is_live(&self) -> bool {
        self.state.live.get()
    }

    /// Sequence number of the most recent click, 0 before the first one.
    pub fn latest_sequence(&self) -> u64 {
        self.state.latest_seq.get()
    }

    pub fn in_flight(&self) -> usize {
        self.state.in_flight.borrow().len()
    }

    /// Issue one style request for `fingerprint` and apply the response on
    /// the current thread when it arrives.
    pub fn publish(&self, fingerprint: ElementFingerprint) -> JoinHandle<SyncOutcome> {
        let state = Rc::clone(&self.state);
        if !state.live.get() {
            return tokio::task::spawn_local(async { SyncOutcome::Detached });
        }

        let seq = state.latest_seq.get() + 1;
        state.latest_seq.set(seq);
        let epoch = state.epoch.get();
        debug!(target = "bridge", seq, node = %fingerprint.node_name, "requesting styles");

        let request = state.service.resolve(fingerprint.clone());
        let task_state = Rc::clone(&state);
        let handle = tokio::task::spawn_local(async move {
            let result = request.await;
            let outcome = task_state.settle(seq, epoch, &fingerprint, result);
            task_state.in_flight.borrow_mut().remove(&seq);
            task_state.settled.notify_waiters();
            outcome
        });

        state.in_flight.borrow_mut().insert(seq, handle.abort_handle());
        handle
    }

    /// Wait until no request is in flight.
    pub async fn idle(&self) {
        loop {
            let notified = self.state.settled.notified();
            if self.state.in_flight.borrow().is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Drop every in-flight request. Responses issued before this call are
    /// never applied.
    pub fn detach(&self) {
        self.state.epoch.set(self.state.epoch.get() + 1);
        let aborted: Vec<_> = self.state.in_flight.borrow_mut().drain().collect();
        for (seq, handle) in &aborted {
            debug!(target = "bridge", seq, "aborting style request");
            handle.abort();
        }
        self.state.settled.notify_waiters();
    }

    /// Detach and refuse further clicks.
    pub fn shutdown(&self) {
        self.state.live.set(false);
        self.detach();
    }
}

impl PublisherState {
    fn settle(
        &self,
        seq: u64,
        epoch: u64,
        fingerprint: &ElementFingerprint,
        result: Result<StyleSyncResult, SyncError>,
    ) -> SyncOutcome {
        if !self.live.get() || self.epoch.get() != epoch {
            debug!(target = "bridge", seq, "dropping response for detached bridge");
            return SyncOutcome::Detached;
        }

        let latest = self.latest_seq.get();
        if self.options.ordering == ResponseOrdering::LatestClick && seq != latest {
            debug!(target = "bridge", seq, latest, "dropping superseded response");
            return SyncOutcome::Superseded { latest };
        }

        match result {
            Ok(result) => {
                self.apply(result);
                SyncOutcome::Applied
            }
            Err(err) => {
                self.options
                    .notifier
                    .inspection_failed(seq, fingerprint, &err);
                SyncOutcome::Failed(err)
            }
        }
    }

    fn apply(&self, result: StyleSyncResult) {
        let store = self.store.as_ref();
        for mutation in result.into_mutations(self.options.forward_reserved_rules) {
            store.dispatch(mutation);
        }
        DerivedRecompute::apply(store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MutationLog;
    use futures_util::future::LocalBoxFuture;
    use futures_util::FutureExt;
    use serde_json::json;
    use tokio::sync::oneshot;
    use tokio::task::LocalSet;

    /// Service whose responses are released by the test, one per request.
    #[derive(Default)]
    struct GatedService {
        pending: RefCell<Vec<oneshot::Sender<Result<StyleSyncResult, SyncError>>>>,
        requests: RefCell<Vec<ElementFingerprint>>,
    }

    impl GatedService {
        fn release(&self, index: usize, result: Result<StyleSyncResult, SyncError>) {
            let mut pending = self.pending.borrow_mut();
            let (tx, _) = oneshot::channel();
            let sender = std::mem::replace(&mut pending[index], tx);
            let _ = sender.send(result);
        }
    }

    impl StyleService for GatedService {
        fn resolve(
            &self,
            fingerprint: ElementFingerprint,
        ) -> LocalBoxFuture<'static, Result<StyleSyncResult, SyncError>> {
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().push(tx);
            self.requests.borrow_mut().push(fingerprint);
            async move { rx.await.unwrap_or(Err(SyncError::Status { status: 499 })) }.boxed_local()
        }
    }

    fn fingerprint(id: &str) -> ElementFingerprint {
        ElementFingerprint {
            id: id.to_string(),
            node_name: "DIV".into(),
            class_name: String::new(),
            use_proxy: false,
        }
    }

    fn inline(value: i64) -> StyleSyncResult {
        StyleSyncResult {
            inline_rules: Some(json!(value)),
            ..Default::default()
        }
    }

    fn setup(ordering: ResponseOrdering) -> (Rc<GatedService>, Rc<MutationLog>, SyncPublisher) {
        let service = Rc::new(GatedService::default());
        let store = Rc::new(MutationLog::new());
        let publisher = SyncPublisher::new(
            service.clone(),
            store.clone(),
            PublisherOptions {
                ordering,
                ..PublisherOptions::default()
            },
        );
        (service, store, publisher)
    }

    #[tokio::test]
    async fn latest_click_wins_regardless_of_completion_order() {
        LocalSet::new()
            .run_until(async {
                let (service, store, publisher) = setup(ResponseOrdering::LatestClick);
                let first = publisher.publish(fingerprint("first"));
                let second = publisher.publish(fingerprint("second"));
                tokio::task::yield_now().await;
                assert_eq!(service.requests.borrow().len(), 2);

                service.release(1, Ok(inline(2)));
                assert!(matches!(second.await.unwrap(), SyncOutcome::Applied));
                service.release(0, Ok(inline(1)));
                assert!(matches!(
                    first.await.unwrap(),
                    SyncOutcome::Superseded { latest: 2 }
                ));

                assert_eq!(store.latest("update-inline-rules"), Some(json!(2)));
                assert_eq!(publisher.in_flight(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn completion_order_lets_slow_click_overwrite() {
        LocalSet::new()
            .run_until(async {
                let (service, store, publisher) = setup(ResponseOrdering::Completion);
                let first = publisher.publish(fingerprint("first"));
                let second = publisher.publish(fingerprint("second"));
                tokio::task::yield_now().await;

                service.release(1, Ok(inline(2)));
                second.await.unwrap();
                service.release(0, Ok(inline(1)));
                assert!(matches!(first.await.unwrap(), SyncOutcome::Applied));

                assert_eq!(store.latest("update-inline-rules"), Some(json!(1)));
            })
            .await;
    }

    #[tokio::test]
    async fn failure_is_reported_and_publisher_stays_usable() {
        #[derive(Default)]
        struct Recorder(RefCell<Vec<u64>>);
        impl FailureNotifier for Recorder {
            fn inspection_failed(&self, seq: u64, _: &ElementFingerprint, _: &SyncError) {
                self.0.borrow_mut().push(seq);
            }
        }

        LocalSet::new()
            .run_until(async {
                let service = Rc::new(GatedService::default());
                let store = Rc::new(MutationLog::new());
                let recorder = Rc::new(Recorder::default());
                let publisher = SyncPublisher::new(
                    service.clone(),
                    store.clone(),
                    PublisherOptions::default().with_notifier(recorder.clone()),
                );

                let failed = publisher.publish(fingerprint("a"));
                tokio::task::yield_now().await;
                service.release(0, Err(SyncError::Status { status: 500 }));
                assert!(matches!(
                    failed.await.unwrap(),
                    SyncOutcome::Failed(SyncError::Status { status: 500 })
                ));
                assert!(store.is_empty());
                assert_eq!(*recorder.0.borrow(), vec![1]);

                let ok = publisher.publish(fingerprint("b"));
                tokio::task::yield_now().await;
                service.release(1, Ok(inline(7)));
                assert!(matches!(ok.await.unwrap(), SyncOutcome::Applied));
                assert_eq!(store.latest("update-inline-rules"), Some(json!(7)));
            })
            .await;
    }

    #[tokio::test]
    async fn shutdown_aborts_in_flight_requests() {
        LocalSet::new()
            .run_until(async {
                let (service, store, publisher) = setup(ResponseOrdering::LatestClick);
                let pending = publisher.publish(fingerprint("a"));
                tokio::task::yield_now().await;

                publisher.shutdown();
                assert!(!publisher.is_live());
                assert_eq!(publisher.in_flight(), 0);
                assert!(pending.await.unwrap_err().is_cancelled());

                service.release(0, Ok(inline(1)));
                let late = publisher.publish(fingerprint("b"));
                assert!(matches!(late.await.unwrap(), SyncOutcome::Detached));
                assert_eq!(service.requests.borrow().len(), 1);
                assert!(store.is_empty());
            })
            .await;
    }

    #[tokio::test]
    async fn idle_waits_for_outstanding_requests() {
        LocalSet::new()
            .run_until(async {
                let (service, store, publisher) = setup(ResponseOrdering::LatestClick);
                let _pending = publisher.publish(fingerprint("a"));
                tokio::task::yield_now().await;

                let releaser = service.clone();
                tokio::task::spawn_local(async move {
                    releaser.release(0, Ok(inline(3)));
                });
                publisher.idle().await;

                assert_eq!(store.names().len(), 4);
            })
            .await;
    }
}
