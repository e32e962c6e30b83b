use domain::deeplink::{DeepLinkError, DeepLinkResolver, ResolvedLink};
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Where the most recent resolution stands
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionState {
    Idle,
    Pending { generation: u64 },
    Resolved(ResolvedLink),
    Rejected(DeepLinkError),
}

#[derive(Debug)]
struct Inner {
    generation: u64,
    state: ResolutionState,
    cancel: Option<CancellationToken>,
}

/// Resolves incoming links one at a time. A newer link supersedes any
/// resolution still in flight, whose result is then discarded.
pub struct DeepLinkService {
    resolver: DeepLinkResolver,
    inner: Mutex<Inner>,
}

impl DeepLinkService {
    pub fn new(resolver: DeepLinkResolver) -> Self {
        Self {
            resolver,
            inner: Mutex::new(Inner {
                generation: 0,
                state: ResolutionState::Idle,
                cancel: None,
            }),
        }
    }

    pub fn resolver(&self) -> &DeepLinkResolver {
        &self.resolver
    }

    pub fn state(&self) -> ResolutionState {
        self.lock().state.clone()
    }

    /// `None` when a newer call superseded this one
    pub async fn resolve(&self, url: &str) -> Option<Result<ResolvedLink, DeepLinkError>> {
        let (generation, token) = self.begin();

        let outcome = tokio::select! {
            _ = token.cancelled() => None,
            outcome = self.resolver.resolve(url) => Some(outcome),
        };
        let Some(outcome) = outcome else {
            debug!(generation, "resolution superseded");
            return None;
        };

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "discarding stale resolution");
            return None;
        }
        inner.state = match &outcome {
            Ok(link) => ResolutionState::Resolved(link.clone()),
            Err(e) => ResolutionState::Rejected(e.clone()),
        };
        inner.cancel = None;
        Some(outcome)
    }

    /// Cancel whatever is in flight and go back to idle
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        if let Some(token) = inner.cancel.take() {
            token.cancel();
        }
        inner.state = ResolutionState::Idle;
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let mut inner = self.lock();
        inner.generation += 1;
        if let Some(previous) = inner.cancel.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        inner.cancel = Some(token.clone());
        inner.state = ResolutionState::Pending {
            generation: inner.generation,
        };
        (inner.generation, token)
    }

    // State stays consistent even if a holder panicked
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
