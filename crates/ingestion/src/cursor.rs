use std::sync::RwLock;

/// Monotonic watermark of the newest processed signature for one watched
/// program. Empty means "no baseline yet, fetch the newest batch".
///
/// Single writer (the poller), any number of readers for observability.
/// Process-local by design; a restart re-baselines.
#[derive(Debug, Default)]
pub struct SignatureCursor {
    inner: RwLock<String>,
}

impl SignatureCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, signature: &str) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = signature.to_string();
    }

    pub fn snapshot(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_empty()
    }
}
