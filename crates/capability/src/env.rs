//! Runtime-Umgebung als injizierbare Nahtstelle
//!
//! Der `RuntimeEnv`-Trait abstrahiert die konkrete Laufzeitumgebung
//! (User-Agent, Feature-Existenz, Storage-Proben). Die Feature-Proben sind
//! reine Existenz-Checks ohne Aufruf; nur die Storage-Proben haben
//! Seiteneffekte und sind deshalb async.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Per Existenz-Check erkennbare Runtime-Features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeFeature {
    /// Script-Transform-Objekt an einen Worker binden
    ScriptTransform,
    /// Sender/Receiver-exponierte Encoded-Streams
    EncodedStreams,
    /// Direkte Transform-Property-Zuweisung mit Insertable Streams
    InsertableStreams,
    /// Hintergrund-Ausfuehrungskontext (Worker)
    Worker,
    /// High-Performance Shared-Memory-Puffer
    SharedArrayBuffer,
    /// Kryptografie-Provider vorhanden
    CryptoProvider,
}

/// Injizierbare Laufzeitumgebung
#[async_trait]
pub trait RuntimeEnv: Send + Sync {
    /// User-Agent-String der Runtime
    fn user_agent(&self) -> String;

    /// Reiner Existenz-Check eines Features (kein Aufruf)
    fn has_feature(&self, feature: RuntimeFeature) -> bool;

    /// Laeuft die Runtime in einem Secure Context?
    fn is_secure_context(&self) -> bool;

    /// localStorage Schreib-/Loesch-Roundtrip (Seiteneffekt!)
    async fn storage_roundtrip(&self) -> bool;

    /// Transaktionaler Datenbank Open-and-Use-Zyklus (Seiteneffekt!)
    async fn database_cycle(&self) -> bool;

    /// Gemeldete Storage-Quota in Bytes, falls abfragbar
    async fn storage_quota(&self) -> Option<u64>;
}

/// Test-Mock fuer `RuntimeEnv`
///
/// Zaehlt die Proben-Aufrufe, damit Tests die In-Flight-Deduplikation
/// nachweisen koennen.
#[derive(Debug)]
pub struct MockRuntimeEnv {
    pub user_agent: String,
    pub features: HashSet<RuntimeFeature>,
    pub secure_context: bool,
    pub storage_ok: bool,
    pub database_ok: bool,
    pub quota: Option<u64>,
    storage_probe_count: AtomicUsize,
    database_probe_count: AtomicUsize,
}

impl MockRuntimeEnv {
    /// Chromium-artige Umgebung mit allen Features
    pub fn chromium() -> Self {
        Self::new(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
             Chrome/120.0.0.0 Safari/537.36",
            [
                RuntimeFeature::EncodedStreams,
                RuntimeFeature::InsertableStreams,
                RuntimeFeature::Worker,
                RuntimeFeature::SharedArrayBuffer,
                RuntimeFeature::CryptoProvider,
            ],
        )
    }

    /// Firefox-artige Umgebung
    pub fn firefox() -> Self {
        Self::new(
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
            [
                RuntimeFeature::ScriptTransform,
                RuntimeFeature::Worker,
                RuntimeFeature::CryptoProvider,
            ],
        )
    }

    /// WebKit/Safari-artige Umgebung
    pub fn webkit() -> Self {
        Self::new(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
            [
                RuntimeFeature::ScriptTransform,
                RuntimeFeature::Worker,
                RuntimeFeature::CryptoProvider,
            ],
        )
    }

    pub fn new(
        user_agent: impl Into<String>,
        features: impl IntoIterator<Item = RuntimeFeature>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            features: features.into_iter().collect(),
            secure_context: true,
            storage_ok: true,
            database_ok: true,
            quota: Some(10 * 1024 * 1024 * 1024),
            storage_probe_count: AtomicUsize::new(0),
            database_probe_count: AtomicUsize::new(0),
        }
    }

    /// Markiert die Umgebung als Private-Browsing-artig
    /// (kaputte Storage-Proben, kleine Quota)
    pub fn with_private_mode(mut self) -> Self {
        self.storage_ok = false;
        self.database_ok = false;
        self.quota = Some(100 * 1024 * 1024);
        self
    }

    pub fn without_feature(mut self, feature: RuntimeFeature) -> Self {
        self.features.remove(&feature);
        self
    }

    pub fn insecure(mut self) -> Self {
        self.secure_context = false;
        self
    }

    /// Wie oft wurde die Storage-Probe ausgefuehrt?
    pub fn storage_probes(&self) -> usize {
        self.storage_probe_count.load(Ordering::SeqCst)
    }

    /// Wie oft wurde die Datenbank-Probe ausgefuehrt?
    pub fn database_probes(&self) -> usize {
        self.database_probe_count.load(Ordering::SeqCst)
    }

    /// Bequemer Arc-Wrapper
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl RuntimeEnv for MockRuntimeEnv {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn has_feature(&self, feature: RuntimeFeature) -> bool {
        self.features.contains(&feature)
    }

    fn is_secure_context(&self) -> bool {
        self.secure_context
    }

    async fn storage_roundtrip(&self) -> bool {
        self.storage_probe_count.fetch_add(1, Ordering::SeqCst);
        // Proben brauchen real Zeit; kurze Verzoegerung macht die
        // Deduplikation in Tests beobachtbar
        tokio::task::yield_now().await;
        self.storage_ok
    }

    async fn database_cycle(&self) -> bool {
        self.database_probe_count.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.database_ok
    }

    async fn storage_quota(&self) -> Option<u64> {
        self.quota
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
