//! # sealcall-observability
//!
//! Logging-Aufbau fuer Prozesse, die Sealcall einbetten: die Bibliothek
//! loggt nur ueber `tracing`, der Subscriber kommt von hier.

pub mod logging;

pub use logging::{init_from_env, LogConfig, LogFormat};
