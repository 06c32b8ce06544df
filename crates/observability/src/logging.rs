//! Logging-Aufbau fuer einbettende Prozesse und Tests
//!
//! Die Bibliotheks-Crates loggen ausschliesslich ueber `tracing`-Makros;
//! ob und wie die Ausgaben erscheinen, entscheidet der einbettende Prozess.
//! `LogConfig` buendelt diese Entscheidung: Defaults aus dem Code,
//! ueberschreibbar per `SC_LOG_LEVEL` (Filter-Direktiven) und
//! `SC_LOG_FORMAT` (text/json).

use tracing_subscriber::{fmt, EnvFilter};

/// Env-Variable fuer den Log-Filter (EnvFilter-Direktiven)
pub const ENV_LOG_LEVEL: &str = "SC_LOG_LEVEL";
/// Env-Variable fuer das Ausgabeformat
pub const ENV_LOG_FORMAT: &str = "SC_LOG_FORMAT";

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Menschenlesbare Zeilen (Standard)
    #[default]
    Text,
    /// Eine JSON-Zeile pro Event, fuer Log-Aggregation
    Json,
}

impl LogFormat {
    /// Parst `"text"` / `"json"` (exakt, kleingeschrieben)
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Aufgeloeste Logging-Konfiguration
///
/// `from_env` liest die Env-Overrides einmal beim Aufbau; danach ist die
/// Konfiguration ein reiner Wert und kann vor `install` noch angepasst
/// werden.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter-Ausdruck, z. B. `"info"` oder `"sealcall_session=debug"`
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LogConfig {
    /// Defaults, ueberschrieben durch `SC_LOG_LEVEL` / `SC_LOG_FORMAT`
    ///
    /// Ein unbekannter Format-Wert faellt auf Text zurueck statt zu
    /// scheitern; ein ungueltiger Filter faellt erst in `install` zurueck.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(filter) = std::env::var(ENV_LOG_LEVEL) {
            config.filter = filter;
        }
        if let Ok(format) = std::env::var(ENV_LOG_FORMAT) {
            config.format = LogFormat::parse(&format).unwrap_or_default();
        }
        config
    }

    /// Installiert den globalen Subscriber
    ///
    /// `false`, wenn bereits ein Subscriber installiert ist - Tests und
    /// mehrfach initialisierende Einbettungen duerfen das ignorieren.
    pub fn install(&self) -> bool {
        let filter =
            EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new("info"));

        match self.format {
            LogFormat::Json => fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_current_span(true)
                .try_init()
                .is_ok(),
            LogFormat::Text => fmt()
                .with_env_filter(filter)
                .with_target(true)
                .try_init()
                .is_ok(),
        }
    }
}

/// Komfort-Einstieg: Env-Konfiguration lesen und installieren
pub fn init_from_env() -> bool {
    LogConfig::from_env().install()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parse_akzeptiert_nur_bekannte_werte() {
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("JSON"), None);
        assert_eq!(LogFormat::parse("xml"), None);
        assert_eq!(LogFormat::parse(""), None);
    }

    #[test]
    fn default_konfiguration() {
        let config = LogConfig::default();
        assert_eq!(config.filter, "info");
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn unbekanntes_format_faellt_auf_text_zurueck() {
        assert_eq!(
            LogFormat::parse("verbose").unwrap_or_default(),
            LogFormat::Text
        );
    }

    #[test]
    fn install_ist_idempotent() {
        let config = LogConfig::default();
        // Erster Aufruf installiert, der zweite trifft auf den bereits
        // gesetzten globalen Subscriber
        assert!(config.install());
        assert!(!config.install());
    }
}
