//! Runtime-Familien-Erkennung
//!
//! Die Familie wird aus dem User-Agent-String abgeleitet. Die Reihenfolge
//! der Checks ist wichtig: Chromium-UAs enthalten auch "Safari", und
//! Firefox-UAs enthalten "Gecko" - Firefox wird daher zuerst geprueft,
//! dann Chromium, dann WebKit.

use serde::{Deserialize, Serialize};

/// Runtime-Familie der Umgebung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeFamily {
    Chromium,
    Firefox,
    WebKit,
    Unknown,
}

impl std::fmt::Display for RuntimeFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeFamily::Chromium => write!(f, "chromium"),
            RuntimeFamily::Firefox => write!(f, "firefox"),
            RuntimeFamily::WebKit => write!(f, "webkit"),
            RuntimeFamily::Unknown => write!(f, "unknown"),
        }
    }
}

/// Erkannte Familie samt Major-Version (falls parsebar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyInfo {
    pub family: RuntimeFamily,
    pub major_version: Option<u32>,
}

/// Leitet Familie und Version aus dem User-Agent ab
pub fn detect_family(user_agent: &str) -> FamilyInfo {
    if let Some(version) = version_after(user_agent, "Firefox/") {
        return FamilyInfo {
            family: RuntimeFamily::Firefox,
            major_version: version,
        };
    }

    if user_agent.contains("Chrome/") || user_agent.contains("Chromium/") {
        let version = version_after(user_agent, "Chrome/")
            .or_else(|| version_after(user_agent, "Chromium/"))
            .flatten();
        return FamilyInfo {
            family: RuntimeFamily::Chromium,
            major_version: version,
        };
    }

    if user_agent.contains("Safari/") || user_agent.contains("AppleWebKit/") {
        return FamilyInfo {
            family: RuntimeFamily::WebKit,
            major_version: version_after(user_agent, "Version/").flatten(),
        };
    }

    FamilyInfo {
        family: RuntimeFamily::Unknown,
        major_version: None,
    }
}

/// Liest die Major-Version nach einem Marker ("Firefox/121.0" -> 121)
///
/// Aeusseres `Option`: Marker vorhanden? Inneres: Version parsebar?
fn version_after(user_agent: &str, marker: &str) -> Option<Option<u32>> {
    let start = user_agent.find(marker)? + marker.len();
    let rest = &user_agent[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(rest[..end].parse().ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
