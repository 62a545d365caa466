//! Trusted-content gate
//!
//! Dashboards can embed arbitrary script, styles and external
//! resources. Under `execution_mode = safe` such content may neither be
//! introduced nor altered, while unrelated edits to dashboards that
//! already carry trusted content must keep working. The gate compares
//! canonical signatures of the trust-relevant field subset in the
//! incoming payload and the stored record, and rejects any divergence
//! before persistence.
//!
//! Canonicalization: strings trimmed, resource-url lists sorted
//! lexicographically, deterministic serialization, SHA-256 digest.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{EngineError, EngineResult};
use crate::types::{Dashboard, DashboardPatch, DashboardSettings, ExecutionMode, Pane, Widget};

/// Widget type whose raw HTML runs only in trusted deployments
const HTML_WIDGET: &str = "html";
/// HTML widget mode that marks its content as executable
const TRUSTED_HTML_MODE: &str = "trusted_html";
/// Widget type that carries its own script/resource payload
const BASE_TEMPLATE_WIDGET: &str = "base_template";

/// Settings keys holding resource-url lists, sorted during
/// canonicalization so reordering is not a trust change
const RESOURCE_LIST_KEYS: [&str; 2] = ["resources", "external_scripts"];

/// Which trust-relevant field groups an incoming payload touches.
///
/// The stored record is masked to the same subset before comparison;
/// a patch that never mentions `settings` must not be failed because
/// the stored settings carry a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustScope {
    pub settings: bool,
    pub panes: bool,
}

impl TrustScope {
    pub const FULL: Self = Self {
        settings: true,
        panes: true,
    };

    pub fn of_patch(patch: &DashboardPatch) -> Self {
        Self {
            settings: patch.settings.is_some(),
            panes: patch.panes.is_some(),
        }
    }
}

fn trimmed_non_empty(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

/// Recursively canonicalize an opaque settings value: trim strings and
/// sort resource-url lists.
fn canonicalize_value(value: &Value, parent_key: Option<&str>) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        Value::Array(items) => {
            let mut canonical: Vec<Value> = items
                .iter()
                .map(|v| canonicalize_value(v, None))
                .collect();
            if parent_key.is_some_and(|k| RESOURCE_LIST_KEYS.contains(&k)) {
                canonical.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
            }
            Value::Array(canonical)
        }
        Value::Object(map) => {
            let mut canonical = Map::new();
            for (k, v) in map {
                canonical.insert(k.clone(), canonicalize_value(v, Some(k)));
            }
            Value::Object(canonical)
        }
        other => other.clone(),
    }
}

fn settings_field(settings: &Value, key: &str) -> Option<String> {
    settings
        .get(key)
        .and_then(Value::as_str)
        .and_then(trimmed_non_empty)
        .map(str::to_string)
}

fn settings_list_non_empty(settings: &Value, key: &str) -> bool {
    settings
        .get(key)
        .and_then(Value::as_array)
        .is_some_and(|a| !a.is_empty())
}

/// Whether a widget's settings participate in the trust signature.
fn widget_is_trust_relevant(widget: &Widget) -> bool {
    match widget.widget_type.as_str() {
        HTML_WIDGET => settings_field(&widget.settings, "mode")
            .is_some_and(|mode| mode.eq_ignore_ascii_case(TRUSTED_HTML_MODE)),
        BASE_TEMPLATE_WIDGET => {
            settings_field(&widget.settings, "script").is_some()
                || RESOURCE_LIST_KEYS
                    .iter()
                    .any(|k| settings_list_non_empty(&widget.settings, k))
        }
        _ => false,
    }
}

fn settings_source(settings: &DashboardSettings) -> Map<String, Value> {
    let mut source = Map::new();
    if let Some(script) = settings.script.as_deref().and_then(trimmed_non_empty) {
        source.insert("script".to_string(), Value::String(script.to_string()));
    }
    if let Some(style) = settings.style.as_deref().and_then(trimmed_non_empty) {
        source.insert("style".to_string(), Value::String(style.to_string()));
    }
    let mut resources: Vec<String> = settings
        .resources
        .iter()
        .filter_map(|r| trimmed_non_empty(r))
        .map(str::to_string)
        .collect();
    if !resources.is_empty() {
        resources.sort();
        source.insert(
            "resources".to_string(),
            Value::Array(resources.into_iter().map(Value::String).collect()),
        );
    }
    source
}

fn widget_source(panes: &[Pane]) -> Vec<Value> {
    let mut entries: Vec<Value> = panes
        .iter()
        .flat_map(|p| p.widgets.iter())
        .filter(|w| widget_is_trust_relevant(w))
        .map(|w| {
            let mut entry = Map::new();
            entry.insert(
                "type".to_string(),
                Value::String(w.widget_type.trim().to_string()),
            );
            entry.insert("settings".to_string(), canonicalize_value(&w.settings, None));
            Value::Object(entry)
        })
        .collect();
    // Order-independent: moving a widget between panes is not a trust
    // change, altering its content is.
    entries.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
    entries
}

/// Canonical trust signature over the given field groups.
///
/// `None` means the payload carries no trust-relevant content at all.
pub fn signature(
    settings: Option<&DashboardSettings>,
    panes: Option<&[Pane]>,
) -> Option<String> {
    let mut source = Map::new();
    if let Some(settings) = settings {
        for (key, value) in settings_source(settings) {
            source.insert(key, value);
        }
    }
    if let Some(panes) = panes {
        let widgets = widget_source(panes);
        if !widgets.is_empty() {
            source.insert("widgets".to_string(), Value::Array(widgets));
        }
    }
    if source.is_empty() {
        return None;
    }

    let canonical = Value::Object(source).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    Some(hex::encode(digest))
}

/// Signature of the stored record, masked to `scope`.
pub fn dashboard_signature(dashboard: &Dashboard, scope: TrustScope) -> Option<String> {
    signature(
        scope.settings.then_some(&dashboard.settings),
        scope.panes.then_some(dashboard.panes.as_slice()),
    )
}

/// Signature of an incoming partial payload.
pub fn patch_signature(patch: &DashboardPatch) -> Option<String> {
    signature(patch.settings.as_ref(), patch.panes.as_deref())
}

/// Decision point for incoming dashboard payloads
pub struct TrustedPayloadGate;

impl TrustedPayloadGate {
    /// Gate an update of an existing record.
    pub fn check_update(
        mode: ExecutionMode,
        patch: &DashboardPatch,
        existing: &Dashboard,
    ) -> EngineResult<()> {
        let incoming = patch_signature(patch);
        let existing_sig = dashboard_signature(existing, TrustScope::of_patch(patch));
        Self::decide(mode, incoming, existing_sig)
    }

    /// Gate a creation; there is no existing signature to match.
    pub fn check_create(mode: ExecutionMode, dashboard: &Dashboard) -> EngineResult<()> {
        let incoming = dashboard_signature(dashboard, TrustScope::FULL);
        Self::decide(mode, incoming, None)
    }

    fn decide(
        mode: ExecutionMode,
        incoming: Option<String>,
        existing: Option<String>,
    ) -> EngineResult<()> {
        let Some(incoming) = incoming else {
            return Ok(());
        };
        if mode == ExecutionMode::Trusted {
            return Ok(());
        }
        if existing.as_deref() == Some(incoming.as_str()) {
            return Ok(());
        }
        Err(EngineError::Forbidden(
            "embedded scripts and external resources require trusted execution mode"
                .to_string(),
        ))
    }
}
