use serde::Serialize;
use serde_json::Value;

pub const NOT_FOUND_TEXT: &str = "Key not found";
pub const GENERIC_ERROR_TEXT: &str = "Error";
pub const KEYS_REFRESH_FAILED_TEXT: &str = "Key list refresh failed";
pub const CLEAR_FAILED_TEXT: &str = "Clear failed";
pub const COMPACT_FALLBACK_TEXT: &str = "Compaction finished";
pub const COMPACT_FAILED_TEXT: &str = "Compaction failed";
pub const STATS_UPDATED_TEXT: &str = "Stats updated";
pub const STATS_REFRESH_FAILED_TEXT: &str = "Stats refresh failed";

/// The single shared status line. Last writer wins; there is no queue.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub ok: bool,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            text: String::new(),
            ok: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KeyEntry {
    pub key: String,
}

/// Rendered key list. `count` comes from the server's listing and is shown
/// as-is, not recomputed from `entries`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct KeyListPane {
    pub entries: Vec<KeyEntry>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupPane {
    #[default]
    Empty,
    Record {
        record: Value,
    },
    NotFound,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StatsPane {
    pub snapshot: Option<Value>,
}

/// Everything the panel shows. Mutated only through [`PanelState::apply`].
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PanelState {
    pub status: StatusLine,
    pub keys: KeyListPane,
    pub lookup: LookupPane,
    pub stats: StatsPane,
    /// Compaction confirmation awaiting an explicit dismissal.
    pub pending_ack: Option<String>,
    #[serde(skip)]
    applied_keys_seq: u64,
}

/// Outcome of one panel operation, ready to fold into the state.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    StatusReported { text: String, ok: bool },
    SetCompleted { key: String },
    SetFailed { detail: Option<String> },
    LookupCompleted { key: String, record: Value },
    LookupFailed,
    DeleteCompleted { key: String },
    DeleteFailed { detail: Option<String> },
    KeysLoaded { seq: u64, keys: Vec<String>, count: u64 },
    KeysRefreshFailed { seq: u64 },
    ClearCompleted { message: String },
    ClearFailed,
    CompactCompleted { message: Option<String> },
    CompactFailed,
    AckDismissed,
    StatsLoaded { snapshot: Value },
    StatsRefreshFailed,
}

impl PanelState {
    pub fn apply(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::StatusReported { text, ok } => self.set_status(text, ok),
            PanelEvent::SetCompleted { key } => self.set_status(format!("Saved \"{key}\""), true),
            PanelEvent::SetFailed { detail } => self.fail_with_detail(detail),
            PanelEvent::LookupCompleted { key, record } => {
                self.lookup = LookupPane::Record { record };
                self.set_status(format!("Loaded \"{key}\""), true);
            }
            PanelEvent::LookupFailed => {
                // Missing key, dead server, garbage body: all one outcome.
                self.lookup = LookupPane::NotFound;
                self.fail_status(NOT_FOUND_TEXT.to_string());
            }
            PanelEvent::DeleteCompleted { key } => {
                self.set_status(format!("Deleted \"{key}\""), true);
            }
            PanelEvent::DeleteFailed { detail } => self.fail_with_detail(detail),
            PanelEvent::KeysLoaded { seq, keys, count } => {
                if !self.advance_keys_seq(seq) {
                    return;
                }
                self.keys = KeyListPane {
                    entries: keys.into_iter().map(|key| KeyEntry { key }).collect(),
                    count,
                };
                self.set_status(format!("{count} keys loaded"), true);
            }
            PanelEvent::KeysRefreshFailed { seq } => {
                if !self.advance_keys_seq(seq) {
                    return;
                }
                self.fail_status(KEYS_REFRESH_FAILED_TEXT.to_string());
            }
            PanelEvent::ClearCompleted { message } => {
                self.lookup = LookupPane::Empty;
                self.set_status(message, true);
            }
            PanelEvent::ClearFailed => self.fail_status(CLEAR_FAILED_TEXT.to_string()),
            PanelEvent::CompactCompleted { message } => {
                self.pending_ack =
                    Some(message.unwrap_or_else(|| COMPACT_FALLBACK_TEXT.to_string()));
            }
            PanelEvent::CompactFailed => self.fail_status(COMPACT_FAILED_TEXT.to_string()),
            PanelEvent::AckDismissed => self.pending_ack = None,
            PanelEvent::StatsLoaded { snapshot } => {
                self.stats = StatsPane {
                    snapshot: Some(snapshot),
                };
                self.set_status(STATS_UPDATED_TEXT.to_string(), true);
            }
            PanelEvent::StatsRefreshFailed => {
                self.fail_status(STATS_REFRESH_FAILED_TEXT.to_string());
            }
        }
    }

    fn set_status(&mut self, text: String, ok: bool) {
        self.status = StatusLine { text, ok };
    }

    fn fail_status(&mut self, text: String) {
        self.set_status(text, false);
    }

    fn fail_with_detail(&mut self, detail: Option<String>) {
        let text = detail.unwrap_or_else(|| GENERIC_ERROR_TEXT.to_string());
        self.fail_status(text);
    }

    /// Returns false for a stale sequence number. A stale refresh outcome,
    /// success or failure, must not touch any pane.
    fn advance_keys_seq(&mut self, seq: u64) -> bool {
        if seq <= self.applied_keys_seq {
            return false;
        }
        self.applied_keys_seq = seq;
        true
    }
}
