use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    TextArea,
    TextInput,
    Radio,
    Checkbox,
    Select,
}

/// One fillable control as reported by a form snapshot.
///
/// Radio and checkbox groups are reported as a single control whose `options` are the
/// group's labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormControl {
    /// Stable per-page identifier assigned by the snapshot.
    pub id: String,
    pub kind: ControlKind,
    /// Visible question text (legend, label, aria-label), trimmed.
    pub question: String,
    /// Lowercased name/id/placeholder/aria-label attributes joined by spaces.
    #[serde(default)]
    pub hints: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected: Vec<usize>,
    #[serde(default)]
    pub required: bool,
}

impl FormControl {
    pub fn is_text(&self) -> bool {
        matches!(self.kind, ControlKind::TextArea | ControlKind::TextInput)
    }

    pub fn is_answered(&self) -> bool {
        match self.kind {
            ControlKind::TextArea | ControlKind::TextInput => self
                .value
                .as_deref()
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false),
            ControlKind::Select => self
                .selected
                .iter()
                .any(|&i| !is_placeholder_option(self.options.get(i).map(String::as_str).unwrap_or(""))),
            ControlKind::Radio | ControlKind::Checkbox => !self.selected.is_empty(),
        }
    }

    /// Question text plus hint attributes, lowercased, for intent matching.
    pub fn haystack(&self) -> String {
        format!("{} {}", self.question.to_lowercase(), self.hints)
    }
}

/// "Select...", "Please choose" and empty entries at the top of dropdowns.
pub fn is_placeholder_option(label: &str) -> bool {
    let l = label.trim().to_lowercase();
    l.is_empty() || l.contains("select") || l.contains("please") || l == "--"
}
