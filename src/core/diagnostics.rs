use serde::Serialize;
use strum::Display;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// Category of a recorded condition, for audit.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    DomainClamp,
    SizingTemperatureClamp,
    RegimeSelected,
    StageAdjusted,
    StageDisabled,
    StageSubstituted,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SizingMessage {
    pub severity: Severity,
    pub kind: MessageKind,
    pub message: String,
}

/// Non-fatal conditions recorded while sizing one unit.
///
/// Every message is also emitted as a tracing event so a subscriber sees them as they happen.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    messages: Vec<SizingMessage>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn info(&mut self, kind: MessageKind, message: impl Into<String>) {
        let message = message.into();
        info!(%kind, "{message}");
        self.messages.push(SizingMessage {
            severity: Severity::Info,
            kind,
            message,
        });
    }

    pub fn warn(&mut self, kind: MessageKind, message: impl Into<String>) {
        let message = message.into();
        warn!(%kind, "{message}");
        self.messages.push(SizingMessage {
            severity: Severity::Warning,
            kind,
            message,
        });
    }

    pub fn messages(&self) -> &[SizingMessage] {
        &self.messages
    }

    pub fn count_of(&self, kind: MessageKind) -> usize {
        self.messages.iter().filter(|m| m.kind == kind).count()
    }

    pub fn has_warnings(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.severity == Severity::Warning)
    }

    pub fn into_messages(self) -> Vec<SizingMessage> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_record_messages_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.info(MessageKind::RegimeSelected, "moderate");
        diagnostics.warn(MessageKind::StageDisabled, "stage 1 disabled");

        assert_eq!(
            diagnostics.messages(),
            &[
                SizingMessage {
                    severity: Severity::Info,
                    kind: MessageKind::RegimeSelected,
                    message: "moderate".into(),
                },
                SizingMessage {
                    severity: Severity::Warning,
                    kind: MessageKind::StageDisabled,
                    message: "stage 1 disabled".into(),
                },
            ]
        );
        assert_eq!(diagnostics.count_of(MessageKind::StageDisabled), 1);
        assert!(diagnostics.has_warnings());
    }

    #[rstest]
    fn should_label_severity_in_snake_case() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(MessageKind::DomainClamp.to_string(), "domain_clamp");
    }
}
