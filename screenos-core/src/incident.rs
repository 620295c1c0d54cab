//! Conversion incidents and their severities.

use serde::Serialize;

/// Severity of a conversion incident, totally ordered from least to most severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    #[default]
    None,
    Informative,
    ManualActionRequired,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Informative => "informative",
            Severity::ManualActionRequired => "manual-action-required",
        }
    }
}

/// A structured note tied back to the originating configuration line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionIncident {
    pub line_id: usize,
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl ConversionIncident {
    pub fn new(
        line_id: usize,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            line_id,
            title: title.into(),
            description: description.into(),
            severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::None < Severity::Informative);
        assert!(Severity::Informative < Severity::ManualActionRequired);
        assert_eq!(
            [Severity::Informative, Severity::ManualActionRequired, Severity::None]
                .into_iter()
                .max(),
            Some(Severity::ManualActionRequired)
        );
    }
}
