//! Observation input and its builder.

use serde::{Deserialize, Serialize};

use super::ObservationType;

/// Fields supplied by the worker when recording an observation.
///
/// The store adds the session linkage, project, prompt number and
/// timestamps on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationInput {
    pub observation_type: ObservationType,
    pub title: String,
    pub subtitle: Option<String>,
    pub text: Option<String>,
    pub narrative: Option<String>,
    pub facts: Vec<String>,
    pub concepts: Vec<String>,
    pub files_read: Vec<String>,
    pub files_modified: Vec<String>,
    pub tool_use_id: Option<String>,
}

impl ObservationInput {
    /// Returns a new builder with the required fields set.
    #[must_use]
    pub fn builder(
        observation_type: ObservationType,
        title: impl Into<String>,
    ) -> ObservationInputBuilder {
        ObservationInputBuilder::new(observation_type, title.into())
    }
}

/// Builder for [`ObservationInput`].
#[derive(Debug, Clone)]
pub struct ObservationInputBuilder {
    observation_type: ObservationType,
    title: String,
    subtitle: Option<String>,
    text: Option<String>,
    narrative: Option<String>,
    facts: Vec<String>,
    concepts: Vec<String>,
    files_read: Vec<String>,
    files_modified: Vec<String>,
    tool_use_id: Option<String>,
}

impl ObservationInputBuilder {
    fn new(observation_type: ObservationType, title: String) -> Self {
        Self {
            observation_type,
            title,
            subtitle: None,
            text: None,
            narrative: None,
            facts: Vec::new(),
            concepts: Vec::new(),
            files_read: Vec::new(),
            files_modified: Vec::new(),
            tool_use_id: None,
        }
    }

    #[must_use]
    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    #[must_use]
    pub fn maybe_subtitle(mut self, subtitle: Option<String>) -> Self {
        self.subtitle = subtitle;
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn narrative(mut self, narrative: impl Into<String>) -> Self {
        self.narrative = Some(narrative.into());
        self
    }

    #[must_use]
    pub fn maybe_narrative(mut self, narrative: Option<String>) -> Self {
        self.narrative = narrative;
        self
    }

    #[must_use]
    pub fn facts(mut self, facts: Vec<String>) -> Self {
        self.facts = facts;
        self
    }

    #[must_use]
    pub fn concepts(mut self, concepts: Vec<String>) -> Self {
        self.concepts = concepts;
        self
    }

    #[must_use]
    pub fn files_read(mut self, files_read: Vec<String>) -> Self {
        self.files_read = files_read;
        self
    }

    #[must_use]
    pub fn files_modified(mut self, files_modified: Vec<String>) -> Self {
        self.files_modified = files_modified;
        self
    }

    #[must_use]
    pub fn tool_use_id(mut self, tool_use_id: impl Into<String>) -> Self {
        self.tool_use_id = Some(tool_use_id.into());
        self
    }

    #[must_use]
    pub fn maybe_tool_use_id(mut self, tool_use_id: Option<String>) -> Self {
        self.tool_use_id = tool_use_id;
        self
    }

    #[must_use]
    pub fn build(self) -> ObservationInput {
        ObservationInput {
            observation_type: self.observation_type,
            title: self.title,
            subtitle: self.subtitle,
            text: self.text,
            narrative: self.narrative,
            facts: self.facts,
            concepts: self.concepts,
            files_read: self.files_read,
            files_modified: self.files_modified,
            tool_use_id: self.tool_use_id,
        }
    }
}
