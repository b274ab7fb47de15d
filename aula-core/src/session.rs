//! Per-conversation state.

use crate::guide::GuideWalkState;
use crate::model::{DocumentSet, Render};
use crate::router::TopicMemory;
use crate::transcript::Transcript;
use serde::{Deserialize, Serialize};

/// Everything one conversation remembers between events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub documents: DocumentSet,
    pub topics: TopicMemory,
    pub guide: GuideWalkState,
    pub transcript: Transcript,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector buttons for the loaded documents
    pub fn document_selector(&self) -> Render {
        Render::DocumentSelector {
            names: self
                .documents
                .documents()
                .iter()
                .map(|d| d.short_name())
                .collect(),
            active: self.documents.current_index(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;

    #[test]
    fn test_document_selector_uses_short_names() {
        let mut session = Session::new();
        session.documents.replace(vec![
            Document::new("a.pdf", "a", 1),
            Document::new("un_nombre_demasiado_largo.pdf", "b", 1),
        ]);
        session.documents.select(1);

        assert_eq!(
            session.document_selector(),
            Render::DocumentSelector {
                names: vec!["a.pdf".to_string(), "un_nombre_demasia...".to_string()],
                active: 1,
            }
        );
    }
}
