//! The synchronous analysis pass over one template: extract, detect,
//! suggest, persist the outcome on the template row.

use log::info;
use serde::{Deserialize, Serialize};

use common::model::field::Field;
use common::model::suggestion::PlaceholderAnalysis;

use crate::detect;
use crate::error::EngineError;
use crate::extract;
use crate::store::MappingStore;
use crate::suggest::SuggestionEngine;

/// Everything one analysis pass found, keyed to the template it ran on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateAnalysis {
    pub template_id: String,
    pub placeholder_count: usize,
    pub auto_mappable_count: usize,
    pub placeholders: Vec<PlaceholderAnalysis>,
}

/// Runs the full pass: source bytes → text → placeholder occurrences →
/// ranked suggestions per occurrence, with historical reinforcement scoped
/// to the template's owning company. On success the template is marked
/// `Analyzed` with the occurrence count; an unreadable source marks it
/// `Failed` before the error surfaces.
pub fn analyze_template(
    store: &MappingStore,
    template_id: &str,
    catalog: &[Field],
) -> Result<TemplateAnalysis, EngineError> {
    let template = store.get_template(template_id)?;
    let source = store.template_source(template_id)?;

    let text = match extract::extract_text(&source) {
        Ok(text) => text,
        Err(e) => {
            store.set_status(template_id, common::model::template::AnalysisStatus::Failed)?;
            return Err(EngineError::document(template_id, e));
        }
    };

    let occurrences = detect::analyze_text(&text.text, template.page_count as usize);
    let engine = SuggestionEngine::with_builtin();
    let placeholders: Vec<PlaceholderAnalysis> = occurrences
        .into_iter()
        .map(|occurrence| {
            engine.analyze_occurrence(occurrence, catalog, store, &template.company_id)
        })
        .collect();

    let auto_mappable_count = placeholders.iter().filter(|p| p.auto_mappable).count();
    store.set_analyzed(template_id, placeholders.len() as u32)?;
    info!(
        "analyzed template {template_id}: {} placeholders, {auto_mappable_count} auto-mappable",
        placeholders.len()
    );

    Ok(TemplateAnalysis {
        template_id: template_id.to_string(),
        placeholder_count: placeholders.len(),
        auto_mappable_count,
        placeholders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::field::FieldKind;
    use common::model::template::AnalysisStatus;
    use crate::store::NewTemplate;

    fn catalog() -> Vec<Field> {
        vec![
            Field {
                id: 1,
                label: "Ονοματεπώνυμο".into(),
                kind: FieldKind::Text,
                required_for_output: true,
            },
            Field {
                id: 3,
                label: "Τηλέφωνο".into(),
                kind: FieldKind::Text,
                required_for_output: false,
            },
        ]
    }

    fn store_with(source: &[u8]) -> MappingStore {
        let store = MappingStore::open_in_memory().unwrap();
        store
            .create_template(&NewTemplate {
                id: "tpl-1",
                company_id: "company-1",
                field_id: "field-9",
                option_id: "option-2",
                source,
                page_count: 1,
            })
            .unwrap();
        store
    }

    #[test]
    fn pass_marks_template_analyzed_with_count() {
        let store = store_with("Όνομα: [ΟΝΟΜΑ]\nΤηλέφωνο: ____".as_bytes());
        let analysis = analyze_template(&store, "tpl-1", &catalog()).unwrap();

        assert_eq!(analysis.placeholder_count, 2);
        assert!(analysis.auto_mappable_count >= 1);

        let template = store.get_template("tpl-1").unwrap();
        assert_eq!(template.status, AnalysisStatus::Analyzed);
        assert_eq!(template.placeholder_count, 2);
    }

    #[test]
    fn suggestions_come_ranked_per_occurrence() {
        let store = store_with("Τηλέφωνο: [ΤΗΛΕΦΩΝΟ]".as_bytes());
        let analysis = analyze_template(&store, "tpl-1", &catalog()).unwrap();
        let first = &analysis.placeholders[0];
        assert_eq!(first.suggestions[0].field_id, 3);
        assert!(first.auto_mappable);
    }

    #[test]
    fn unreadable_source_marks_template_failed() {
        let store = store_with(&[0xFF, 0xFE, 0x00]);
        let err = analyze_template(&store, "tpl-1", &catalog()).unwrap_err();
        assert!(matches!(err, EngineError::Document { .. }));
        assert_eq!(
            store.get_template("tpl-1").unwrap().status,
            AnalysisStatus::Failed
        );
    }

    #[test]
    fn analysis_payload_serializes() {
        let store = store_with("Όνομα: [ΟΝΟΜΑ]".as_bytes());
        let analysis = analyze_template(&store, "tpl-1", &catalog()).unwrap();
        let json = serde_json::to_string(&analysis).unwrap();
        assert!(json.contains("\"template_id\":\"tpl-1\""));
    }
}
