//! SQLite-backed persistence: template lifecycle, confirmed mappings and
//! the verified-mapping history.
//!
//! Saving a mapping set is an atomic replace. The delete-then-insert runs
//! in one transaction together with the template status flip, so a failure
//! at any point (a constraint violation included) leaves the previously
//! confirmed set authoritative.

use std::collections::HashMap;
use std::path::Path;

use log::info;
use rusqlite::{params, Connection, OptionalExtension};

use common::model::field::{Field, FieldKind};
use common::model::mapping::{
    CompletenessReport, ConfirmedMapping, MissingField, PageRect, SavedMappings, StoredMapping,
};
use common::model::template::{AnalysisStatus, Template};
use common::model::value::ValueSource;

use crate::db;
use crate::error::{EngineError, PersistenceError, ValidationError};
use crate::history::{FieldUsage, MappingHistory};

/// A template upload: identity, owning context and source bytes.
pub struct NewTemplate<'a> {
    pub id: &'a str,
    pub company_id: &'a str,
    pub field_id: &'a str,
    pub option_id: &'a str,
    pub source: &'a [u8],
    pub page_count: u32,
}

pub struct MappingStore {
    conn: Connection,
}

impl MappingStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Ok(MappingStore {
            conn: db::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Ok(MappingStore {
            conn: db::open_in_memory()?,
        })
    }

    /// Registers an uploaded template with status `Pending`.
    pub fn create_template(&self, template: &NewTemplate<'_>) -> Result<(), PersistenceError> {
        let digest = format!("{:x}", md5::compute(template.source));
        self.conn.execute(
            "INSERT INTO templates (id, company_id, field_id, option_id, source, source_md5, page_count, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending')",
            params![
                template.id,
                template.company_id,
                template.field_id,
                template.option_id,
                template.source,
                digest,
                template.page_count,
            ],
        )?;
        Ok(())
    }

    /// Re-upload: swaps the byte stream and resets the analysis lifecycle.
    pub fn replace_source(
        &self,
        template_id: &str,
        source: &[u8],
        page_count: u32,
    ) -> Result<(), PersistenceError> {
        let digest = format!("{:x}", md5::compute(source));
        let changed = self.conn.execute(
            "UPDATE templates
             SET source = ?1, source_md5 = ?2, page_count = ?3, status = 'pending', placeholder_count = 0
             WHERE id = ?4",
            params![source, digest, page_count, template_id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::TemplateNotFound(template_id.to_string()));
        }
        Ok(())
    }

    pub fn get_template(&self, template_id: &str) -> Result<Template, PersistenceError> {
        self.conn
            .query_row(
                "SELECT id, company_id, field_id, option_id, source_md5, page_count, status, placeholder_count
                 FROM templates WHERE id = ?1",
                params![template_id],
                |row| {
                    let status: String = row.get(6)?;
                    Ok(Template {
                        id: row.get(0)?,
                        company_id: row.get(1)?,
                        field_id: row.get(2)?,
                        option_id: row.get(3)?,
                        source_md5: row.get(4)?,
                        page_count: row.get(5)?,
                        status: AnalysisStatus::from_str(&status)
                            .unwrap_or(AnalysisStatus::Pending),
                        placeholder_count: row.get(7)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| PersistenceError::TemplateNotFound(template_id.to_string()))
    }

    pub fn template_source(&self, template_id: &str) -> Result<Vec<u8>, PersistenceError> {
        self.conn
            .query_row(
                "SELECT source FROM templates WHERE id = ?1",
                params![template_id],
                |row| row.get::<_, Option<Vec<u8>>>(0),
            )
            .optional()?
            .flatten()
            .ok_or_else(|| PersistenceError::TemplateNotFound(template_id.to_string()))
    }

    pub fn set_status(
        &self,
        template_id: &str,
        status: AnalysisStatus,
    ) -> Result<(), PersistenceError> {
        let changed = self.conn.execute(
            "UPDATE templates SET status = ?1 WHERE id = ?2",
            params![status.as_str(), template_id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::TemplateNotFound(template_id.to_string()));
        }
        Ok(())
    }

    /// Marks the analysis pass done and records how much it found.
    pub fn set_analyzed(
        &self,
        template_id: &str,
        placeholder_count: u32,
    ) -> Result<(), PersistenceError> {
        let changed = self.conn.execute(
            "UPDATE templates SET status = 'analyzed', placeholder_count = ?1 WHERE id = ?2",
            params![placeholder_count, template_id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::TemplateNotFound(template_id.to_string()));
        }
        Ok(())
    }

    /// Atomic replace of the template's confirmed mapping set.
    ///
    /// Field labels and kinds are captured from `catalog` at save time so
    /// later reads can display them without the live catalog. Each saved
    /// mapping is also recorded as verified usage for the owning company,
    /// which feeds the suggestion engine's historical boost.
    pub fn save_mappings(
        &mut self,
        template_id: &str,
        mappings: &[ConfirmedMapping],
        catalog: &[Field],
    ) -> Result<SavedMappings, EngineError> {
        for (index, mapping) in mappings.iter().enumerate() {
            if mapping.placeholder.trim().is_empty() {
                return Err(ValidationError::EmptyPlaceholder(index).into());
            }
            if mapping.field_id <= 0 {
                return Err(ValidationError::InvalidFieldId {
                    index,
                    field_id: mapping.field_id,
                }
                .into());
            }
        }

        let by_id: HashMap<i64, &Field> = catalog.iter().map(|f| (f.id, f)).collect();

        let tx = self.conn.transaction().map_err(PersistenceError::from)?;
        let result: Result<String, PersistenceError> = (|| {
            let company_id: String = tx
                .query_row(
                    "SELECT company_id FROM templates WHERE id = ?1",
                    params![template_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| PersistenceError::TemplateNotFound(template_id.to_string()))?;

            tx.execute(
                "DELETE FROM mappings WHERE template_id = ?1",
                params![template_id],
            )?;
            for mapping in mappings {
                let field = by_id.get(&mapping.field_id);
                tx.execute(
                    "INSERT INTO mappings
                     (template_id, placeholder, field_id, field_label, field_kind, is_required, page, x_pct, y_pct, width_pct, height_pct)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        template_id,
                        mapping.placeholder,
                        mapping.field_id,
                        field.map(|f| f.label.as_str()),
                        field.map(|f| f.kind.as_str()),
                        mapping.is_required,
                        mapping.page as i64,
                        mapping.position.map(|p| p.x_pct),
                        mapping.position.map(|p| p.y_pct),
                        mapping.position.map(|p| p.width_pct),
                        mapping.position.map(|p| p.height_pct),
                    ],
                )?;
                tx.execute(
                    "INSERT INTO mapping_history (context_id, placeholder, field_id, confidence, verified)
                     VALUES (?1, ?2, ?3, 1.0, 1)",
                    params![company_id, mapping.placeholder, mapping.field_id],
                )?;
            }
            tx.execute(
                "UPDATE templates SET status = 'mapped', placeholder_count = ?1 WHERE id = ?2",
                params![mappings.len() as i64, template_id],
            )?;
            Ok(company_id)
        })();

        match result {
            Ok(_) => {
                tx.commit().map_err(PersistenceError::from)?;
                info!(
                    "saved {} mappings for template {template_id}",
                    mappings.len()
                );
                Ok(SavedMappings {
                    saved_count: mappings.len(),
                })
            }
            Err(e) => {
                // Dropping the transaction rolls back; the prior set stays.
                drop(tx);
                Err(e.into())
            }
        }
    }

    pub fn get_mappings(&self, template_id: &str) -> Result<Vec<StoredMapping>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT placeholder, field_id, field_label, field_kind, is_required, page, x_pct, y_pct, width_pct, height_pct
             FROM mappings WHERE template_id = ?1
             ORDER BY page, id",
        )?;
        let rows = stmt.query_map(params![template_id], |row| {
            let kind: Option<String> = row.get(3)?;
            let x: Option<f64> = row.get(6)?;
            let y: Option<f64> = row.get(7)?;
            let w: Option<f64> = row.get(8)?;
            let h: Option<f64> = row.get(9)?;
            let position = match (x, y, w, h) {
                (Some(x_pct), Some(y_pct), Some(width_pct), Some(height_pct)) => Some(PageRect {
                    x_pct,
                    y_pct,
                    width_pct,
                    height_pct,
                }),
                _ => None,
            };
            Ok(StoredMapping {
                mapping: ConfirmedMapping {
                    placeholder: row.get(0)?,
                    field_id: row.get(1)?,
                    is_required: row.get(4)?,
                    page: row.get::<_, i64>(5)? as usize,
                    position,
                },
                field_label: row.get(2)?,
                field_kind: kind.as_deref().and_then(FieldKind::from_str),
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Checks whether every required mapping has a usable value.
    ///
    /// Required-ness: the catalog's `required_for_output` flag is
    /// authoritative for fields still present in the catalog; the
    /// mapping-level `is_required` snapshot only decides for fields the
    /// catalog no longer lists.
    pub fn validate_completeness(
        &self,
        template_id: &str,
        values: &ValueSource,
        catalog: &[Field],
    ) -> Result<CompletenessReport, PersistenceError> {
        let by_id: HashMap<i64, &Field> = catalog.iter().map(|f| (f.id, f)).collect();
        let mut missing = Vec::new();
        let mut available = Vec::new();

        for stored in self.get_mappings(template_id)? {
            let mapping = &stored.mapping;
            let required = match by_id.get(&mapping.field_id) {
                Some(field) => field.required_for_output,
                None => mapping.is_required,
            };
            if !required {
                continue;
            }
            let present = values
                .get(&mapping.field_id)
                .map(|v| v.is_present())
                .unwrap_or(false);
            if present {
                available.push(mapping.field_id);
            } else {
                missing.push(MissingField {
                    field_id: mapping.field_id,
                    placeholder: mapping.placeholder.clone(),
                    label: stored.field_label.clone(),
                });
            }
        }

        Ok(CompletenessReport {
            is_complete: missing.is_empty(),
            missing_fields: missing,
            available_fields: available,
        })
    }

    /// Records one verified placeholder→field confirmation outside a save,
    /// e.g. an auto-accepted suggestion the user later endorsed.
    pub fn record_verified_mapping(
        &self,
        context_id: &str,
        placeholder: &str,
        field_id: i64,
        confidence: f64,
    ) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO mapping_history (context_id, placeholder, field_id, confidence, verified)
             VALUES (?1, ?2, ?3, ?4, 1)",
            params![context_id, placeholder, field_id, confidence],
        )?;
        Ok(())
    }
}

impl MappingHistory for MappingStore {
    fn verified_usage(&self, context_id: &str) -> Result<Vec<FieldUsage>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT field_id, COUNT(*), AVG(confidence)
             FROM mapping_history
             WHERE context_id = ?1 AND verified = 1
             GROUP BY field_id",
        )?;
        let rows = stmt.query_map(params![context_id], |row| {
            Ok(FieldUsage {
                field_id: row.get(0)?,
                usage_count: row.get::<_, i64>(1)? as u32,
                avg_confidence: row.get(2)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::value::FieldValue;

    fn store_with_template() -> MappingStore {
        let store = MappingStore::open_in_memory().unwrap();
        store
            .create_template(&NewTemplate {
                id: "tpl-1",
                company_id: "company-1",
                field_id: "field-9",
                option_id: "option-2",
                source: "Όνομα: [ΟΝΟΜΑ]".as_bytes(),
                page_count: 1,
            })
            .unwrap();
        store
    }

    fn catalog() -> Vec<Field> {
        vec![
            Field {
                id: 3,
                label: "Τηλέφωνο".into(),
                kind: FieldKind::Text,
                required_for_output: true,
            },
            Field {
                id: 7,
                label: "Address".into(),
                kind: FieldKind::Text,
                required_for_output: false,
            },
        ]
    }

    fn mapping(placeholder: &str, field_id: i64, required: bool) -> ConfirmedMapping {
        ConfirmedMapping {
            placeholder: placeholder.into(),
            field_id,
            is_required: required,
            page: 0,
            position: None,
        }
    }

    #[test]
    fn template_lifecycle() {
        let store = store_with_template();
        let t = store.get_template("tpl-1").unwrap();
        assert_eq!(t.status, AnalysisStatus::Pending);
        assert!(!t.source_md5.is_empty());

        store.set_analyzed("tpl-1", 4).unwrap();
        let t = store.get_template("tpl-1").unwrap();
        assert_eq!(t.status, AnalysisStatus::Analyzed);
        assert_eq!(t.placeholder_count, 4);

        let old_md5 = t.source_md5;
        store.replace_source("tpl-1", b"new body", 2).unwrap();
        let t = store.get_template("tpl-1").unwrap();
        assert_eq!(t.status, AnalysisStatus::Pending);
        assert_eq!(t.placeholder_count, 0);
        assert_eq!(t.page_count, 2);
        assert_ne!(t.source_md5, old_md5);
        assert_eq!(store.template_source("tpl-1").unwrap(), b"new body");
    }

    #[test]
    fn missing_template_is_reported() {
        let store = MappingStore::open_in_memory().unwrap();
        assert!(matches!(
            store.get_template("ghost"),
            Err(PersistenceError::TemplateNotFound(_))
        ));
        assert!(matches!(
            store.set_status("ghost", AnalysisStatus::Failed),
            Err(PersistenceError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn save_and_read_back_with_field_metadata() {
        let mut store = store_with_template();
        let saved = store
            .save_mappings(
                "tpl-1",
                &[mapping("[ΟΝΟΜΑ]", 7, false), mapping("____", 3, true)],
                &catalog(),
            )
            .unwrap();
        assert_eq!(saved.saved_count, 2);

        let read = store.get_mappings("tpl-1").unwrap();
        assert_eq!(read.len(), 2);
        let phone = read.iter().find(|m| m.mapping.field_id == 3).unwrap();
        assert_eq!(phone.field_label.as_deref(), Some("Τηλέφωνο"));
        assert_eq!(phone.field_kind, Some(FieldKind::Text));

        let t = store.get_template("tpl-1").unwrap();
        assert_eq!(t.status, AnalysisStatus::Mapped);
        assert_eq!(t.placeholder_count, 2);
    }

    #[test]
    fn save_replaces_wholesale() {
        let mut store = store_with_template();
        store
            .save_mappings("tpl-1", &[mapping("[ΟΝΟΜΑ]", 7, false)], &catalog())
            .unwrap();
        store
            .save_mappings("tpl-1", &[mapping("____", 3, true)], &catalog())
            .unwrap();
        let read = store.get_mappings("tpl-1").unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].mapping.placeholder, "____");
    }

    #[test]
    fn failed_save_rolls_back_to_prior_set() {
        let mut store = store_with_template();
        store
            .save_mappings("tpl-1", &[mapping("[ΟΝΟΜΑ]", 7, false)], &catalog())
            .unwrap();

        // Duplicate (placeholder, page) violates the uniqueness invariant
        // mid-insert; the whole replace must roll back.
        let result = store.save_mappings(
            "tpl-1",
            &[mapping("[X]", 3, false), mapping("[X]", 7, false)],
            &catalog(),
        );
        assert!(result.is_err());

        let read = store.get_mappings("tpl-1").unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].mapping.placeholder, "[ΟΝΟΜΑ]");
    }

    #[test]
    fn structurally_invalid_requests_are_rejected_before_mutation() {
        let mut store = store_with_template();
        store
            .save_mappings("tpl-1", &[mapping("[ΟΝΟΜΑ]", 7, false)], &catalog())
            .unwrap();

        let err = store
            .save_mappings("tpl-1", &[mapping("  ", 3, false)], &catalog())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::EmptyPlaceholder(0))
        ));
        let err = store
            .save_mappings("tpl-1", &[mapping("[X]", 0, false)], &catalog())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::InvalidFieldId { .. })
        ));

        // Prior set untouched.
        assert_eq!(store.get_mappings("tpl-1").unwrap().len(), 1);
    }

    #[test]
    fn completeness_reports_missing_required_values() {
        let mut store = store_with_template();
        store
            .save_mappings("tpl-1", &[mapping("X", 3, true)], &catalog())
            .unwrap();

        let report = store
            .validate_completeness("tpl-1", &ValueSource::new(), &catalog())
            .unwrap();
        assert!(!report.is_complete);
        assert_eq!(report.missing_fields.len(), 1);
        assert_eq!(report.missing_fields[0].field_id, 3);

        let mut values = ValueSource::new();
        values.insert(3, FieldValue::Text("2101234567".into()));
        let report = store
            .validate_completeness("tpl-1", &values, &catalog())
            .unwrap();
        assert!(report.is_complete);
        assert_eq!(report.available_fields, vec![3]);
    }

    #[test]
    fn catalog_required_flag_wins_over_mapping_flag() {
        let mut store = store_with_template();
        // Field 7 is not required in the catalog even though the mapping
        // snapshot says otherwise; field 99 is unknown to the catalog so
        // its mapping flag decides.
        store
            .save_mappings(
                "tpl-1",
                &[mapping("[A]", 7, true), mapping("[B]", 99, true)],
                &catalog(),
            )
            .unwrap();

        let report = store
            .validate_completeness("tpl-1", &ValueSource::new(), &catalog())
            .unwrap();
        assert_eq!(report.missing_fields.len(), 1);
        assert_eq!(report.missing_fields[0].field_id, 99);
    }

    #[test]
    fn blank_text_is_not_a_usable_value() {
        let mut store = store_with_template();
        store
            .save_mappings("tpl-1", &[mapping("X", 3, true)], &catalog())
            .unwrap();
        let mut values = ValueSource::new();
        values.insert(3, FieldValue::Text("   ".into()));
        let report = store
            .validate_completeness("tpl-1", &values, &catalog())
            .unwrap();
        assert!(!report.is_complete);
    }

    #[test]
    fn saves_feed_verified_usage() {
        let mut store = store_with_template();
        store
            .save_mappings(
                "tpl-1",
                &[mapping("[ΟΝΟΜΑ]", 7, false), mapping("____", 3, false)],
                &catalog(),
            )
            .unwrap();
        store
            .record_verified_mapping("company-1", "[ΟΝΟΜΑ]", 7, 0.95)
            .unwrap();

        let usage = store.verified_usage("company-1").unwrap();
        let seven = usage.iter().find(|u| u.field_id == 7).unwrap();
        assert_eq!(seven.usage_count, 2);
        assert!(store.verified_usage("other-company").unwrap().is_empty());
    }

    #[test]
    fn position_round_trip() {
        let mut store = store_with_template();
        let with_pos = ConfirmedMapping {
            placeholder: "[ΥΠΟΓΡΑΦΗ]".into(),
            field_id: 7,
            is_required: false,
            page: 1,
            position: Some(PageRect {
                x_pct: 10.0,
                y_pct: 80.0,
                width_pct: 30.0,
                height_pct: 5.0,
            }),
        };
        store
            .save_mappings("tpl-1", std::slice::from_ref(&with_pos), &catalog())
            .unwrap();
        let read = store.get_mappings("tpl-1").unwrap();
        assert_eq!(read[0].mapping, with_pos);
    }
}
