//! Analysis result normalizer.
//!
//! Converts between the remote service's nested analysis payload and the flat
//! storage shape, and owns the re-analysis replacement policy:
//!
//! - existing rows for the project are deleted first (failures logged, not fatal)
//! - every feature is inserted on its own; one bad row never aborts the rest
//! - list fields are `|`-joined, `writing_strategy` is JSON text
//!
//! The delete and the inserts are separate statements. Two overlapping
//! re-analyses of the same project can interleave and leave a mixed result
//! set; the last writer's rows are not guaranteed to be the only ones left.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use alice_core::defaults::{LIST_DELIMITER, LIST_DELIMITER_SUBSTITUTE};
use alice_core::{
    AnalysisContext, AnalysisFeature, AnalysisRepository, JsonObject, JsonObjectExt,
    PersistSummary, Result, TableOfContents,
};

/// Wire format of `extracted_at`, without zone or fraction.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Length of the `YYYY-MM-DDTHH:MM:SS` prefix.
const TIMESTAMP_PREFIX_LEN: usize = 19;

/// Stores and reloads analysis results for a project.
#[derive(Clone)]
pub struct AnalysisNormalizer {
    repo: Arc<dyn AnalysisRepository>,
}

impl AnalysisNormalizer {
    pub fn new(repo: Arc<dyn AnalysisRepository>) -> Self {
        Self { repo }
    }

    /// Replace the stored analysis of `project_id` with `features` and `toc`.
    pub async fn persist(
        &self,
        project_id: i64,
        features: &[JsonObject],
        toc: Option<&JsonObject>,
    ) -> Result<PersistSummary> {
        let start = Instant::now();
        self.clear_project(project_id).await;

        let mut summary = PersistSummary::default();
        for (index, raw) in features.iter().enumerate() {
            let feature = flatten_feature(project_id, raw);
            match self.repo.insert_feature(&feature).await {
                Ok(_) => summary.features_count += 1,
                Err(e) => warn!(
                    subsystem = "api",
                    component = "normalizer",
                    op = "persist",
                    project_id,
                    index,
                    feature_code = feature.feature_code.as_deref().unwrap_or(""),
                    error = %e,
                    "Skipping feature that failed to store"
                ),
            }
        }

        if let Some(toc) = toc.filter(|t| !t.is_empty()) {
            let row = TableOfContents {
                id: None,
                project_id,
                source: toc.str_field("source").map(str::to_string),
                total_sections: toc.i32_field("total_sections"),
                toc_data: JsonValue::Object(toc.clone()).to_string(),
                created_at: None,
            };
            match self.repo.insert_toc(&row).await {
                Ok(_) => summary.toc_saved = true,
                Err(e) => warn!(
                    subsystem = "api",
                    component = "normalizer",
                    op = "persist",
                    project_id,
                    error = %e,
                    "Failed to store table of contents"
                ),
            }
        }

        info!(
            subsystem = "api",
            component = "normalizer",
            op = "persist",
            project_id,
            received = features.len(),
            features_count = summary.features_count,
            toc_saved = summary.toc_saved,
            duration_ms = start.elapsed().as_millis() as u64,
            "Analysis result stored"
        );
        Ok(summary)
    }

    /// Best-effort removal of a project's previous analysis.
    async fn clear_project(&self, project_id: i64) {
        match self.repo.delete_features_by_project(project_id).await {
            Ok(deleted) => debug!(
                subsystem = "api",
                component = "normalizer",
                op = "clear",
                project_id,
                deleted,
                "Removed previous features"
            ),
            Err(e) => warn!(
                subsystem = "api",
                component = "normalizer",
                op = "clear",
                project_id,
                error = %e,
                "Failed to remove previous features"
            ),
        }
        if let Err(e) = self.repo.delete_toc_by_project(project_id).await {
            warn!(
                subsystem = "api",
                component = "normalizer",
                op = "clear",
                project_id,
                error = %e,
                "Failed to remove previous table of contents"
            );
        }
    }

    /// Reconstruct the nested analysis context of a project.
    ///
    /// `result_toc` is `None` when no table of contents row exists. A stored
    /// row whose JSON no longer parses yields an empty object instead.
    pub async fn load_context(&self, project_id: i64) -> Result<AnalysisContext> {
        let rows = self.repo.list_features(project_id).await?;
        let toc = self.repo.get_toc(project_id).await?;

        let result_toc = toc.map(|row| {
            match serde_json::from_str::<JsonValue>(&row.toc_data) {
                Ok(JsonValue::Object(map)) => map,
                _ => {
                    warn!(
                        subsystem = "api",
                        component = "normalizer",
                        op = "load_context",
                        project_id,
                        "Stored table of contents is not a JSON object"
                    );
                    JsonObject::new()
                }
            }
        });

        debug!(
            subsystem = "api",
            component = "normalizer",
            op = "load_context",
            project_id,
            features_count = rows.len(),
            has_toc = result_toc.is_some(),
            "Loaded analysis context"
        );

        Ok(AnalysisContext {
            result_toc,
            extracted_features: rows.iter().map(feature_to_json).collect(),
        })
    }
}

/// Map one raw feature object onto its storage row.
pub fn flatten_feature(project_id: i64, raw: &JsonObject) -> AnalysisFeature {
    let text = |key: &str| raw.str_field(key).map(str::to_string);

    let writing_strategy = raw
        .object_field("writing_strategy")
        .filter(|s| !s.is_empty())
        .map(|s| JsonValue::Object(s.clone()).to_string());

    let extracted_at = raw
        .str_field("extracted_at")
        .and_then(|value| match parse_extracted_at(value) {
            Some(ts) => Some(ts),
            None => {
                warn!(
                    subsystem = "api",
                    component = "normalizer",
                    op = "persist",
                    project_id,
                    value,
                    "Ignoring malformed extraction timestamp"
                );
                None
            }
        });

    AnalysisFeature {
        id: None,
        project_id,
        feature_code: text("feature_code"),
        feature_name: text("feature_name"),
        title: text("title"),
        summary: text("summary"),
        full_content: text("full_content"),
        key_points: raw.string_list("key_points").map(|l| encode_list(&l)),
        writing_strategy,
        vector_similarity: raw.f64_field("vector_similarity"),
        chunks_from_announcement: raw.i32_field("chunks_from_announcement"),
        chunks_from_attachments: raw.i32_field("chunks_from_attachments"),
        referenced_attachments: raw
            .string_list("referenced_attachments")
            .map(|l| encode_list(&l)),
        extracted_at,
        created_at: None,
    }
}

/// Flat JSON shape of a stored feature, with lists and strategy restored.
pub fn feature_to_json(feature: &AnalysisFeature) -> JsonObject {
    let writing_strategy = feature
        .writing_strategy
        .as_deref()
        .and_then(|s| serde_json::from_str::<JsonValue>(s).ok())
        .filter(JsonValue::is_object)
        .unwrap_or_else(|| json!({}));

    let mut out = JsonObject::new();
    out.insert("result_id".into(), json!(feature.id));
    out.insert("project_idx".into(), json!(feature.project_id));
    out.insert("feature_code".into(), json!(feature.feature_code));
    out.insert("feature_name".into(), json!(feature.feature_name));
    out.insert("title".into(), json!(feature.title));
    out.insert("summary".into(), json!(feature.summary));
    out.insert("full_content".into(), json!(feature.full_content));
    out.insert(
        "key_points".into(),
        json!(decode_list(feature.key_points.as_deref())),
    );
    out.insert("writing_strategy".into(), writing_strategy);
    out.insert("vector_similarity".into(), json!(feature.vector_similarity));
    out.insert(
        "chunks_from_announcement".into(),
        json!(feature.chunks_from_announcement),
    );
    out.insert(
        "chunks_from_attachments".into(),
        json!(feature.chunks_from_attachments),
    );
    out.insert(
        "referenced_attachments".into(),
        json!(decode_list(feature.referenced_attachments.as_deref())),
    );
    if let Some(ts) = feature.extracted_at {
        out.insert(
            "extracted_at".into(),
            json!(ts.format(TIMESTAMP_FORMAT).to_string()),
        );
    }
    out
}

/// Join list elements for storage.
///
/// A literal delimiter inside an element is replaced by its fullwidth
/// look-alike so the element count survives the round-trip.
pub fn encode_list(items: &[String]) -> String {
    let mut encoded = Vec::with_capacity(items.len());
    for item in items {
        if item.contains(LIST_DELIMITER) {
            warn!(
                subsystem = "api",
                component = "normalizer",
                op = "encode_list",
                element = %item,
                "List element contains the delimiter, substituting"
            );
            let substitute = LIST_DELIMITER_SUBSTITUTE.to_string();
            encoded.push(item.replace(LIST_DELIMITER, &substitute));
        } else {
            encoded.push(item.clone());
        }
    }
    encoded.join(LIST_DELIMITER.to_string().as_str())
}

/// Split a stored list. Absent or empty text is an empty list.
pub fn decode_list(stored: Option<&str>) -> Vec<String> {
    match stored {
        None | Some("") => Vec::new(),
        Some(s) => s.split(LIST_DELIMITER).map(str::to_string).collect(),
    }
}

/// Parse the `YYYY-MM-DDTHH:MM:SS` prefix of a timestamp; zone and
/// fractional seconds are ignored.
pub fn parse_extracted_at(value: &str) -> Option<NaiveDateTime> {
    let prefix = value.get(..TIMESTAMP_PREFIX_LEN)?;
    NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT).ok()
}
