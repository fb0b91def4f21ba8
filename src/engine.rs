//! The field extraction engine
//!
//! Each field's strategies are tried in order; the first one yielding a
//! non-empty value wins and is recorded as the value's provenance. A field
//! nothing matches degrades to its default instead of failing the record.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use crate::config::ReadinessConfig;
use crate::document::Document;
use crate::error::{ExtractError, Result};
use crate::extractors::evaluate;
use crate::source::{wait_until_ready, DocumentSource};
use crate::spec::{DerivedField, FieldSpec, SpecTable, StrategyKind};

/// Output column holding the extraction time
pub const TIMESTAMP_COLUMN: &str = "Extraction Timestamp";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a field's value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Provenance {
    /// Strategy at `index` in the field's list produced the value
    Found { index: usize, kind: StrategyKind },
    /// Every strategy failed; the value is the field's default
    NotFound,
    /// Computed from other fields of the same record
    Derived,
}

impl Provenance {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. } | Self::Derived)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedField {
    pub name: String,
    pub value: String,
    pub provenance: Provenance,
}

/// The fields extracted from one document snapshot. Immutable once built;
/// a correction means extracting again.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRecord {
    fields: Vec<ExtractedField>,
    context: Vec<(String, String)>,
    extracted_at: DateTime<Local>,
}

impl ExtractionRecord {
    pub fn fields(&self) -> &[ExtractedField] {
        &self.fields
    }

    /// Caller-supplied columns, e.g. the input row the lookup was made for
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    pub fn extracted_at(&self) -> DateTime<Local> {
        self.extracted_at
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.value.as_str())
    }

    pub fn provenance(&self, name: &str) -> Option<Provenance> {
        self.field(name).map(|f| f.provenance)
    }

    fn field(&self, name: &str) -> Option<&ExtractedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn found_count(&self) -> usize {
        self.fields.iter().filter(|f| f.provenance.is_found()).count()
    }

    /// Names of fields that fell back to their default
    pub fn missing(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| !f.provenance.is_found())
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.fields.iter().all(|f| f.provenance.is_found())
    }

    /// Add a trailing context column, e.g. a batch status
    pub fn annotate(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((column.into(), value.into()));
        self
    }

    /// Flat `(column, value)` pairs: context first, then fields in table
    /// order, then the timestamp
    pub fn to_row(&self) -> Vec<(String, String)> {
        let mut row = self.context.clone();
        row.extend(self.fields.iter().map(|f| (f.name.clone(), f.value.clone())));
        row.push((
            TIMESTAMP_COLUMN.to_string(),
            self.extracted_at.format(TIMESTAMP_FORMAT).to_string(),
        ));
        row
    }
}

/// Extract every field of `specs` from `document`.
///
/// Only fails when the document itself is unusable or `specs` is empty;
/// individual fields never fail.
pub fn extract(document: &Document, specs: &[FieldSpec]) -> Result<ExtractionRecord> {
    extract_with_context(document, specs, Vec::new())
}

pub fn extract_with_context(
    document: &Document,
    specs: &[FieldSpec],
    context: Vec<(String, String)>,
) -> Result<ExtractionRecord> {
    document.ensure_valid()?;
    if specs.is_empty() {
        return Err(ExtractError::InvalidSpec("no fields to extract".into()));
    }

    let fields = specs.iter().map(|spec| extract_field(document, spec)).collect();

    Ok(ExtractionRecord {
        fields,
        context,
        extracted_at: Local::now(),
    })
}

/// A record with every field at its default, for lookups that produced no
/// usable document
pub fn fallback_record(table: &SpecTable, context: Vec<(String, String)>) -> ExtractionRecord {
    let mut fields: Vec<ExtractedField> = table
        .fields
        .iter()
        .map(|spec| ExtractedField {
            name: spec.name.clone(),
            value: spec.default.clone(),
            provenance: Provenance::NotFound,
        })
        .collect();
    append_derived(&mut fields, &table.derived);

    ExtractionRecord {
        fields,
        context,
        extracted_at: Local::now(),
    }
}

fn append_derived(fields: &mut Vec<ExtractedField>, derived: &[DerivedField]) {
    for d in derived {
        let any = fields
            .iter()
            .any(|f| f.provenance.is_found() && d.any_found.contains(&f.name));
        fields.push(ExtractedField {
            name: d.name.clone(),
            value: if any { d.yes.clone() } else { d.no.clone() },
            provenance: Provenance::Derived,
        });
    }
}

fn extract_field(document: &Document, spec: &FieldSpec) -> ExtractedField {
    for (index, strategy) in spec.strategies.iter().enumerate() {
        if let Some(raw) = evaluate(document, strategy) {
            let kind = strategy.kind();
            debug!(field = %spec.name, index, strategy = %kind, "field matched");
            return ExtractedField {
                name: spec.name.clone(),
                value: spec.apply_postprocess(&raw),
                provenance: Provenance::Found { index, kind },
            };
        }
        debug!(field = %spec.name, index, strategy = %strategy.kind(), "strategy missed");
    }

    debug!(field = %spec.name, default = %spec.default, "field not found");
    ExtractedField {
        name: spec.name.clone(),
        value: spec.default.clone(),
        provenance: Provenance::NotFound,
    }
}

/// Extract with a full table, honouring its no-result phrases
pub fn extract_table(
    document: &Document,
    table: &SpecTable,
    context: Vec<(String, String)>,
) -> Result<ExtractionRecord> {
    document.ensure_valid()?;
    if let Some(phrase) = no_result_phrase(document, &table.no_result_phrases) {
        return Err(ExtractError::NoResults { phrase });
    }
    let mut record = extract_with_context(document, &table.fields, context)?;
    append_derived(&mut record.fields, &table.derived);
    Ok(record)
}

/// First configured phrase present in the rendered text, ignoring case
pub fn no_result_phrase(document: &Document, phrases: &[String]) -> Option<String> {
    if phrases.is_empty() {
        return None;
    }
    let text = document.rendered_text().to_lowercase();
    phrases
        .iter()
        .find(|p| !p.is_empty() && text.contains(&p.to_lowercase()))
        .cloned()
}

/// Wait for the table's readiness markers, then extract
pub fn extract_when_ready<S>(
    source: &S,
    table: &SpecTable,
    config: &ReadinessConfig,
    context: Vec<(String, String)>,
) -> Result<ExtractionRecord>
where
    S: DocumentSource + ?Sized,
{
    let document = wait_until_ready(source, &table.ready_markers, config)?;
    extract_table(&document, table, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;
    use crate::spec::{Accessor, LocatorStrategy, Transform};
    use std::time::Duration;

    fn medicare_spec() -> FieldSpec {
        FieldSpec::new("Medicare Number")
            .strategy(LocatorStrategy::structural(
                "span.medicare-number",
                Accessor::Text,
            ))
            .strategy(LocatorStrategy::label("Medicare Number:"))
            .default_value("Not Available")
    }

    #[test]
    fn test_label_scan_after_structural_miss() {
        let doc = Document::parse("<div><p>Medicare Number: 123456789A</p></div>");
        let record = extract(&doc, &[medicare_spec()]).unwrap();

        assert_eq!(record.get("Medicare Number"), Some("123456789A"));
        assert_eq!(
            record.provenance("Medicare Number"),
            Some(Provenance::Found {
                index: 1,
                kind: StrategyKind::ByLabelScan
            })
        );
    }

    #[test]
    fn test_first_strategy_wins_when_both_match() {
        let doc = Document::parse(
            r#"<span class="medicare-number">1EG4TE5MK73</span><p>Medicare Number: 999</p>"#,
        );
        let record = extract(&doc, &[medicare_spec()]).unwrap();
        assert_eq!(record.get("Medicare Number"), Some("1EG4TE5MK73"));
        assert_eq!(
            record.provenance("Medicare Number"),
            Some(Provenance::Found {
                index: 0,
                kind: StrategyKind::ByStructuralPath
            })
        );
    }

    #[test]
    fn test_missing_field_uses_default() {
        let doc = Document::parse("<p>Beneficiary: JANE DOE</p>");
        let specs = [
            FieldSpec::new("Beneficiary").strategy(LocatorStrategy::label("Beneficiary:")),
            FieldSpec::new("NPI")
                .strategy(LocatorStrategy::following("strong", "NPI:"))
                .strategy(LocatorStrategy::label("NPI:"))
                .strategy(LocatorStrategy::whole_text(["NPI:"]))
                .default_value("Not Available"),
        ];
        let record = extract(&doc, &specs).unwrap();

        assert_eq!(record.get("Beneficiary"), Some("JANE DOE"));
        assert_eq!(record.get("NPI"), Some("Not Available"));
        assert_eq!(record.provenance("NPI"), Some(Provenance::NotFound));
        assert_eq!(record.missing(), vec!["NPI"]);
        assert!(!record.is_complete());
        assert_eq!(record.found_count(), 1);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let doc = Document::parse(
            r#"<div class="col-4"><strong>Beneficiary:</strong> JOHN   DOE<br><strong>Sex:</strong> M</div>"#,
        );
        let specs = [
            FieldSpec::new("Beneficiary")
                .strategy(LocatorStrategy::following("strong", "Beneficiary:"))
                .postprocess(Transform::CollapseWhitespace),
            FieldSpec::new("Sex").strategy(LocatorStrategy::label("Sex:")),
            FieldSpec::new("DOB").strategy(LocatorStrategy::label("DOB:")),
        ];

        let first = extract(&doc, &specs).unwrap();
        let second = extract(&doc, &specs).unwrap();
        assert_eq!(first.fields(), second.fields());
        assert_eq!(first.get("Beneficiary"), Some("JOHN DOE"));
    }

    #[test]
    fn test_postprocess_applies_to_found_values_only() {
        let doc = Document::parse("<p>DOB: 1/5/45</p>");
        let specs = [
            FieldSpec::new("DOB")
                .strategy(LocatorStrategy::label("DOB:"))
                .postprocess(Transform::NormalizeDate),
            FieldSpec::new("Date of Death")
                .strategy(LocatorStrategy::label("Date of Death:"))
                .postprocess(Transform::Uppercase)
                .default_value("n/a"),
        ];
        let record = extract(&doc, &specs).unwrap();
        assert_eq!(record.get("DOB"), Some("01/05/1945"));
        assert_eq!(record.get("Date of Death"), Some("n/a"));
    }

    #[test]
    fn test_invalid_inputs() {
        let doc = Document::parse("");
        let err = extract(&doc, &[medicare_spec()]).unwrap_err();
        assert!(matches!(err, ExtractError::DocumentUnavailable { .. }));

        let doc = Document::parse("<p>x</p>");
        assert!(matches!(
            extract(&doc, &[]),
            Err(ExtractError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_row_layout() {
        let doc = Document::parse("<p>NPI: 1234567893</p>");
        let record = extract_with_context(
            &doc,
            &[FieldSpec::new("NPI").strategy(LocatorStrategy::label("NPI:"))],
            vec![("Original Patient Name".into(), "DOE, JOHN".into())],
        )
        .unwrap();

        let row = record.to_row();
        let columns: Vec<&str> = row.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(columns, vec!["Original Patient Name", "NPI", TIMESTAMP_COLUMN]);
        assert_eq!(row[2].1.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_fallback_record_is_all_defaults() {
        let table = SpecTable::new("t", vec![medicare_spec()])
            .with_derived(DerivedField::any_found("active", ["Medicare Number"]));
        let record = fallback_record(&table, vec![("id".into(), "7".into())])
            .annotate("processing_status", "Error");
        assert_eq!(record.get("Medicare Number"), Some("Not Available"));
        assert_eq!(record.found_count(), 0);
        let columns: Vec<String> = record.to_row().into_iter().map(|(c, _)| c).collect();
        assert_eq!(
            columns,
            vec!["id", "processing_status", "Medicare Number", "active", TIMESTAMP_COLUMN]
        );
        assert_eq!(record.get("active"), Some("No"));
    }

    #[test]
    fn test_derived_field_follows_found_fields() {
        let table = SpecTable::new(
            "t",
            vec![
                medicare_spec(),
                FieldSpec::new("NPI")
                    .strategy(LocatorStrategy::label("NPI:"))
                    .default_value("Not Found"),
            ],
        )
        .with_derived(DerivedField::any_found("active", ["Medicare Number", "NPI"]));

        let doc = Document::parse("<p>NPI: 1234567893</p>");
        let record = extract_table(&doc, &table, Vec::new()).unwrap();
        assert_eq!(record.get("active"), Some("Yes"));
        assert_eq!(record.provenance("active"), Some(Provenance::Derived));
        assert_eq!(record.missing(), vec!["Medicare Number"]);

        let doc = Document::parse("<p>nothing here</p>");
        let record = extract_table(&doc, &table, Vec::new()).unwrap();
        assert_eq!(record.get("active"), Some("No"));
    }

    #[test]
    fn test_no_result_phrase() {
        let table = SpecTable::new(
            "uhc",
            vec![FieldSpec::new("group").strategy(LocatorStrategy::label("Group:"))],
        )
        .no_results_when(["No member found", "no results"]);

        let doc = Document::parse("<div class='alert'>NO MEMBER FOUND for this search</div>");
        match extract_table(&doc, &table, Vec::new()) {
            Err(ExtractError::NoResults { phrase }) => assert_eq!(phrase, "No member found"),
            other => panic!("unexpected {other:?}"),
        }

        let doc = Document::parse("<p>Group: 0755123</p>");
        let record = extract_table(&doc, &table, Vec::new()).unwrap();
        assert_eq!(record.get("group"), Some("0755123"));
    }

    #[test]
    fn test_extract_when_ready_times_out() {
        let table = SpecTable::new(
            "t",
            vec![FieldSpec::new("NPI").strategy(LocatorStrategy::label("NPI:"))],
        )
        .ready_when(["#results"]);
        let config = ReadinessConfig::default()
            .with_timeout(Duration::from_millis(30))
            .with_poll_interval(Duration::from_millis(5));

        let pending = StaticSource::new("<p>NPI: 1</p>");
        assert!(matches!(
            extract_when_ready(&pending, &table, &config, Vec::new()),
            Err(ExtractError::DocumentUnavailable { .. })
        ));

        let ready = StaticSource::new(r#"<div id="results"><p>NPI: 1</p></div>"#);
        let record = extract_when_ready(&ready, &table, &config, Vec::new()).unwrap();
        assert_eq!(record.get("NPI"), Some("1"));
    }
}
