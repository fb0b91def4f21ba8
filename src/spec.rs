//! Declarative field-specification tables
//!
//! A [`SpecTable`] is authored once per target site and form version, either
//! in Rust (see [`crate::tables`]) or as JSON, and is immutable at run time.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::document::collapse_whitespace;
use crate::error::{ExtractError, Result};

/// Two-digit years at or below this are read as 20xx, above as 19xx
const TWO_DIGIT_YEAR_PIVOT: u32 = 25;

/// One named field and the ordered strategies that locate it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub strategies: Vec<LocatorStrategy>,
    /// Applied in order to the first successful strategy's value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub postprocess: Vec<Transform>,
    /// Value recorded when every strategy fails
    #[serde(default)]
    pub default: String,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategies: Vec::new(),
            postprocess: Vec::new(),
            default: String::new(),
        }
    }

    pub fn strategy(mut self, strategy: LocatorStrategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn postprocess(mut self, transform: Transform) -> Self {
        self.postprocess.push(transform);
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = default.into();
        self
    }

    /// Run the postprocess pipeline over a raw value
    pub fn apply_postprocess(&self, raw: &str) -> String {
        self.postprocess
            .iter()
            .fold(raw.to_string(), |value, t| t.apply(&value))
    }
}

/// A technique for finding a field's value in a document snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocatorStrategy {
    /// CSS selector into the tree, optionally restricted to elements whose
    /// text contains `contains`, read through `accessor`
    #[serde(rename = "structural")]
    ByStructuralPath {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contains: Option<String>,
        #[serde(default)]
        accessor: Accessor,
    },
    /// Free-text label matched against visible text nodes
    #[serde(rename = "label_scan")]
    ByLabelScan { label: String },
    /// Line-by-line scan of the rendered text against known labels
    #[serde(rename = "whole_text")]
    ByWholeTextFallback {
        labels: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<String>,
    },
    /// Regex with one capture group over the rendered text
    #[serde(rename = "pattern")]
    ByPattern {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<String>,
    },
    /// Yes/no flag over the rendered text (or `scope`): `yes` when every
    /// `require` phrase is present and no `exclude` phrase is. Fails when
    /// the scope element is absent.
    #[serde(rename = "presence")]
    ByPresence {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        require: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<String>,
        #[serde(default = "default_yes")]
        yes: String,
        #[serde(default = "default_no")]
        no: String,
    },
}

fn default_yes() -> String {
    "Yes".to_string()
}

fn default_no() -> String {
    "No".to_string()
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl LocatorStrategy {
    pub fn structural(selector: impl Into<String>, accessor: Accessor) -> Self {
        Self::ByStructuralPath {
            selector: selector.into(),
            contains: None,
            accessor,
        }
    }

    /// `selector` elements whose text contains `label`, read with the label
    /// stripped off
    pub fn containing(selector: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self::ByStructuralPath {
            selector: selector.into(),
            contains: Some(label.clone()),
            accessor: Accessor::Strip(label),
        }
    }

    /// `<strong>Label:</strong> value` idiom
    pub fn following(selector: impl Into<String>, label: impl Into<String>) -> Self {
        Self::ByStructuralPath {
            selector: selector.into(),
            contains: Some(label.into()),
            accessor: Accessor::FollowingText,
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self::ByLabelScan {
            label: label.into(),
        }
    }

    pub fn whole_text<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ByWholeTextFallback {
            labels: labels.into_iter().map(Into::into).collect(),
            scope: None,
        }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::ByPattern {
            pattern: pattern.into(),
            scope: None,
        }
    }

    /// "Yes" unless one of `exclude` shows up, "No" otherwise; narrow it
    /// with [`LocatorStrategy::within`] and [`LocatorStrategy::requiring`]
    pub fn flag_unless<I, S>(exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ByPresence {
            require: Vec::new(),
            exclude: strings(exclude),
            scope: None,
            yes: default_yes(),
            no: default_no(),
        }
    }

    /// Phrases a presence flag additionally needs before it reads "Yes".
    /// Other strategies are returned unchanged.
    pub fn requiring<I, S>(self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self {
            Self::ByPresence {
                exclude,
                scope,
                yes,
                no,
                ..
            } => Self::ByPresence {
                require: strings(phrases),
                exclude,
                scope,
                yes,
                no,
            },
            other => other,
        }
    }

    /// Restrict a text-scanning strategy to one element's rendered text.
    /// Structural and label strategies are returned unchanged.
    pub fn within(self, scope_selector: impl Into<String>) -> Self {
        match self {
            Self::ByWholeTextFallback { labels, .. } => Self::ByWholeTextFallback {
                labels,
                scope: Some(scope_selector.into()),
            },
            Self::ByPattern { pattern, .. } => Self::ByPattern {
                pattern,
                scope: Some(scope_selector.into()),
            },
            Self::ByPresence {
                require,
                exclude,
                yes,
                no,
                ..
            } => Self::ByPresence {
                require,
                exclude,
                scope: Some(scope_selector.into()),
                yes,
                no,
            },
            other => other,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::ByStructuralPath { .. } => StrategyKind::ByStructuralPath,
            Self::ByLabelScan { .. } => StrategyKind::ByLabelScan,
            Self::ByWholeTextFallback { .. } => StrategyKind::ByWholeTextFallback,
            Self::ByPattern { .. } => StrategyKind::ByPattern,
            Self::ByPresence { .. } => StrategyKind::ByPresence,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::ByStructuralPath { selector, .. } => parse_selector(selector).map(|_| ()),
            Self::ByLabelScan { label } if label.trim().is_empty() => {
                Err(ExtractError::InvalidSpec("label scan with empty label".into()))
            }
            Self::ByLabelScan { .. } => Ok(()),
            Self::ByWholeTextFallback { labels, scope } => {
                if labels.iter().all(|l| l.trim().is_empty()) {
                    return Err(ExtractError::InvalidSpec(
                        "whole-text fallback without labels".into(),
                    ));
                }
                scope.as_deref().map_or(Ok(()), |s| parse_selector(s).map(|_| ()))
            }
            Self::ByPattern { pattern, scope } => {
                let re = Regex::new(pattern).map_err(|source| ExtractError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
                if re.captures_len() < 2 {
                    return Err(ExtractError::InvalidSpec(format!(
                        "pattern {pattern:?} has no capture group"
                    )));
                }
                scope.as_deref().map_or(Ok(()), |s| parse_selector(s).map(|_| ()))
            }
            Self::ByPresence {
                require,
                exclude,
                scope,
                ..
            } => {
                if scope.is_none() && require.is_empty() && exclude.is_empty() {
                    return Err(ExtractError::InvalidSpec(
                        "presence flag without phrases or scope".into(),
                    ));
                }
                scope.as_deref().map_or(Ok(()), |s| parse_selector(s).map(|_| ()))
            }
        }
    }
}

/// Strategy variant without its parameters, used for provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    ByStructuralPath,
    ByLabelScan,
    ByWholeTextFallback,
    ByPattern,
    ByPresence,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ByStructuralPath => "structural",
            Self::ByLabelScan => "label_scan",
            Self::ByWholeTextFallback => "whole_text",
            Self::ByPattern => "pattern",
            Self::ByPresence => "presence",
        };
        f.write_str(name)
    }
}

/// What to read from a matched element.
///
/// Written as a string in tables: `text`, `html`, `attr:NAME`,
/// `following_text`, `strip:LABEL`, `parent.X`, `children.N.X`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Accessor {
    #[default]
    Text,
    Html,
    Attr(String),
    /// Text nodes directly after the element, up to the next element
    FollowingText,
    /// Element text with a label removed
    Strip(String),
    Parent(Box<Accessor>),
    Child(usize, Box<Accessor>),
}

impl FromStr for Accessor {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ExtractError::InvalidSpec(format!("unknown accessor {s:?}"));

        if let Some(rest) = s.strip_prefix("parent.") {
            return Ok(Self::Parent(Box::new(rest.parse()?)));
        }
        if let Some(rest) = s.strip_prefix("children.") {
            let (index, inner) = rest.split_once('.').ok_or_else(invalid)?;
            let index = index.parse().map_err(|_| invalid())?;
            return Ok(Self::Child(index, Box::new(inner.parse()?)));
        }
        if let Some(name) = s.strip_prefix("attr:") {
            return Ok(Self::Attr(name.to_string()));
        }
        if let Some(label) = s.strip_prefix("strip:") {
            return Ok(Self::Strip(label.to_string()));
        }
        match s {
            "" | "text" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            "following_text" => Ok(Self::FollowingText),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Accessor {
    type Error = ExtractError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Accessor> for String {
    fn from(a: Accessor) -> Self {
        a.to_string()
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Html => f.write_str("html"),
            Self::Attr(name) => write!(f, "attr:{name}"),
            Self::FollowingText => f.write_str("following_text"),
            Self::Strip(label) => write!(f, "strip:{label}"),
            Self::Parent(inner) => write!(f, "parent.{inner}"),
            Self::Child(index, inner) => write!(f, "children.{index}.{inner}"),
        }
    }
}

/// A pure string-to-string postprocessing step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Trim,
    CollapseWhitespace,
    StripPrefix(String),
    Lowercase,
    Uppercase,
    FirstLine,
    /// `m/d/yy` to `mm/dd/yyyy`
    NormalizeDate,
    #[serde(skip)]
    Custom(fn(&str) -> String),
}

impl Transform {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Trim => value.trim().to_string(),
            Self::CollapseWhitespace => collapse_whitespace(value),
            Self::StripPrefix(prefix) => {
                let trimmed = value.trim_start();
                trimmed
                    .strip_prefix(prefix.as_str())
                    .unwrap_or(trimmed)
                    .trim()
                    .to_string()
            }
            Self::Lowercase => value.to_lowercase(),
            Self::Uppercase => value.to_uppercase(),
            Self::FirstLine => value.lines().next().unwrap_or("").trim().to_string(),
            Self::NormalizeDate => normalize_date(value),
            Self::Custom(f) => f(value),
        }
    }
}

/// Expand `m/d/yy` dates to `mm/dd/yyyy`. Anything that is not three
/// numeric slash-separated parts is returned unchanged.
pub fn normalize_date(value: &str) -> String {
    let trimmed = value.trim();
    let parts: Vec<&str> = trimmed.split('/').collect();
    let numeric = |p: &&str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    if parts.len() != 3 || !parts.iter().all(numeric) {
        return value.to_string();
    }

    let year = match parts[2].len() {
        2 => match parts[2].parse::<u32>() {
            Ok(y) if y <= TWO_DIGIT_YEAR_PIVOT => format!("20{}", parts[2]),
            Ok(_) => format!("19{}", parts[2]),
            Err(_) => return value.to_string(),
        },
        _ => parts[2].to_string(),
    };

    format!("{:0>2}/{:0>2}/{}", parts[0], parts[1], year)
}

/// Yes/no column computed from the other fields of the same record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedField {
    pub name: String,
    /// `yes` when any of these fields was located on the page
    pub any_found: Vec<String>,
    #[serde(default = "default_yes")]
    pub yes: String,
    #[serde(default = "default_no")]
    pub no: String,
}

impl DerivedField {
    pub fn any_found<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            any_found: strings(fields),
            yes: default_yes(),
            no: default_no(),
        }
    }
}

/// The immutable per-site extraction table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecTable {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    /// Any of these selectors marks the results as rendered
    #[serde(default)]
    pub ready_markers: Vec<String>,
    /// Case-insensitive phrases meaning the portal found no member
    #[serde(default)]
    pub no_result_phrases: Vec<String>,
    /// Preferred output column order; defaults to field order
    #[serde(default)]
    pub column_order: Vec<String>,
    /// When set, batch rows carry a per-record status in this column and
    /// failed lookups are still written with every field at its default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_column: Option<String>,
    /// Computed after every field has been extracted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<DerivedField>,
}

impl SpecTable {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
            ready_markers: Vec::new(),
            no_result_phrases: Vec::new(),
            column_order: Vec::new(),
            status_column: None,
            derived: Vec::new(),
        }
    }

    pub fn ready_when<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ready_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn no_results_when<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.no_result_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_column_order<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_order = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_derived(mut self, field: DerivedField) -> Self {
        self.derived.push(field);
        self
    }

    pub fn with_status_column(mut self, column: impl Into<String>) -> Self {
        self.status_column = Some(column.into());
        self
    }

    /// Parse and validate a table from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the table can be evaluated: at least one field, unique names,
    /// every selector and pattern well-formed.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(ExtractError::InvalidSpec(format!(
                "table {:?} has no fields",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ExtractError::InvalidSpec(format!(
                    "duplicate field {:?}",
                    field.name
                )));
            }
            if field.strategies.is_empty() {
                return Err(ExtractError::InvalidSpec(format!(
                    "field {:?} has no strategies",
                    field.name
                )));
            }
            for strategy in &field.strategies {
                strategy.validate()?;
            }
        }

        for derived in &self.derived {
            if !seen.insert(derived.name.as_str()) {
                return Err(ExtractError::InvalidSpec(format!(
                    "duplicate field {:?}",
                    derived.name
                )));
            }
            if let Some(unknown) = derived
                .any_found
                .iter()
                .find(|n| !self.fields.iter().any(|f| &f.name == *n))
            {
                return Err(ExtractError::InvalidSpec(format!(
                    "derived field {:?} refers to unknown field {unknown:?}",
                    derived.name
                )));
            }
        }

        for marker in &self.ready_markers {
            parse_selector(marker)?;
        }
        Ok(())
    }

    /// Column order hint for sinks
    pub fn columns(&self) -> Vec<String> {
        if self.column_order.is_empty() {
            self.fields
                .iter()
                .map(|f| &f.name)
                .chain(self.derived.iter().map(|d| &d.name))
                .cloned()
                .collect()
        } else {
            self.column_order.clone()
        }
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessor_syntax() {
        let cases = [
            ("text", Accessor::Text),
            ("html", Accessor::Html),
            ("attr:href", Accessor::Attr("href".into())),
            ("following_text", Accessor::FollowingText),
            ("strip:NPI:", Accessor::Strip("NPI:".into())),
            (
                "parent.attr:data-id",
                Accessor::Parent(Box::new(Accessor::Attr("data-id".into()))),
            ),
            (
                "children.1.text",
                Accessor::Child(1, Box::new(Accessor::Text)),
            ),
        ];
        for (input, expected) in cases {
            let parsed: Accessor = input.parse().unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(parsed.to_string(), input);
        }

        assert!("children.x.text".parse::<Accessor>().is_err());
        assert!("bogus".parse::<Accessor>().is_err());
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("1/5/45"), "01/05/1945");
        assert_eq!(normalize_date("3/7/21"), "03/07/2021");
        assert_eq!(normalize_date("12/31/25"), "12/31/2025");
        assert_eq!(normalize_date("04/09/1988"), "04/09/1988");
        assert_eq!(normalize_date("not a date"), "not a date");
        assert_eq!(normalize_date("1/2"), "1/2");
    }

    #[test]
    fn test_transforms() {
        assert_eq!(
            Transform::StripPrefix("DOB:".into()).apply("  DOB: 01/02/1950 "),
            "01/02/1950"
        );
        assert_eq!(
            Transform::CollapseWhitespace.apply(" JOHN \n  Q   DOE "),
            "JOHN Q DOE"
        );
        assert_eq!(Transform::FirstLine.apply("Gold Plus\nPPO"), "Gold Plus");
        assert_eq!(Transform::Custom(|s| s.replace('-', "")).apply("1-2-3"), "123");

        let spec = FieldSpec::new("Sex")
            .postprocess(Transform::Trim)
            .postprocess(Transform::Uppercase);
        assert_eq!(spec.apply_postprocess(" m "), "M");
    }

    #[test]
    fn test_table_from_json() {
        let json = r##"{
            "name": "noridian-basic",
            "ready_markers": ["div.col-4 strong"],
            "fields": [
                {
                    "name": "NPI",
                    "default": "Not Available",
                    "strategies": [
                        {"kind": "structural", "selector": "strong", "contains": "NPI:", "accessor": "following_text"},
                        {"kind": "label_scan", "label": "NPI:"}
                    ],
                    "postprocess": ["trim", {"strip_prefix": "#"}]
                },
                {
                    "name": "Part A Effective Date",
                    "strategies": [
                        {"kind": "pattern", "pattern": "Part A[\\s\\S]*?Effective Date:\\s*([0-9/]+)"}
                    ]
                }
            ]
        }"##;

        let table = SpecTable::from_json(json).unwrap();
        assert_eq!(table.fields.len(), 2);
        assert_eq!(table.fields[0].default, "Not Available");
        assert_eq!(table.fields[0].strategies[1], LocatorStrategy::label("NPI:"));
        assert_eq!(table.fields[0].apply_postprocess(" #123 "), "123");
        assert_eq!(table.columns(), vec!["NPI", "Part A Effective Date"]);
    }

    #[test]
    fn test_table_validation_errors() {
        let empty = SpecTable::new("empty", vec![]);
        assert!(matches!(empty.validate(), Err(ExtractError::InvalidSpec(_))));

        let dup = SpecTable::new(
            "dup",
            vec![
                FieldSpec::new("NPI").strategy(LocatorStrategy::label("NPI:")),
                FieldSpec::new("NPI").strategy(LocatorStrategy::label("NPI #:")),
            ],
        );
        assert!(matches!(dup.validate(), Err(ExtractError::InvalidSpec(_))));

        let bad_selector = SpecTable::new(
            "bad",
            vec![FieldSpec::new("NPI").strategy(LocatorStrategy::structural("[[", Accessor::Text))],
        );
        assert!(matches!(
            bad_selector.validate(),
            Err(ExtractError::InvalidSelector { .. })
        ));

        let no_group = SpecTable::new(
            "bad",
            vec![FieldSpec::new("NPI").strategy(LocatorStrategy::pattern("NPI: \\d+"))],
        );
        assert!(matches!(no_group.validate(), Err(ExtractError::InvalidSpec(_))));

        let bad_regex = SpecTable::new(
            "bad",
            vec![FieldSpec::new("NPI").strategy(LocatorStrategy::pattern("NPI: (\\d+"))],
        );
        assert!(matches!(
            bad_regex.validate(),
            Err(ExtractError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_table_json_round_trip_keeps_strategies() {
        let table = SpecTable::new(
            "t",
            vec![FieldSpec::new("Plan Name")
                .strategy(LocatorStrategy::whole_text(["Plan Name:"]).within("#hmo"))
                .default_value("Not Available")],
        );
        let back = SpecTable::from_json(&table.to_json().unwrap()).unwrap();
        assert_eq!(back.fields[0].strategies, table.fields[0].strategies);
    }

    #[test]
    fn test_presence_and_derived_from_json() {
        let json = r##"{
            "name": "flags",
            "fields": [
                {"name": "MSP_Exists", "strategies": [
                    {"kind": "presence", "require": ["MSP"], "exclude": ["No MSP data"], "scope": "#msp"}
                ]},
                {"name": "plan", "strategies": [{"kind": "label_scan", "label": "Plan:"}]}
            ],
            "derived": [{"name": "is_active", "any_found": ["plan"], "yes": "Y"}]
        }"##;
        let table = SpecTable::from_json(json).unwrap();
        assert_eq!(
            table.fields[0].strategies[0],
            LocatorStrategy::flag_unless(["No MSP data"])
                .requiring(["MSP"])
                .within("#msp")
        );
        assert_eq!(table.fields[0].strategies[0].kind(), StrategyKind::ByPresence);
        assert_eq!(table.derived[0].yes, "Y");
        assert_eq!(table.derived[0].no, "No");
        assert_eq!(table.columns(), vec!["MSP_Exists", "plan", "is_active"]);
    }

    #[test]
    fn test_derived_validation() {
        let fields = || vec![FieldSpec::new("plan").strategy(LocatorStrategy::label("Plan:"))];

        let unknown = SpecTable::new("t", fields())
            .with_derived(DerivedField::any_found("is_active", ["group"]));
        assert!(matches!(
            unknown.validate(),
            Err(ExtractError::InvalidSpec(m)) if m.contains("group")
        ));

        let clash = SpecTable::new("t", fields())
            .with_derived(DerivedField::any_found("plan", ["plan"]));
        assert!(matches!(clash.validate(), Err(ExtractError::InvalidSpec(_))));

        let bare = SpecTable::new(
            "t",
            vec![FieldSpec::new("flag").strategy(LocatorStrategy::flag_unless(Vec::<String>::new()))],
        );
        assert!(matches!(bare.validate(), Err(ExtractError::InvalidSpec(_))));
    }
}
