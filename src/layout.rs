//! Form layout classification for the input side
//!
//! Lookup forms come in a handful of layouts. Each layout is recognised by a
//! probe and implies its own table of candidate selectors per input, mirroring
//! the fallback chains used for extraction. Nothing here fills or clicks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Document;
use crate::error::{ExtractError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormLayout {
    /// `hicn`, `lastName` and `dob` inputs
    Standard,
    MbiLookup,
    BenefitsInquiry,
    /// Any page with more than two form controls
    GenericForm,
    Unknown,
}

/// Identifying test for one layout
#[derive(Debug, Clone)]
pub enum Probe {
    AllOf(Vec<String>),
    AnyOf(Vec<String>),
    /// More than `count` elements match `selector`
    MoreThan { selector: String, count: usize },
}

impl Probe {
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::AllOf(selectors) => selectors.iter().all(|s| document.contains(s)),
            Self::AnyOf(selectors) => selectors.iter().any(|s| document.contains(s)),
            Self::MoreThan { selector, count } => document.count(selector) > *count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutProbe {
    pub layout: FormLayout,
    pub probe: Probe,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Known layouts in priority order
pub fn default_probes() -> Vec<LayoutProbe> {
    vec![
        LayoutProbe {
            layout: FormLayout::Standard,
            probe: Probe::AllOf(strings(&["#hicn", "#lastName", "#dob"])),
        },
        LayoutProbe {
            layout: FormLayout::MbiLookup,
            probe: Probe::AllOf(strings(&["#mbi"])),
        },
        LayoutProbe {
            layout: FormLayout::BenefitsInquiry,
            probe: Probe::AnyOf(strings(&[
                "input[name*=beneficiary]",
                "input[id*=beneficiary]",
                "input[placeholder*=Medicare]",
            ])),
        },
        LayoutProbe {
            layout: FormLayout::GenericForm,
            probe: Probe::MoreThan {
                selector: "input[type=text], select, textarea".to_string(),
                count: 2,
            },
        },
    ]
}

pub fn classify(document: &Document) -> FormLayout {
    classify_with(document, &default_probes())
}

/// First layout whose probe matches, in the given order
pub fn classify_with(document: &Document, probes: &[LayoutProbe]) -> FormLayout {
    let layout = probes
        .iter()
        .find(|p| p.probe.matches(document))
        .map(|p| p.layout)
        .unwrap_or(FormLayout::Unknown);
    debug!(?layout, "classified form");
    layout
}

/// Logical inputs of an eligibility lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputField {
    MedicareNumber,
    LastName,
    DateOfBirth,
    FromDate,
    ToDate,
}

/// Ordered candidate selectors for one input
#[derive(Debug, Clone)]
pub struct InputSpec {
    pub field: InputField,
    pub candidates: Vec<String>,
}

impl InputSpec {
    fn new(field: InputField, candidates: &[&str]) -> Self {
        Self {
            field,
            candidates: strings(candidates),
        }
    }
}

fn date_of_service_inputs() -> [InputSpec; 2] {
    [
        InputSpec::new(
            InputField::FromDate,
            &[
                "input#fromDate",
                "input[name=fromDate]",
                "input[id*=fromDate]",
                "input[name*=fromDate]",
                "input[placeholder*='From Date']",
            ],
        ),
        InputSpec::new(
            InputField::ToDate,
            &[
                "input#toDate",
                "input[name=toDate]",
                "input[id*=toDate]",
                "input[name*=toDate]",
                "input[placeholder*='To Date']",
            ],
        ),
    ]
}

/// Input table implied by a layout; empty for [`FormLayout::Unknown`]
pub fn input_table(layout: FormLayout) -> Vec<InputSpec> {
    let mut table = match layout {
        FormLayout::Standard => vec![
            InputSpec::new(InputField::MedicareNumber, &["#hicn"]),
            InputSpec::new(InputField::LastName, &["#lastName"]),
            InputSpec::new(InputField::DateOfBirth, &["#dob"]),
        ],
        FormLayout::MbiLookup => vec![
            InputSpec::new(InputField::MedicareNumber, &["#mbi", "input[name=mbi]"]),
            InputSpec::new(
                InputField::LastName,
                &["#lastName", "input[name*=lastName]", "input[name*=lastname]"],
            ),
            InputSpec::new(InputField::DateOfBirth, &["#dob", "input[name*=dob]"]),
        ],
        FormLayout::BenefitsInquiry | FormLayout::GenericForm => vec![
            InputSpec::new(
                InputField::MedicareNumber,
                &[
                    "input[id*=hicn]",
                    "input[name*=hicn]",
                    "input[placeholder*=Medicare]",
                    "input[id*=mbi]",
                    "input[name*=mbi]",
                    "input[type=text]",
                ],
            ),
            InputSpec::new(
                InputField::LastName,
                &[
                    "input[id*=lastName]",
                    "input[name*=lastName]",
                    "input[placeholder*='Last Name']",
                    "input[id*=lastname]",
                    "input[name*=lastname]",
                ],
            ),
            InputSpec::new(
                InputField::DateOfBirth,
                &[
                    "input[id*=dob]",
                    "input[name*=dob]",
                    "input[placeholder*='Date of Birth']",
                    "input[id*=birth]",
                    "input[name*=birth]",
                ],
            ),
        ],
        FormLayout::Unknown => return Vec::new(),
    };
    table.extend(date_of_service_inputs());
    table
}

/// An input and the first candidate selector present on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub field: InputField,
    pub selector: Option<String>,
}

/// What the navigator should fill on the current page
#[derive(Debug, Clone)]
pub struct InputPlan {
    pub layout: FormLayout,
    pub inputs: Vec<ResolvedInput>,
}

impl InputPlan {
    pub fn selector(&self, field: InputField) -> Option<&str> {
        self.inputs
            .iter()
            .find(|i| i.field == field)
            .and_then(|i| i.selector.as_deref())
    }

    pub fn unresolved(&self) -> Vec<InputField> {
        self.inputs
            .iter()
            .filter(|i| i.selector.is_none())
            .map(|i| i.field)
            .collect()
    }
}

/// Resolve each input of `layout` against the page
pub fn resolve_inputs(document: &Document, layout: FormLayout) -> Result<InputPlan> {
    if layout == FormLayout::Unknown {
        return Err(ExtractError::LayoutUnrecognized);
    }

    let inputs = input_table(layout)
        .into_iter()
        .map(|spec| ResolvedInput {
            field: spec.field,
            selector: spec.candidates.into_iter().find(|c| document.contains(c)),
        })
        .collect();

    Ok(InputPlan { layout, inputs })
}

/// Classify, then resolve
pub fn plan_inputs(document: &Document) -> Result<InputPlan> {
    resolve_inputs(document, classify(document))
}
