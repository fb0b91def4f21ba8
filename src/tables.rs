//! Built-in spec tables for the supported eligibility portals

use crate::engine::TIMESTAMP_COLUMN;
use crate::error::{ExtractError, Result};
use crate::spec::{Accessor, DerivedField, FieldSpec, LocatorStrategy, SpecTable, Transform};

pub const NOT_AVAILABLE: &str = "Not Available";
pub const NOT_FOUND: &str = "Not Found";

/// Input-row columns a caller passes as record context (`BatchItem::with_context`);
/// they lead the Noridian column order and stay empty when no context is given
pub const CONTEXT_COLUMNS: &[&str] = &[
    "Original Patient Name",
    "Original Insurance ID",
    "Original Date of Birth",
    "Original Admission Date",
];

/// Labelled result row: `<strong>Label:</strong> value`, a `div` per row,
/// a bare text node, and finally the rendered page line by line
fn labelled(name: &str, labels: &[&str]) -> FieldSpec {
    let mut spec = FieldSpec::new(name);
    for label in labels {
        spec = spec.strategy(LocatorStrategy::following("strong", *label));
    }
    for label in labels {
        spec = spec.strategy(LocatorStrategy::containing("div", *label));
    }
    for label in labels {
        spec = spec.strategy(LocatorStrategy::label(*label));
    }
    spec.strategy(LocatorStrategy::whole_text(labels.iter().copied()))
}

/// Field inside a result tab pane (`#hmo`, `#msp`)
fn tab_field(name: &str, pane: &str, label: &str) -> FieldSpec {
    FieldSpec::new(name)
        .strategy(LocatorStrategy::whole_text([label]).within(pane))
        .default_value(NOT_AVAILABLE)
}

/// Noridian Medicare eligibility results
pub fn noridian_eligibility() -> SpecTable {
    let mut fields = vec![
        labelled("Beneficiary", &["Beneficiary:"]).postprocess(Transform::CollapseWhitespace),
        labelled("Sex", &["Sex:", "Gender:"]),
        labelled("DOB", &["DOB:", "Date of Birth:"]),
        labelled("Date of Death", &["Date of Death:"]),
        labelled("Medicare Number", &["Medicare Number:"]),
        labelled("Transaction ID", &["Transaction ID:"]),
        labelled("Provider/Supplier", &["Provider/Supplier:"]),
        labelled("NPI", &["NPI:"]),
        labelled("PTAN", &["PTAN:"]),
        labelled("TIN or SSN", &["TIN or SSN:"]),
        labelled("From Date of Service", &["From Date of Service:"]),
        labelled("To Date of Service", &["To Date of Service:"]),
        FieldSpec::new("Part A Effective Date").strategy(LocatorStrategy::pattern(
            r"Part A - Beneficiary Details[\s\S]*?Effective Date:\s*([0-9/]+)",
        )),
        FieldSpec::new("Part B Effective Date").strategy(LocatorStrategy::pattern(
            r"Part B - Beneficiary Details[\s\S]*?Effective Date:\s*([0-9/]+)",
        )),
        labelled("QMB Enrolled", &["QMB Enrolled:"]),
        labelled("Base Deductible", &["Base Deductible:"]),
        labelled("Remaining Deductible", &["Remaining Deductible:"]),
        labelled("Part D Plan Name", &["PBP Plan Name:"]),
        FieldSpec::new("HMO_MA_Benefits_Available")
            .strategy(LocatorStrategy::flag_unless(["No benefits available"]).within("#hmo"))
            .default_value(NOT_AVAILABLE),
    ];

    for (name, label) in [
        ("HMO_MA_Plan_Name", "Plan Name:"),
        ("HMO_MA_Effective_Date", "Effective Date:"),
        ("HMO_MA_Termination_Date", "Termination Date:"),
        ("HMO_MA_Plan_ID", "Plan ID:"),
        ("HMO_MA_Group_ID", "Group ID:"),
        ("HMO_MA_Copay_Info", "Copay:"),
        ("HMO_MA_Deductible_Info", "Deductible:"),
    ] {
        fields.push(tab_field(name, "#hmo", label));
    }
    fields.push(
        FieldSpec::new("MSP_Exists")
            .strategy(
                LocatorStrategy::flag_unless(["No MSP data"])
                    .requiring(["MSP"])
                    .within("#msp"),
            )
            .default_value(NOT_AVAILABLE),
    );
    for (name, label) in [
        ("MSP_Type", "MSP Type:"),
        ("MSP_Effective_Date", "Effective Date:"),
        ("MSP_Termination_Date", "Termination Date:"),
        ("MSP_Provider_Name", "Provider Name:"),
        ("MSP_Provider_Phone", "Provider Phone:"),
        ("MSP_Insurance_Name", "Insurance Name:"),
        ("MSP_Insurance_ID", "Insurance ID:"),
    ] {
        fields.push(tab_field(name, "#msp", label));
    }

    let mut columns: Vec<String> = CONTEXT_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend(fields.iter().map(|f| f.name.clone()));
    columns.push(TIMESTAMP_COLUMN.to_string());

    SpecTable::new("noridian", fields)
        .ready_when(["div[class*=col-4] strong"])
        .with_column_order(columns)
}

/// `span` carrying one of several keywords
fn keyword_span(selector: &str, keywords: &[&str]) -> Vec<LocatorStrategy> {
    keywords
        .iter()
        .map(|k| LocatorStrategy::ByStructuralPath {
            selector: selector.to_string(),
            contains: Some(k.to_string()),
            accessor: Accessor::Text,
        })
        .collect()
}

fn keyword_field(name: &str, selector: &str, keywords: &[&str]) -> FieldSpec {
    let mut spec = FieldSpec::new(name);
    spec.strategies = keyword_span(selector, keywords);
    spec.postprocess(Transform::FirstLine).default_value(NOT_FOUND)
}

/// United Healthcare eligibility summary
pub fn uhc_eligibility() -> SpecTable {
    let fields = vec![
        keyword_field("plan_name", "span.abyss-c-cQFdVt", &["Choice", "Plus", "Plan"]),
        keyword_field(
            "funding_type",
            "span.abyss-c-cQFdVt",
            &["Self Insured", "Large Group", "Funded"],
        ),
        FieldSpec::new("group")
            .strategy(LocatorStrategy::structural("p.abyss-c-cQFdVt", Accessor::Text))
            .strategy(LocatorStrategy::label("Group:"))
            .default_value(NOT_FOUND),
        keyword_field(
            "plan_type",
            "span.abyss-c-cQFdVt",
            &["Commercial", "HMO", "PPO", "EPO"],
        ),
        keyword_field("payer_status", "strong", &["Primary", "Secondary", "Tertiary"]),
    ];

    SpecTable::new("uhc", fields)
        .ready_when([
            ".abyss-c-cQFdVt",
            "[class*=error]",
            "[class*=no-results]",
        ])
        .no_results_when(["not found", "no results", "invalid", "no member"])
        .with_status_column("processing_status")
        .with_derived(DerivedField::any_found(
            "is_active",
            ["plan_name", "funding_type", "group"],
        ))
}

/// Resolve a table argument: a built-in name or a JSON file path
pub fn load_table(name_or_path: &str) -> Result<SpecTable> {
    match name_or_path {
        "noridian" => Ok(noridian_eligibility()),
        "uhc" => Ok(uhc_eligibility()),
        path if path.ends_with(".json") => SpecTable::from_path(path),
        other => Err(ExtractError::InvalidSpec(format!(
            "unknown table {other:?} (expected noridian, uhc or a .json file)"
        ))),
    }
}
