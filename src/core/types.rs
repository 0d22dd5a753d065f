use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tax::TaxSchedule;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilingStatus {
    Single,
    #[serde(alias = "married-filing-jointly", alias = "marriedFilingJointly")]
    Married,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxTreatment {
    PreTax,
    Roth,
    Employer,
    Hsa,
    Education,
    Taxable,
    Other,
}

impl TaxTreatment {
    pub fn classify(name: &str) -> Self {
        match name {
            "Roth IRA" | "403(b) Roth" | "457(b) Roth" => TaxTreatment::Roth,
            "Traditional IRA" | "403(b) Traditional" | "457(b) Traditional" | "401(a) Employee"
            | "Solo 401(k) Employee" | "SEP IRA" | "SIMPLE IRA" | "FSA" => TaxTreatment::PreTax,
            "401(a) Employer" | "Solo 401(k) Employer" => TaxTreatment::Employer,
            "HSA" => TaxTreatment::Hsa,
            "529 Plan" | "ESA" => TaxTreatment::Education,
            "Brokerage" | "Crypto" | OTHER_INVESTMENTS => TaxTreatment::Taxable,
            _ => TaxTreatment::Other,
        }
    }

    pub fn reduces_agi(self) -> bool {
        matches!(self, TaxTreatment::PreTax | TaxTreatment::Hsa)
    }

    pub fn bucket(self) -> TaxBucket {
        match self {
            TaxTreatment::Roth => TaxBucket::Roth,
            TaxTreatment::PreTax | TaxTreatment::Employer => TaxBucket::Traditional,
            TaxTreatment::Hsa => TaxBucket::Hsa,
            TaxTreatment::Education => TaxBucket::Education,
            TaxTreatment::Taxable => TaxBucket::Taxable,
            TaxTreatment::Other => TaxBucket::Other,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxBucket {
    Roth,
    Traditional,
    Hsa,
    Education,
    Taxable,
    Other,
}

impl TaxBucket {
    pub fn label(self) -> &'static str {
        match self {
            TaxBucket::Roth => "Roth (tax-free withdrawals, rules apply)",
            TaxBucket::Traditional => "Traditional / Pre-tax (taxable withdrawals)",
            TaxBucket::Hsa => "HSA (triple-advantaged, med. rules)",
            TaxBucket::Education => "Education (529/ESA)",
            TaxBucket::Taxable => "Taxable / Non-advantaged",
            TaxBucket::Other => "Other / Unclassified",
        }
    }
}

pub const OTHER_INVESTMENTS: &str = "Other Investments";

/// A per-account return exactly as the user typed it, before normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawReturn {
    Number(f64),
    Text(String),
}

impl RawReturn {
    pub fn value(&self) -> Option<f64> {
        match self {
            RawReturn::Number(v) => Some(*v),
            RawReturn::Text(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInput {
    pub name: String,
    #[serde(default)]
    pub tax_treatment: Option<TaxTreatment>,
    #[serde(default)]
    pub starting_balance: f64,
    #[serde(default)]
    pub annual_contribution: f64,
    #[serde(default)]
    pub annual_return: Option<RawReturn>,
}

impl AccountInput {
    pub fn new(name: impl Into<String>, starting_balance: f64, annual_contribution: f64) -> Self {
        Self {
            name: name.into(),
            tax_treatment: None,
            starting_balance,
            annual_contribution,
            annual_return: None,
        }
    }

    pub fn with_return(mut self, raw: f64) -> Self {
        self.annual_return = Some(RawReturn::Number(raw));
        self
    }

    pub fn with_treatment(mut self, treatment: TaxTreatment) -> Self {
        self.tax_treatment = Some(treatment);
        self
    }

    pub fn treatment(&self) -> TaxTreatment {
        self.tax_treatment
            .unwrap_or_else(|| TaxTreatment::classify(&self.name))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitHint {
    #[serde(alias = "ira-combined")]
    Ira,
    #[serde(rename = "457b", alias = "457b-deferral")]
    Deferral457b,
    #[serde(rename = "403b", alias = "403b-deferral")]
    Deferral403b,
    Hsa,
    Fsa,
    #[serde(rename = "529", alias = "education")]
    Education,
}

impl LimitHint {
    pub fn label(self) -> &'static str {
        match self {
            LimitHint::Ira => "IRA combined",
            LimitHint::Deferral457b => "457(b)",
            LimitHint::Deferral403b => "403(b)",
            LimitHint::Hsa => "HSA",
            LimitHint::Fsa => "FSA",
            LimitHint::Education => "529 deduction",
        }
    }

    pub fn accounts(self) -> &'static [&'static str] {
        match self {
            LimitHint::Ira => &["Traditional IRA", "Roth IRA"],
            LimitHint::Deferral457b => &["457(b) Traditional", "457(b) Roth"],
            LimitHint::Deferral403b => &["403(b) Traditional", "403(b) Roth"],
            LimitHint::Hsa => &["HSA"],
            LimitHint::Fsa => &["FSA"],
            LimitHint::Education => &["529 Plan"],
        }
    }
}

pub type ContributionLimitHints = BTreeMap<LimitHint, f64>;

pub fn default_limit_hints() -> ContributionLimitHints {
    BTreeMap::from([
        (LimitHint::Ira, 7_000.0),
        (LimitHint::Deferral457b, 23_500.0),
        (LimitHint::Deferral403b, 23_500.0),
        (LimitHint::Hsa, 8_550.0),
        (LimitHint::Fsa, 3_300.0),
        (LimitHint::Education, 4_000.0),
    ])
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossingPolicy {
    #[default]
    #[serde(alias = "integer", alias = "wholeYear")]
    WholeYear,
    #[serde(alias = "interpolated")]
    Fractional,
}

pub const MAX_HORIZON_YEARS: u32 = 50;
pub const DEFAULT_RETURN: f64 = 0.08;

#[derive(Debug, Clone)]
pub struct Inputs {
    pub filing_status: FilingStatus,
    pub schedule: TaxSchedule,
    pub gross_salary: f64,
    pub pension_rate: f64,
    pub annual_expenses: f64,
    pub swr: f64,
    pub inflation_rate: f64,
    pub expense_inflation_mode: bool,
    pub current_age: u32,
    pub target_age: u32,
    pub horizon_cap_age: Option<u32>,
    pub current_investments: Option<f64>,
    pub other_investments_return: f64,
    pub default_return: f64,
    pub coast_growth_rate: f64,
    pub accounts: Vec<AccountInput>,
    pub contribution_limit_hints: ContributionLimitHints,
    pub crossing_policy: CrossingPolicy,
}

impl Inputs {
    pub fn years_until_retirement(&self) -> u32 {
        self.target_age.saturating_sub(self.current_age).max(1)
    }

    pub fn horizon_years(&self) -> u32 {
        match self.horizon_cap_age {
            Some(cap_age) => cap_age
                .saturating_sub(self.current_age)
                .clamp(1, MAX_HORIZON_YEARS),
            None => MAX_HORIZON_YEARS,
        }
    }

    pub fn limit_hint(&self, hint: LimitHint) -> Option<f64> {
        self.contribution_limit_hints.get(&hint).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSummary {
    pub pension_contribution: f64,
    pub agi: f64,
    pub taxable_income: f64,
    pub federal_tax: f64,
    pub state_tax: f64,
    pub total_tax: f64,
    pub effective_rate: f64,
    pub after_tax_income: f64,
    pub total_savings: f64,
    pub pre_tax_savings: f64,
    pub employer_savings: f64,
    pub post_tax_savings: f64,
    pub employee_savings: f64,
    pub disposable_income: f64,
    pub savings_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowAllocation {
    pub pension: f64,
    pub federal_tax: f64,
    pub state_tax: f64,
    pub savings: f64,
    pub disposable: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionImpact {
    pub baseline_federal_tax: f64,
    pub baseline_state_tax: f64,
    pub baseline_total_tax: f64,
    pub baseline_after_tax_income: f64,
    pub tax_saved: f64,
    pub disposable_change: f64,
    pub baseline_allocation: CashflowAllocation,
    pub with_contributions_allocation: CashflowAllocation,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MilestoneKind {
    Coast,
    Flamingo,
    Barista,
    Lean,
    Chubby,
    Full,
    Fat,
    Obese,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneTarget {
    pub kind: MilestoneKind,
    pub name: String,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneOutcome {
    pub kind: MilestoneKind,
    pub name: String,
    pub target: f64,
    pub years_to_reach: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiGuides {
    pub horizon_years: u32,
    pub expenses: f64,
    pub lean: f64,
    pub full: f64,
    pub chubby: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPoint {
    pub year: u32,
    pub nominal_total: f64,
    pub real_total: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Checkpoint {
    FiveYears,
    TenYears,
    Retirement,
    FullFi,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub name: String,
    pub bucket: TaxBucket,
    pub nominal: f64,
    pub real: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketBalance {
    pub bucket: TaxBucket,
    pub label: &'static str,
    pub nominal: f64,
    pub real: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub checkpoint: Checkpoint,
    pub year: u32,
    pub horizon_years: f64,
    pub accounts: Vec<AccountBalance>,
    pub buckets: Vec<BucketBalance>,
}

impl Snapshot {
    pub fn nominal_total(&self) -> f64 {
        self.accounts.iter().map(|a| a.nominal).sum()
    }

    pub fn real_total(&self) -> f64 {
        self.accounts.iter().map(|a| a.real).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub starting_total: f64,
    pub years: Vec<YearPoint>,
    pub milestones: Vec<MilestoneOutcome>,
    pub full_fi_years: Option<f64>,
    pub snapshots: Vec<Snapshot>,
}

impl SimulationResult {
    pub fn milestone(&self, kind: MilestoneKind) -> Option<&MilestoneOutcome> {
        self.milestones.iter().find(|m| m.kind == kind)
    }

    pub fn snapshot(&self, checkpoint: Checkpoint) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.checkpoint == checkpoint)
    }

    pub fn milestones_by_time(&self) -> Vec<&MilestoneOutcome> {
        let mut ordered = self.milestones.iter().collect::<Vec<_>>();
        ordered.sort_by(|a, b| match (a.years_to_reach, b.years_to_reach) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        ordered
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub filing_status: FilingStatus,
    pub crossing_policy: CrossingPolicy,
    pub years_until_retirement: u32,
    pub horizon_years: u32,
    pub tax: TaxSummary,
    pub contribution_impact: ContributionImpact,
    pub targets: Vec<MilestoneTarget>,
    pub nominal_guides: FiGuides,
    pub projection: SimulationResult,
    pub milestone_order: Vec<MilestoneKind>,
    pub warnings: Vec<String>,
}
