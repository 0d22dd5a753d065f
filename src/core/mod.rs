mod engine;
mod error;
mod milestones;
mod plan;
mod returns;
mod tax;
mod types;

pub use engine::{Account, Portfolio, ProjectionSettings, crossing_time, deflate, project};
pub use error::ConfigurationError;
pub use milestones::{
    build_targets, check_swr, coast_target, fi_target, inflate_expense, nominal_guides,
};
pub use plan::{
    build_portfolio, contribution_warnings, duplicate_account_name, format_money, run_plan,
};
pub use returns::{MAX_RETURN, MIN_RETURN, normalize_raw_return, normalize_return};
pub use tax::{
    BracketTable, CappedDeduction, ContributionBreakdown, STANDARD_DEDUCTION_2025_MARRIED,
    STANDARD_DEDUCTION_2025_SINGLE, TaxSchedule, compute_agi, compute_tax, contribution_impact,
    federal_brackets_2025, summarize_taxes, taxable_income, virginia_brackets_2025,
};
pub use types::{
    AccountBalance, AccountInput, BucketBalance, CashflowAllocation, Checkpoint,
    ContributionImpact, ContributionLimitHints, CrossingPolicy, DEFAULT_RETURN, FiGuides,
    FilingStatus, Inputs, LimitHint, MAX_HORIZON_YEARS, MilestoneKind, MilestoneOutcome,
    MilestoneTarget, OTHER_INVESTMENTS, PlanResult, RawReturn, SimulationResult, Snapshot,
    TaxBucket, TaxSummary, TaxTreatment, YearPoint, default_limit_hints,
};
