use std::collections::BTreeSet;

use tracing::{info, warn};

use super::engine::{Account, Portfolio, ProjectionSettings, project};
use super::error::ConfigurationError;
use super::milestones::{build_targets, check_swr, nominal_guides};
use super::returns::normalize_return;
use super::tax::{ContributionBreakdown, contribution_impact, summarize_taxes};
use super::types::{
    AccountInput, Inputs, LimitHint, OTHER_INVESTMENTS, PlanResult, TaxSummary, TaxTreatment,
};

const WARNED_HINTS: [LimitHint; 5] = [
    LimitHint::Ira,
    LimitHint::Deferral457b,
    LimitHint::Deferral403b,
    LimitHint::Hsa,
    LimitHint::Fsa,
];

pub fn run_plan(inputs: &Inputs) -> Result<PlanResult, ConfigurationError> {
    check_swr(inputs.swr)?;
    if let Some(name) = duplicate_account_name(&inputs.accounts) {
        return Err(ConfigurationError::invalid(
            "accounts",
            format!("duplicate account name '{name}'"),
        ));
    }

    let breakdown =
        ContributionBreakdown::classify(&inputs.accounts, &inputs.contribution_limit_hints);
    let tax = summarize_taxes(
        inputs.gross_salary,
        inputs.pension_rate,
        &inputs.schedule,
        &breakdown,
    );
    let contribution_impact = contribution_impact(
        inputs.gross_salary,
        inputs.pension_rate,
        &inputs.schedule,
        &tax,
    );

    let warnings = contribution_warnings(inputs, &tax);
    for message in &warnings {
        warn!(target: "plan", "{message}");
    }

    let years_until_retirement = inputs.years_until_retirement();
    let horizon_years = inputs.horizon_years();
    let targets = build_targets(
        inputs.annual_expenses,
        inputs.swr,
        years_until_retirement,
        inputs.coast_growth_rate,
    )?;
    let guides = nominal_guides(
        inputs.annual_expenses,
        inputs.swr,
        inputs.inflation_rate,
        years_until_retirement,
        inputs.expense_inflation_mode,
    )?;

    let portfolio = build_portfolio(inputs);
    let projection = project(
        &portfolio,
        &targets,
        &ProjectionSettings {
            horizon_years,
            retirement_years: years_until_retirement,
            inflation_rate: inputs.inflation_rate,
            crossing_policy: inputs.crossing_policy,
        },
    );

    info!(
        target: "plan",
        accounts = portfolio.len(),
        starting_total = projection.starting_total,
        total_tax = tax.total_tax,
        full_fi_years = ?projection.full_fi_years,
        horizon_years,
        "plan computed"
    );

    let milestone_order = projection
        .milestones_by_time()
        .into_iter()
        .map(|m| m.kind)
        .collect();

    Ok(PlanResult {
        filing_status: inputs.filing_status,
        crossing_policy: inputs.crossing_policy,
        years_until_retirement,
        horizon_years,
        tax,
        contribution_impact,
        targets,
        nominal_guides: guides,
        projection,
        milestone_order,
        warnings,
    })
}

/// First account name that appears more than once, if any.
pub fn duplicate_account_name(accounts: &[AccountInput]) -> Option<&str> {
    let mut seen = BTreeSet::new();
    accounts
        .iter()
        .map(|a| a.name.as_str())
        .find(|name| !seen.insert(*name))
}

/// Explicit accounts in input order. The unassigned remainder of the current
/// investment total goes to an explicit Other Investments account when one is
/// given, otherwise to a new one placed first.
pub fn build_portfolio(inputs: &Inputs) -> Portfolio {
    let mut portfolio = Portfolio::new();

    let remainder = inputs
        .current_investments
        .map(|current| {
            let specified: f64 = inputs.accounts.iter().map(|a| a.starting_balance).sum();
            (current - specified).max(0.0)
        })
        .unwrap_or(0.0);
    let explicit_other = inputs.accounts.iter().any(|a| a.name == OTHER_INVESTMENTS);

    if remainder > 0.0 && !explicit_other {
        portfolio.insert(Account::new(
            OTHER_INVESTMENTS,
            TaxTreatment::Taxable,
            remainder,
            0.0,
            normalize_return(Some(inputs.other_investments_return)),
        ));
    }

    for input in &inputs.accounts {
        let mut account = Account::from_input(input, inputs.default_return);
        if account.name == OTHER_INVESTMENTS {
            account.balance += remainder;
        }
        portfolio.insert(account);
    }
    portfolio
}

fn contributed(accounts: &[AccountInput], names: &[&str]) -> f64 {
    accounts
        .iter()
        .filter(|a| names.contains(&a.name.as_str()))
        .map(|a| a.annual_contribution)
        .sum()
}

pub fn contribution_warnings(inputs: &Inputs, tax: &TaxSummary) -> Vec<String> {
    let mut warnings = Vec::new();

    for hint in WARNED_HINTS {
        let Some(limit) = inputs.limit_hint(hint) else {
            continue;
        };
        let total = contributed(&inputs.accounts, hint.accounts());
        if total > limit {
            warnings.push(format!(
                "{} contribution {} exceeds hint limit {}",
                hint.label(),
                format_money(total),
                format_money(limit)
            ));
        }
    }

    if tax.post_tax_savings > tax.after_tax_income {
        warnings.push(format!(
            "Post-tax savings {} exceed after-tax income {} (negative disposable income)",
            format_money(tax.post_tax_savings),
            format_money(tax.after_tax_income)
        ));
    }

    warnings
}

pub fn format_money(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
