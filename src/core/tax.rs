use super::types::{
    AccountInput, CashflowAllocation, ContributionImpact, ContributionLimitHints, FilingStatus,
    LimitHint, TaxSummary, TaxTreatment,
};

pub const STANDARD_DEDUCTION_2025_SINGLE: f64 = 15_000.0;
pub const STANDARD_DEDUCTION_2025_MARRIED: f64 = 30_000.0;

/// Start-of-bracket schedule: each rate applies from its threshold up to the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketTable {
    brackets: Vec<(f64, f64)>,
}

impl BracketTable {
    pub fn new(brackets: Vec<(f64, f64)>) -> Self {
        debug_assert!(
            brackets.first().is_some_and(|&(start, _)| start == 0.0),
            "first bracket must start at 0"
        );
        debug_assert!(
            brackets.windows(2).all(|w| w[0].0 < w[1].0),
            "bracket thresholds must be strictly increasing"
        );
        Self { brackets }
    }

    pub fn brackets(&self) -> &[(f64, f64)] {
        &self.brackets
    }

    pub fn tax(&self, taxable_income: f64) -> f64 {
        compute_tax(taxable_income, self)
    }
}

pub fn federal_brackets_2025(status: FilingStatus) -> BracketTable {
    match status {
        FilingStatus::Single => BracketTable::new(vec![
            (0.0, 0.10),
            (11_925.0, 0.12),
            (48_475.0, 0.22),
            (103_350.0, 0.24),
            (197_300.0, 0.32),
            (250_525.0, 0.35),
            (626_350.0, 0.37),
        ]),
        FilingStatus::Married => BracketTable::new(vec![
            (0.0, 0.10),
            (23_850.0, 0.12),
            (96_950.0, 0.22),
            (206_700.0, 0.24),
            (394_600.0, 0.32),
            (501_050.0, 0.35),
            (752_600.0, 0.37),
        ]),
    }
}

pub fn virginia_brackets_2025() -> BracketTable {
    BracketTable::new(vec![
        (0.0, 0.02),
        (3_000.0, 0.03),
        (5_000.0, 0.05),
        (17_000.0, 0.0575),
    ])
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxSchedule {
    pub federal: BracketTable,
    pub state: BracketTable,
    pub standard_deduction: f64,
}

impl TaxSchedule {
    pub fn for_filing_status(status: FilingStatus) -> Self {
        let standard_deduction = match status {
            FilingStatus::Single => STANDARD_DEDUCTION_2025_SINGLE,
            FilingStatus::Married => STANDARD_DEDUCTION_2025_MARRIED,
        };
        Self {
            federal: federal_brackets_2025(status),
            state: virginia_brackets_2025(),
            standard_deduction,
        }
    }
}

pub fn compute_tax(taxable_income: f64, table: &BracketTable) -> f64 {
    if taxable_income <= 0.0 {
        return 0.0;
    }

    let brackets = table.brackets();
    let mut tax = 0.0;
    for (idx, &(start, rate)) in brackets.iter().enumerate() {
        if taxable_income <= start {
            break;
        }
        let end = brackets
            .get(idx + 1)
            .map(|&(next, _)| next)
            .unwrap_or(f64::INFINITY);
        let slice = taxable_income.clamp(start, end) - start;
        if slice > 0.0 {
            tax += slice * rate;
        }
    }
    tax.max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CappedDeduction {
    pub amount: f64,
    pub cap: f64,
}

impl CappedDeduction {
    pub fn allowed(self) -> f64 {
        self.amount.min(self.cap)
    }
}

pub fn compute_agi(
    gross_income: f64,
    pension_rate: f64,
    pretax_contributions: &[f64],
    capped_deductions: &[CappedDeduction],
) -> f64 {
    let pretax: f64 = pretax_contributions.iter().sum();
    let capped: f64 = capped_deductions.iter().map(|d| d.allowed()).sum();
    gross_income - gross_income * pension_rate - pretax - capped
}

pub fn taxable_income(agi: f64, standard_deduction: f64) -> f64 {
    (agi - standard_deduction).max(0.0)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributionBreakdown {
    pub pretax: Vec<f64>,
    pub capped: Vec<CappedDeduction>,
    pub employer: f64,
    pub total: f64,
}

impl ContributionBreakdown {
    pub fn classify(accounts: &[AccountInput], hints: &ContributionLimitHints) -> Self {
        let mut breakdown = Self::default();
        let mut education = 0.0;

        for account in accounts {
            let amount = account.annual_contribution;
            breakdown.total += amount;
            match account.treatment() {
                treatment if treatment.reduces_agi() => breakdown.pretax.push(amount),
                TaxTreatment::Education => education += amount,
                TaxTreatment::Employer => breakdown.employer += amount,
                _ => {}
            }
        }

        // Education contributions share one state deduction capped by the 529 hint.
        if education > 0.0 {
            let cap = hints.get(&LimitHint::Education).copied().unwrap_or(0.0);
            breakdown.capped.push(CappedDeduction {
                amount: education,
                cap,
            });
        }

        breakdown
    }

    pub fn pre_tax_total(&self) -> f64 {
        self.pretax.iter().sum::<f64>() + self.capped.iter().map(|d| d.allowed()).sum::<f64>()
    }

    pub fn post_tax_total(&self) -> f64 {
        self.total - self.pre_tax_total() - self.employer
    }
}

pub fn summarize_taxes(
    gross_income: f64,
    pension_rate: f64,
    schedule: &TaxSchedule,
    contributions: &ContributionBreakdown,
) -> TaxSummary {
    let pension_contribution = gross_income * pension_rate;
    let agi = compute_agi(
        gross_income,
        pension_rate,
        &contributions.pretax,
        &contributions.capped,
    );
    let taxable = taxable_income(agi, schedule.standard_deduction);
    let federal_tax = compute_tax(taxable, &schedule.federal);
    let state_tax = compute_tax(taxable, &schedule.state);
    let total_tax = federal_tax + state_tax;

    let effective_rate = if gross_income > 0.0 {
        total_tax / gross_income
    } else {
        0.0
    };
    let after_tax_income = gross_income - pension_contribution - total_tax;

    let pre_tax_savings = contributions.pre_tax_total();
    let post_tax_savings = contributions.post_tax_total();
    let savings_rate = if gross_income > 0.0 {
        contributions.total / gross_income
    } else {
        0.0
    };

    TaxSummary {
        pension_contribution,
        agi,
        taxable_income: taxable,
        federal_tax,
        state_tax,
        total_tax,
        effective_rate,
        after_tax_income,
        total_savings: contributions.total,
        pre_tax_savings,
        employer_savings: contributions.employer,
        post_tax_savings,
        employee_savings: contributions.total - contributions.employer,
        disposable_income: after_tax_income - post_tax_savings,
        savings_rate,
    }
}

pub fn contribution_impact(
    gross_income: f64,
    pension_rate: f64,
    schedule: &TaxSchedule,
    actual: &TaxSummary,
) -> ContributionImpact {
    let baseline = summarize_taxes(
        gross_income,
        pension_rate,
        schedule,
        &ContributionBreakdown::default(),
    );

    ContributionImpact {
        baseline_federal_tax: baseline.federal_tax,
        baseline_state_tax: baseline.state_tax,
        baseline_total_tax: baseline.total_tax,
        baseline_after_tax_income: baseline.after_tax_income,
        tax_saved: baseline.total_tax - actual.total_tax,
        disposable_change: actual.disposable_income - baseline.after_tax_income,
        baseline_allocation: CashflowAllocation {
            pension: baseline.pension_contribution,
            federal_tax: baseline.federal_tax,
            state_tax: baseline.state_tax,
            savings: 0.0,
            disposable: baseline.after_tax_income.max(0.0),
        },
        with_contributions_allocation: CashflowAllocation {
            pension: actual.pension_contribution,
            federal_tax: actual.federal_tax,
            state_tax: actual.state_tax,
            savings: actual.employee_savings,
            disposable: actual.disposable_income.max(0.0),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::default_limit_hints;
    use proptest::collection::vec as prop_vec;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn four_bracket_state() -> BracketTable {
        virginia_brackets_2025()
    }

    #[test]
    fn non_positive_income_owes_nothing() {
        let table = federal_brackets_2025(FilingStatus::Single);
        assert_eq!(compute_tax(0.0, &table), 0.0);
        assert_eq!(compute_tax(-25_000.0, &table), 0.0);
        assert_eq!(compute_tax(f64::NEG_INFINITY, &table), 0.0);
    }

    #[test]
    fn federal_single_matches_hand_calculation_at_thresholds() {
        let table = federal_brackets_2025(FilingStatus::Single);
        assert_approx(compute_tax(11_925.0, &table), 1_192.5);
        assert_approx(compute_tax(48_475.0, &table), 1_192.5 + 4_386.0);
        assert_approx(compute_tax(103_350.0, &table), 1_192.5 + 4_386.0 + 12_072.5);
    }

    #[test]
    fn federal_married_first_brackets() {
        let table = federal_brackets_2025(FilingStatus::Married);
        assert_approx(compute_tax(23_850.0, &table), 2_385.0);
        assert_approx(compute_tax(30_000.0, &table), 2_385.0 + 6_150.0 * 0.12);
    }

    #[test]
    fn state_table_taxes_each_slice_once() {
        let table = four_bracket_state();
        assert_approx(compute_tax(2_000.0, &table), 40.0);
        assert_approx(compute_tax(17_000.0, &table), 60.0 + 60.0 + 600.0);
        assert_approx(compute_tax(27_000.0, &table), 720.0 + 575.0);
    }

    #[test]
    fn agi_subtracts_pension_pretax_and_capped_deductions() {
        let agi = compute_agi(
            100_000.0,
            0.10,
            &[5_000.0, 2_500.0],
            &[
                CappedDeduction {
                    amount: 6_000.0,
                    cap: 4_000.0,
                },
                CappedDeduction {
                    amount: 1_000.0,
                    cap: 4_000.0,
                },
            ],
        );
        assert_approx(agi, 100_000.0 - 10_000.0 - 7_500.0 - 4_000.0 - 1_000.0);
        assert_eq!(taxable_income(10_000.0, 15_000.0), 0.0);
        assert_approx(taxable_income(40_000.0, 15_000.0), 25_000.0);
    }

    #[test]
    fn oracle_single_filer_with_403b_contribution() {
        let schedule = TaxSchedule::for_filing_status(FilingStatus::Single);
        let accounts = vec![AccountInput::new("403(b) Traditional", 0.0, 23_500.0)];
        let breakdown = ContributionBreakdown::classify(&accounts, &default_limit_hints());
        let summary = summarize_taxes(150_000.0, 0.05, &schedule, &breakdown);

        assert_approx(summary.pension_contribution, 7_500.0);
        assert_approx(summary.agi, 119_000.0);
        assert_approx(summary.taxable_income, 104_000.0);
        assert_approx(summary.federal_tax, 17_807.0);
        assert_approx(summary.state_tax, 5_722.5);
        assert_approx(summary.total_tax, 23_529.5);
        assert_approx(summary.after_tax_income, 150_000.0 - 7_500.0 - 23_529.5);
        assert_approx(summary.post_tax_savings, 0.0);
        assert_approx(summary.disposable_income, summary.after_tax_income);
        assert_approx(summary.effective_rate, 23_529.5 / 150_000.0);
    }

    #[test]
    fn classify_separates_employer_and_caps_education() {
        let accounts = vec![
            AccountInput::new("Traditional IRA", 0.0, 3_000.0),
            AccountInput::new("HSA", 0.0, 4_000.0),
            AccountInput::new("401(a) Employer", 0.0, 6_000.0),
            AccountInput::new("529 Plan", 0.0, 5_000.0),
            AccountInput::new("ESA", 0.0, 1_000.0),
            AccountInput::new("Roth IRA", 0.0, 2_000.0),
        ];
        let breakdown = ContributionBreakdown::classify(&accounts, &default_limit_hints());

        assert_eq!(breakdown.pretax, vec![3_000.0, 4_000.0]);
        assert_approx(breakdown.employer, 6_000.0);
        assert_approx(breakdown.total, 21_000.0);
        assert_eq!(breakdown.capped.len(), 1);
        assert_approx(breakdown.capped[0].allowed(), 4_000.0);
        assert_approx(breakdown.pre_tax_total(), 11_000.0);
        assert_approx(breakdown.post_tax_total(), 21_000.0 - 11_000.0 - 6_000.0);
    }

    #[test]
    fn explicit_treatment_overrides_name_lookup() {
        let accounts = vec![
            AccountInput::new("My Workplace Plan", 0.0, 10_000.0)
                .with_treatment(TaxTreatment::PreTax),
        ];
        let breakdown = ContributionBreakdown::classify(&accounts, &default_limit_hints());
        assert_eq!(breakdown.pretax, vec![10_000.0]);
    }

    #[test]
    fn summary_handles_zero_gross_income() {
        let schedule = TaxSchedule::for_filing_status(FilingStatus::Married);
        let accounts = vec![AccountInput::new("Roth IRA", 0.0, 7_000.0)];
        let breakdown = ContributionBreakdown::classify(&accounts, &default_limit_hints());
        let summary = summarize_taxes(0.0, 0.05, &schedule, &breakdown);

        assert_eq!(summary.total_tax, 0.0);
        assert_eq!(summary.effective_rate, 0.0);
        assert_eq!(summary.savings_rate, 0.0);
        assert_approx(summary.disposable_income, -7_000.0);
    }

    #[test]
    fn contribution_impact_compares_against_no_contribution_baseline() {
        let schedule = TaxSchedule::for_filing_status(FilingStatus::Single);
        let accounts = vec![
            AccountInput::new("403(b) Traditional", 0.0, 23_500.0),
            AccountInput::new("Roth IRA", 0.0, 5_000.0),
        ];
        let breakdown = ContributionBreakdown::classify(&accounts, &default_limit_hints());
        let summary = summarize_taxes(150_000.0, 0.05, &schedule, &breakdown);
        let impact = contribution_impact(150_000.0, 0.05, &schedule, &summary);

        // Baseline taxable income is 150,000 - 7,500 - 15,000.
        let baseline_taxable = 127_500.0;
        let baseline_federal = 1_192.5 + 4_386.0 + 12_072.5 + (baseline_taxable - 103_350.0) * 0.24;
        let baseline_state = 720.0 + (baseline_taxable - 17_000.0) * 0.0575;
        assert_approx(impact.baseline_federal_tax, baseline_federal);
        assert_approx(impact.baseline_state_tax, baseline_state);
        assert_approx(
            impact.tax_saved,
            baseline_federal + baseline_state - summary.total_tax,
        );
        assert_approx(
            impact.disposable_change,
            summary.disposable_income - impact.baseline_after_tax_income,
        );
        assert_eq!(impact.baseline_allocation.savings, 0.0);
        assert_approx(impact.with_contributions_allocation.savings, 28_500.0);
    }

    #[test]
    fn allocation_clamps_negative_disposable_for_display_only() {
        let schedule = TaxSchedule::for_filing_status(FilingStatus::Single);
        let accounts = vec![AccountInput::new("Brokerage", 0.0, 80_000.0)];
        let breakdown = ContributionBreakdown::classify(&accounts, &default_limit_hints());
        let summary = summarize_taxes(60_000.0, 0.0, &schedule, &breakdown);
        let impact = contribution_impact(60_000.0, 0.0, &schedule, &summary);

        assert!(summary.disposable_income < 0.0);
        assert_eq!(impact.with_contributions_allocation.disposable, 0.0);
    }

    /// Thresholds start at 0 and grow by at least one cent; rates are in basis points.
    fn table_from_steps(steps: &[(u64, u32)]) -> BracketTable {
        let mut threshold = 0.0;
        let mut brackets = Vec::with_capacity(steps.len());
        for (idx, &(gap_cents, rate_bp)) in steps.iter().enumerate() {
            if idx > 0 {
                threshold += gap_cents as f64 / 100.0;
            }
            brackets.push((threshold, rate_bp as f64 / 10_000.0));
        }
        BracketTable::new(brackets)
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(256))]

        #[test]
        fn prop_tax_is_non_decreasing_in_income(
            income_cents in 0u64..200_000_000,
            delta_cents in 0u64..5_000_000,
            married in proptest::bool::ANY,
        ) {
            let status = if married { FilingStatus::Married } else { FilingStatus::Single };
            let table = federal_brackets_2025(status);
            let low = income_cents as f64 / 100.0;
            let high = low + delta_cents as f64 / 100.0;
            prop_assert!(compute_tax(high, &table) + 1e-9 >= compute_tax(low, &table));
            prop_assert!(compute_tax(low, &table) >= 0.0);
        }

        #[test]
        fn prop_generated_tables_are_continuous_and_non_decreasing(
            steps in prop_vec((1u64..10_000_000, 0u32..6_000), 1..8),
            income_cents in 0u64..100_000_000,
            delta_cents in 0u64..5_000_000,
        ) {
            let table = table_from_steps(&steps);
            for &(threshold, _) in table.brackets() {
                let below = compute_tax(threshold - 1e-6, &table);
                let at = compute_tax(threshold, &table);
                let above = compute_tax(threshold + 1e-6, &table);
                prop_assert!((at - below).abs() < 1e-5, "jump below {}", threshold);
                prop_assert!((above - at).abs() < 1e-5, "jump above {}", threshold);
            }

            let low = income_cents as f64 / 100.0;
            let high = low + delta_cents as f64 / 100.0;
            prop_assert!(compute_tax(high, &table) + 1e-9 >= compute_tax(low, &table));
            prop_assert!(compute_tax(low, &table) >= 0.0);
        }

        #[test]
        fn prop_tax_never_exceeds_top_rate_share(income_cents in 0u64..200_000_000) {
            let table = virginia_brackets_2025();
            let income = income_cents as f64 / 100.0;
            prop_assert!(compute_tax(income, &table) <= income * 0.0575 + 1e-9);
        }
    }

    #[test]
    fn tax_is_continuous_at_every_threshold() {
        for status in [FilingStatus::Single, FilingStatus::Married] {
            let table = federal_brackets_2025(status);
            for &(threshold, _) in table.brackets() {
                let below = compute_tax(threshold - 1e-6, &table);
                let at = compute_tax(threshold, &table);
                let above = compute_tax(threshold + 1e-6, &table);
                assert!((at - below).abs() < 1e-6, "jump below {threshold}");
                assert!((above - at).abs() < 1e-6, "jump above {threshold}");
            }
        }
    }
}
