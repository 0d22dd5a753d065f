use super::error::ConfigurationError;
use super::types::{FiGuides, MilestoneKind, MilestoneTarget};

impl MilestoneKind {
    pub const ALL: [MilestoneKind; 8] = [
        MilestoneKind::Coast,
        MilestoneKind::Flamingo,
        MilestoneKind::Barista,
        MilestoneKind::Lean,
        MilestoneKind::Chubby,
        MilestoneKind::Full,
        MilestoneKind::Fat,
        MilestoneKind::Obese,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MilestoneKind::Coast => "Coast FI",
            MilestoneKind::Flamingo => "Flamingo FI (50% of FI #)",
            MilestoneKind::Barista => "Barista FI (covers ~50% of expenses)",
            MilestoneKind::Lean => "Lean FI (75% Expenses)",
            MilestoneKind::Chubby => "Chubby FI (~120% Expenses)",
            MilestoneKind::Full => "Full FI (100% Expenses)",
            MilestoneKind::Fat => "Fat FI (150% Expenses)",
            MilestoneKind::Obese => "Obese FI (200% Expenses)",
        }
    }

    /// Share of annual expenses the portfolio must cover at the SWR. Coast and
    /// Flamingo are derived from the Full FI number instead.
    pub fn expense_multiplier(self) -> Option<f64> {
        match self {
            MilestoneKind::Barista => Some(0.50),
            MilestoneKind::Lean => Some(0.75),
            MilestoneKind::Full => Some(1.00),
            MilestoneKind::Chubby => Some(1.20),
            MilestoneKind::Fat => Some(1.50),
            MilestoneKind::Obese => Some(2.00),
            MilestoneKind::Coast | MilestoneKind::Flamingo => None,
        }
    }
}

pub fn check_swr(swr: f64) -> Result<(), ConfigurationError> {
    if !swr.is_finite() {
        return Err(ConfigurationError::invalid(
            "swr",
            format!("must be a finite rate, got {swr}"),
        ));
    }
    if swr <= 0.0 {
        return Err(ConfigurationError::NonPositiveSwr { swr });
    }
    Ok(())
}

pub fn fi_target(annual_expenses: f64, swr: f64, multiplier: f64) -> Result<f64, ConfigurationError> {
    check_swr(swr)?;
    Ok(annual_expenses * multiplier / swr)
}

pub fn coast_target(full_fi_target: f64, assumed_growth: f64, years_until_retirement: u32) -> f64 {
    full_fi_target / (1.0 + assumed_growth).powi(years_until_retirement as i32)
}

pub fn inflate_expense(base_expense: f64, cpi: f64, years: u32) -> f64 {
    base_expense * (1.0 + cpi).powi(years as i32)
}

pub fn build_targets(
    annual_expenses: f64,
    swr: f64,
    years_until_retirement: u32,
    coast_growth: f64,
) -> Result<Vec<MilestoneTarget>, ConfigurationError> {
    check_swr(swr)?;
    if !coast_growth.is_finite() || coast_growth <= -1.0 {
        return Err(ConfigurationError::invalid(
            "coast_growth_rate",
            format!("must be > -100%, got {coast_growth}"),
        ));
    }

    let full = fi_target(annual_expenses, swr, 1.0)?;
    let mut targets = Vec::with_capacity(MilestoneKind::ALL.len());
    for kind in MilestoneKind::ALL {
        let target = match kind {
            MilestoneKind::Coast => coast_target(full, coast_growth, years_until_retirement),
            MilestoneKind::Flamingo => 0.50 * full,
            _ => fi_target(annual_expenses, swr, kind.expense_multiplier().unwrap_or(1.0))?,
        };
        targets.push(MilestoneTarget {
            kind,
            name: kind.label().to_string(),
            target,
        });
    }
    Ok(targets)
}

/// Lean/Full/Chubby lines for nominal charts; expenses are inflated to the horizon
/// only when `inflate_expenses` is set.
pub fn nominal_guides(
    annual_expenses: f64,
    swr: f64,
    cpi: f64,
    horizon_years: u32,
    inflate_expenses: bool,
) -> Result<FiGuides, ConfigurationError> {
    let expenses = if inflate_expenses {
        inflate_expense(annual_expenses, cpi, horizon_years)
    } else {
        annual_expenses
    };
    Ok(FiGuides {
        horizon_years,
        expenses,
        lean: fi_target(expenses, swr, 0.75)?,
        full: fi_target(expenses, swr, 1.00)?,
        chubby: fi_target(expenses, swr, 1.20)?,
    })
}
