use std::collections::BTreeMap;

use tracing::debug;

use super::returns::{MAX_RETURN, MIN_RETURN, normalize_raw_return, normalize_return};
use super::types::{
    AccountBalance, AccountInput, BucketBalance, Checkpoint, CrossingPolicy, MilestoneKind,
    MilestoneOutcome, MilestoneTarget, SimulationResult, Snapshot, TaxBucket, TaxTreatment,
    YearPoint,
};

const CROSSING_SPAN_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub tax_treatment: TaxTreatment,
    pub balance: f64,
    pub annual_contribution: f64,
    pub annual_return: f64,
}

impl Account {
    pub fn new(
        name: impl Into<String>,
        tax_treatment: TaxTreatment,
        balance: f64,
        annual_contribution: f64,
        annual_return: f64,
    ) -> Self {
        Self {
            name: name.into(),
            tax_treatment,
            balance,
            annual_contribution,
            annual_return: annual_return.clamp(MIN_RETURN, MAX_RETURN),
        }
    }

    pub fn from_input(input: &AccountInput, default_return: f64) -> Self {
        let annual_return = match input.annual_return.as_ref() {
            Some(raw) => normalize_raw_return(Some(raw)),
            None => normalize_return(Some(default_return)),
        };
        Self::new(
            input.name.clone(),
            input.treatment(),
            input.starting_balance,
            input.annual_contribution,
            annual_return,
        )
    }

    /// Growth first, then the contribution lands at year end.
    fn advance_year(&mut self) {
        self.balance = self.balance * (1.0 + self.annual_return) + self.annual_contribution;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portfolio {
    accounts: Vec<Account>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts are keyed by name; inserting an existing name replaces it in place.
    pub fn insert(&mut self, account: Account) {
        match self.accounts.iter_mut().find(|a| a.name == account.name) {
            Some(existing) => *existing = account,
            None => self.accounts.push(account),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.accounts.iter().map(|a| a.balance).sum()
    }

    fn advance_year(&mut self) {
        for account in &mut self.accounts {
            account.advance_year();
        }
    }
}

impl FromIterator<Account> for Portfolio {
    fn from_iter<I: IntoIterator<Item = Account>>(iter: I) -> Self {
        let mut portfolio = Portfolio::new();
        for account in iter {
            portfolio.insert(account);
        }
        portfolio
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionSettings {
    pub horizon_years: u32,
    pub retirement_years: u32,
    pub inflation_rate: f64,
    pub crossing_policy: CrossingPolicy,
}

pub fn crossing_time(
    year: u32,
    prev_total: f64,
    total: f64,
    target: f64,
    policy: CrossingPolicy,
) -> f64 {
    match policy {
        CrossingPolicy::WholeYear => year as f64,
        CrossingPolicy::Fractional => {
            let span = (total - prev_total).max(CROSSING_SPAN_EPS);
            let fraction = ((target - prev_total) / span).clamp(0.0, 1.0);
            year.saturating_sub(1) as f64 + fraction
        }
    }
}

pub fn deflate(nominal: f64, inflation_rate: f64, years: f64) -> f64 {
    nominal / (1.0 + inflation_rate).powf(years)
}

pub fn project(
    portfolio: &Portfolio,
    targets: &[MilestoneTarget],
    settings: &ProjectionSettings,
) -> SimulationResult {
    let mut portfolio = portfolio.clone();
    let cpi = settings.inflation_rate;
    let starting_total = portfolio.total();

    let mut crossed = targets
        .iter()
        .map(|t| (starting_total >= t.target).then_some(0.0))
        .collect::<Vec<Option<f64>>>();
    let full_index = targets.iter().position(|t| t.kind == MilestoneKind::Full);

    let mut snapshots = Vec::new();
    let mut full_fi_years = full_index.and_then(|idx| crossed[idx]);
    if full_fi_years.is_some() {
        snapshots.push(take_snapshot(&portfolio, Checkpoint::FullFi, 0, 0.0, cpi));
    }

    let mut years = Vec::with_capacity(settings.horizon_years as usize);
    let mut retirement_taken = false;

    for year in 1..=settings.horizon_years {
        let prev_total = portfolio.total();
        portfolio.advance_year();
        let total = portfolio.total();

        years.push(YearPoint {
            year,
            nominal_total: total,
            real_total: deflate(total, cpi, year as f64),
        });

        for (idx, target) in targets.iter().enumerate() {
            if crossed[idx].is_some() || !(prev_total < target.target && target.target <= total) {
                continue;
            }
            let at = crossing_time(
                year,
                prev_total,
                total,
                target.target,
                settings.crossing_policy,
            );
            crossed[idx] = Some(at);
            debug!(target: "projection", milestone = ?target.kind, year, at, "milestone crossed");

            if Some(idx) == full_index {
                full_fi_years = Some(at);
                snapshots.push(take_snapshot(&portfolio, Checkpoint::FullFi, year, at, cpi));
            }
        }

        if year == 5 {
            snapshots.push(take_snapshot(&portfolio, Checkpoint::FiveYears, year, 5.0, cpi));
        }
        if year == 10 {
            snapshots.push(take_snapshot(&portfolio, Checkpoint::TenYears, year, 10.0, cpi));
        }
        if year == settings.retirement_years {
            snapshots.push(take_snapshot(
                &portfolio,
                Checkpoint::Retirement,
                year,
                year as f64,
                cpi,
            ));
            retirement_taken = true;
        }
    }

    if !retirement_taken {
        let last_year = settings.horizon_years;
        debug!(
            target: "projection",
            retirement_years = settings.retirement_years,
            last_year,
            "retirement beyond horizon, using final year snapshot"
        );
        snapshots.push(take_snapshot(
            &portfolio,
            Checkpoint::Retirement,
            last_year,
            last_year as f64,
            cpi,
        ));
    }

    let milestones = targets
        .iter()
        .zip(crossed)
        .map(|(target, years_to_reach)| MilestoneOutcome {
            kind: target.kind,
            name: target.name.clone(),
            target: target.target,
            years_to_reach,
        })
        .collect();

    SimulationResult {
        starting_total,
        years,
        milestones,
        full_fi_years,
        snapshots,
    }
}

fn take_snapshot(
    portfolio: &Portfolio,
    checkpoint: Checkpoint,
    year: u32,
    horizon_years: f64,
    cpi: f64,
) -> Snapshot {
    let accounts = portfolio
        .accounts()
        .iter()
        .map(|a| AccountBalance {
            name: a.name.clone(),
            bucket: a.tax_treatment.bucket(),
            nominal: a.balance,
            real: deflate(a.balance, cpi, horizon_years),
        })
        .collect::<Vec<_>>();

    let mut sums: BTreeMap<TaxBucket, (f64, f64)> = BTreeMap::new();
    for account in &accounts {
        let entry = sums.entry(account.bucket).or_insert((0.0, 0.0));
        entry.0 += account.nominal;
        entry.1 += account.real;
    }
    let buckets = sums
        .into_iter()
        .map(|(bucket, (nominal, real))| BucketBalance {
            bucket,
            label: bucket.label(),
            nominal,
            real,
        })
        .collect();

    Snapshot {
        checkpoint,
        year,
        horizon_years,
        accounts,
        buckets,
    }
}
