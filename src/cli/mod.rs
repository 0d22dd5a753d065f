use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::core::{
    AccountInput, ConfigurationError, CrossingPolicy, DEFAULT_RETURN, FilingStatus, Inputs,
    LimitHint, PlanResult, RawReturn, TaxSchedule, duplicate_account_name, run_plan,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFilingStatus {
    Single,
    #[value(alias = "married-filing-jointly")]
    Married,
}

impl From<CliFilingStatus> for FilingStatus {
    fn from(value: CliFilingStatus) -> Self {
        match value {
            CliFilingStatus::Single => FilingStatus::Single,
            CliFilingStatus::Married => FilingStatus::Married,
        }
    }
}

impl From<FilingStatus> for CliFilingStatus {
    fn from(value: FilingStatus) -> Self {
        match value {
            FilingStatus::Single => CliFilingStatus::Single,
            FilingStatus::Married => CliFilingStatus::Married,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCrossingPolicy {
    WholeYear,
    Fractional,
}

impl From<CliCrossingPolicy> for CrossingPolicy {
    fn from(value: CliCrossingPolicy) -> Self {
        match value {
            CliCrossingPolicy::WholeYear => CrossingPolicy::WholeYear,
            CliCrossingPolicy::Fractional => CrossingPolicy::Fractional,
        }
    }
}

impl From<CrossingPolicy> for CliCrossingPolicy {
    fn from(value: CrossingPolicy) -> Self {
        match value {
            CrossingPolicy::WholeYear => CliCrossingPolicy::WholeYear,
            CrossingPolicy::Fractional => CliCrossingPolicy::Fractional,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read input payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigurationError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanPayload {
    filing_status: Option<FilingStatus>,
    gross_salary: Option<f64>,
    pension_percent: Option<f64>,
    annual_expenses: Option<f64>,
    swr_percent: Option<f64>,
    inflation_percent: Option<f64>,
    expense_inflation: Option<bool>,

    current_age: Option<u32>,
    target_age: Option<u32>,
    horizon_age: Option<u32>,

    current_investments: Option<f64>,
    other_return: Option<f64>,
    default_return: Option<f64>,
    coast_growth: Option<f64>,

    accounts: Option<Vec<AccountInput>>,
    limits: Option<BTreeMap<LimitHint, f64>>,
    crossing_policy: Option<CrossingPolicy>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "fire-planner",
    about = "Federal + Virginia tax summary and FI milestone projection"
)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = CliFilingStatus::Single)]
    filing_status: CliFilingStatus,
    #[arg(long, default_value_t = 150000.0)]
    gross_salary: f64,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Pension contribution in percent of gross salary"
    )]
    pension_percent: f64,
    #[arg(long, default_value_t = 45000.0)]
    annual_expenses: f64,
    #[arg(long, default_value_t = 4.0, help = "Safe withdrawal rate in percent")]
    swr: f64,
    #[arg(long, default_value_t = 3.0, help = "Annual CPI in percent")]
    inflation_rate: f64,
    #[arg(
        long,
        help = "Inflate expenses by CPI to the retirement horizon for nominal FI guide lines"
    )]
    expense_inflation: bool,
    #[arg(long, default_value_t = 40)]
    current_age: u32,
    #[arg(long, default_value_t = 58, help = "Target retirement age")]
    target_age: u32,
    #[arg(
        long,
        help = "Age to stop the projection; never more than 50 years are simulated"
    )]
    horizon_age: Option<u32>,
    #[arg(
        long,
        help = "Current total investment value; the part not assigned to an account becomes Other Investments"
    )]
    current_investments: Option<f64>,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Other Investments expected annual return in percent"
    )]
    other_return: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Return in percent for accounts without an explicit return"
    )]
    default_return: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Growth in percent used to discount the Full FI number for Coast FI"
    )]
    coast_growth_rate: f64,
    #[arg(
        long = "account",
        value_parser = parse_account_spec,
        help = "Account as NAME=BALANCE,CONTRIBUTION[,RETURN]; RETURN may be a fraction or a percent"
    )]
    accounts: Vec<AccountInput>,
    #[arg(long, default_value_t = 7000.0, help = "IRA (Traditional + Roth) annual limit")]
    ira_limit: f64,
    #[arg(long, default_value_t = 23500.0, help = "457(b) employee deferral limit")]
    limit_457b: f64,
    #[arg(long, default_value_t = 23500.0, help = "403(b) employee deferral limit")]
    limit_403b: f64,
    #[arg(long, default_value_t = 8550.0, help = "HSA (family) annual limit")]
    hsa_limit: f64,
    #[arg(long, default_value_t = 3300.0, help = "FSA (health) annual limit")]
    fsa_limit: f64,
    #[arg(
        long,
        default_value_t = 4000.0,
        help = "Deductible amount of education (529) contributions"
    )]
    education_deduction_cap: f64,
    #[arg(long, value_enum, default_value_t = CliCrossingPolicy::WholeYear)]
    crossing_policy: CliCrossingPolicy,
    #[arg(long, help = "JSON payload whose fields override the flags")]
    input: Option<PathBuf>,
}

fn parse_amount(field: Option<&str>, what: &str) -> Result<f64, String> {
    let text = field
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| format!("missing {what}"))?;
    text.replace(['$', '_'], "")
        .parse::<f64>()
        .map_err(|e| format!("invalid {what} '{text}': {e}"))
}

fn parse_account_spec(spec: &str) -> Result<AccountInput, String> {
    let (name, rest) = spec
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=BALANCE,CONTRIBUTION[,RETURN], got '{spec}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("account name must not be empty".to_string());
    }

    let mut fields = rest.split(',');
    let starting_balance = parse_amount(fields.next(), "balance")?;
    let annual_contribution = parse_amount(fields.next(), "contribution")?;
    let annual_return = fields
        .next()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| RawReturn::Text(r.to_string()));
    if fields.next().is_some() {
        return Err(format!("too many fields in account spec '{spec}'"));
    }

    Ok(AccountInput {
        name: name.to_string(),
        tax_treatment: None,
        starting_balance,
        annual_contribution,
        annual_return,
    })
}

pub fn default_accounts() -> Vec<AccountInput> {
    vec![
        AccountInput::new("Crypto", 250_000.0, 15_000.0).with_return(0.20),
        AccountInput::new("Traditional IRA", 67_000.0, 0.0).with_return(DEFAULT_RETURN),
        AccountInput::new("Roth IRA", 123_000.0, 5_000.0).with_return(DEFAULT_RETURN),
        AccountInput::new("457(b) Traditional", 112_000.0, 15_000.0).with_return(DEFAULT_RETURN),
        AccountInput::new("457(b) Roth", 300.0, 0.0).with_return(DEFAULT_RETURN),
        AccountInput::new("403(b) Traditional", 176_000.0, 23_500.0).with_return(DEFAULT_RETURN),
        AccountInput::new("403(b) Roth", 28_000.0, 0.0).with_return(DEFAULT_RETURN),
    ]
}

pub fn apply_payload(cli: &mut Cli, payload: PlanPayload) {
    if let Some(v) = payload.filing_status {
        cli.filing_status = v.into();
    }
    if let Some(v) = payload.gross_salary {
        cli.gross_salary = v;
    }
    if let Some(v) = payload.pension_percent {
        cli.pension_percent = v;
    }
    if let Some(v) = payload.annual_expenses {
        cli.annual_expenses = v;
    }
    if let Some(v) = payload.swr_percent {
        cli.swr = v;
    }
    if let Some(v) = payload.inflation_percent {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.expense_inflation {
        cli.expense_inflation = v;
    }

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.target_age {
        cli.target_age = v;
    }
    if let Some(v) = payload.horizon_age {
        cli.horizon_age = Some(v);
    }

    if let Some(v) = payload.current_investments {
        cli.current_investments = Some(v);
    }
    if let Some(v) = payload.other_return {
        cli.other_return = v;
    }
    if let Some(v) = payload.default_return {
        cli.default_return = v;
    }
    if let Some(v) = payload.coast_growth {
        cli.coast_growth_rate = v;
    }

    if let Some(v) = payload.accounts {
        cli.accounts = v;
    }
    for (hint, limit) in payload.limits.unwrap_or_default() {
        match hint {
            LimitHint::Ira => cli.ira_limit = limit,
            LimitHint::Deferral457b => cli.limit_457b = limit,
            LimitHint::Deferral403b => cli.limit_403b = limit,
            LimitHint::Hsa => cli.hsa_limit = limit,
            LimitHint::Fsa => cli.fsa_limit = limit,
            LimitHint::Education => cli.education_deduction_cap = limit,
        }
    }
    if let Some(v) = payload.crossing_policy {
        cli.crossing_policy = v.into();
    }
}

fn check_amount(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigurationError::invalid(
            field,
            format!("must be a finite amount >= 0, got {value}"),
        ));
    }
    Ok(())
}

fn check_rate_percent(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value <= -100.0 {
        return Err(ConfigurationError::invalid(
            field,
            format!("must be > -100, got {value}"),
        ));
    }
    Ok(())
}

pub fn build_inputs(cli: Cli) -> Result<Inputs, ConfigurationError> {
    check_amount("--gross-salary", cli.gross_salary)?;
    check_amount("--annual-expenses", cli.annual_expenses)?;

    if !(0.0..=100.0).contains(&cli.pension_percent) {
        return Err(ConfigurationError::invalid(
            "--pension-percent",
            "must be between 0 and 100",
        ));
    }

    if !cli.swr.is_finite() {
        return Err(ConfigurationError::invalid(
            "--swr",
            format!("must be a finite percent, got {}", cli.swr),
        ));
    }
    if cli.swr <= 0.0 {
        return Err(ConfigurationError::NonPositiveSwr {
            swr: cli.swr / 100.0,
        });
    }
    if cli.swr > 100.0 {
        return Err(ConfigurationError::invalid("--swr", "must be <= 100"));
    }

    if !(0.0..=100.0).contains(&cli.inflation_rate) {
        return Err(ConfigurationError::invalid(
            "--inflation-rate",
            "must be between 0 and 100",
        ));
    }

    if let Some(horizon_age) = cli.horizon_age {
        if horizon_age <= cli.current_age {
            return Err(ConfigurationError::invalid(
                "--horizon-age",
                "must be > --current-age",
            ));
        }
    }

    if let Some(current) = cli.current_investments {
        check_amount("--current-investments", current)?;
    }

    check_rate_percent("--other-return", cli.other_return)?;
    check_rate_percent("--default-return", cli.default_return)?;
    check_rate_percent("--coast-growth-rate", cli.coast_growth_rate)?;

    for (field, limit) in [
        ("--ira-limit", cli.ira_limit),
        ("--limit-457b", cli.limit_457b),
        ("--limit-403b", cli.limit_403b),
        ("--hsa-limit", cli.hsa_limit),
        ("--fsa-limit", cli.fsa_limit),
        ("--education-deduction-cap", cli.education_deduction_cap),
    ] {
        check_amount(field, limit)?;
    }

    let accounts = if cli.accounts.is_empty() {
        default_accounts()
    } else {
        cli.accounts
    };
    for account in &accounts {
        if account.name.trim().is_empty() {
            return Err(ConfigurationError::invalid(
                "--account",
                "account name must not be empty",
            ));
        }
        for value in [account.starting_balance, account.annual_contribution] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::invalid(
                    "--account",
                    format!("{}: balances and contributions must be >= 0", account.name),
                ));
            }
        }
    }

    if let Some(name) = duplicate_account_name(&accounts) {
        return Err(ConfigurationError::invalid(
            "--account",
            format!("duplicate account name '{name}'"),
        ));
    }

    let filing_status: FilingStatus = cli.filing_status.into();

    Ok(Inputs {
        filing_status,
        schedule: TaxSchedule::for_filing_status(filing_status),
        gross_salary: cli.gross_salary,
        pension_rate: cli.pension_percent / 100.0,
        annual_expenses: cli.annual_expenses,
        swr: cli.swr / 100.0,
        inflation_rate: cli.inflation_rate / 100.0,
        expense_inflation_mode: cli.expense_inflation,
        current_age: cli.current_age,
        target_age: cli.target_age,
        horizon_cap_age: cli.horizon_age,
        current_investments: cli.current_investments,
        other_investments_return: cli.other_return / 100.0,
        default_return: cli.default_return / 100.0,
        coast_growth_rate: cli.coast_growth_rate / 100.0,
        accounts,
        contribution_limit_hints: BTreeMap::from([
            (LimitHint::Ira, cli.ira_limit),
            (LimitHint::Deferral457b, cli.limit_457b),
            (LimitHint::Deferral403b, cli.limit_403b),
            (LimitHint::Hsa, cli.hsa_limit),
            (LimitHint::Fsa, cli.fsa_limit),
            (LimitHint::Education, cli.education_deduction_cap),
        ]),
        crossing_policy: cli.crossing_policy.into(),
    })
}

pub fn inputs_from_json(mut cli: Cli, json: &str) -> Result<Inputs, CliError> {
    let payload = serde_json::from_str::<PlanPayload>(json)?;
    apply_payload(&mut cli, payload);
    Ok(build_inputs(cli)?)
}

pub fn run(cli: Cli) -> Result<PlanResult, CliError> {
    let inputs = match cli.input.clone() {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            inputs_from_json(cli, &json)?
        }
        None => build_inputs(cli)?,
    };
    Ok(run_plan(&inputs)?)
}
