use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    BudgetRow, BudgetSnapshot, ResolutionRule, RowKind, TaxSchedule, Timeframe, UserExpense,
    derive_budget,
};

const SCHEDULE_SINGLE_JSON: &str = include_str!("../../data/schedule_single.json");
const SCHEDULE_MARRIED_JSON: &str = include_str!("../../data/schedule_married.json");

// Substituted for any jurisdiction key the schedule does not know before
// the engine is invoked. Present in both schedule documents.
const FALLBACK_JURISDICTION: &str = "None";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFilingStatus {
    Single,
    Married,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiFilingStatus {
    Single,
    #[serde(alias = "marriedFilingJointly", alias = "married_filing_jointly")]
    Married,
}

impl From<ApiFilingStatus> for CliFilingStatus {
    fn from(value: ApiFilingStatus) -> Self {
        match value {
            ApiFilingStatus::Single => CliFilingStatus::Single,
            ApiFilingStatus::Married => CliFilingStatus::Married,
        }
    }
}

impl From<CliFilingStatus> for ApiFilingStatus {
    fn from(value: CliFilingStatus) -> Self {
        match value {
            CliFilingStatus::Single => ApiFilingStatus::Single,
            CliFilingStatus::Married => ApiFilingStatus::Married,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliTimeframe {
    Year,
    Month,
    Biweek,
    Week,
    Day,
}

impl From<CliTimeframe> for Timeframe {
    fn from(value: CliTimeframe) -> Self {
        match value {
            CliTimeframe::Year => Timeframe::Year,
            CliTimeframe::Month => Timeframe::Month,
            CliTimeframe::Biweek => Timeframe::Biweek,
            CliTimeframe::Week => Timeframe::Week,
            CliTimeframe::Day => Timeframe::Day,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiTimeframe {
    #[serde(alias = "annual", alias = "yearly")]
    Year,
    #[serde(alias = "monthly")]
    Month,
    #[serde(alias = "biweekly", alias = "bi-week")]
    Biweek,
    #[serde(alias = "weekly")]
    Week,
    #[serde(alias = "daily")]
    Day,
}

impl From<ApiTimeframe> for CliTimeframe {
    fn from(value: ApiTimeframe) -> Self {
        match value {
            ApiTimeframe::Year => CliTimeframe::Year,
            ApiTimeframe::Month => CliTimeframe::Month,
            ApiTimeframe::Biweek => CliTimeframe::Biweek,
            ApiTimeframe::Week => CliTimeframe::Week,
            ApiTimeframe::Day => CliTimeframe::Day,
        }
    }
}

impl From<Timeframe> for ApiTimeframe {
    fn from(value: Timeframe) -> Self {
        match value {
            Timeframe::Year => ApiTimeframe::Year,
            Timeframe::Month => ApiTimeframe::Month,
            Timeframe::Biweek => ApiTimeframe::Biweek,
            Timeframe::Week => ApiTimeframe::Week,
            Timeframe::Day => ApiTimeframe::Day,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "takehome",
    about = "Household budget estimator (progressive income tax + FICA + expense resolution)"
)]
struct Cli {
    #[arg(long, default_value_t = 60_000.0, help = "Gross annual salary in dollars")]
    salary: f64,
    #[arg(long, value_enum, default_value_t = CliFilingStatus::Single)]
    filing_status: CliFilingStatus,
    #[arg(
        long,
        default_value = "California",
        help = "Jurisdiction key from the tax schedule; unknown keys fall back to \"None\""
    )]
    jurisdiction: String,
    #[arg(
        long,
        value_enum,
        default_value_t = CliTimeframe::Year,
        help = "Display timeframe for per-period amounts"
    )]
    timeframe: CliTimeframe,
}

#[derive(Debug, Clone)]
struct Settings {
    salary: f64,
    filing_status: CliFilingStatus,
    jurisdiction: String,
    timeframe: Timeframe,
}

#[derive(Debug)]
struct ApiRequest {
    settings: Settings,
    expenses: Vec<UserExpense>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BudgetPayload {
    salary: Option<f64>,
    filing_status: Option<ApiFilingStatus>,
    jurisdiction: Option<String>,
    timeframe: Option<ApiTimeframe>,
    expenses: Option<Vec<ExpensePayload>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ExpensePayload {
    name: Option<String>,
    is_pre_tax: Option<bool>,
    amount: Option<f64>,
    percent_of_salary: Option<f64>,
    percent_of_post_tax_income: Option<f64>,
    order: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct JurisdictionsQuery {
    filing_status: Option<ApiFilingStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRow {
    name: String,
    #[serde(flatten)]
    kind: RowKind,
    amount_annual: f64,
    amount_display: f64,
}

impl ApiRow {
    fn from_row(row: &BudgetRow, timeframe: Timeframe) -> Self {
        Self {
            name: row.name.clone(),
            kind: row.kind,
            amount_annual: row.amount_annual,
            amount_display: row.amount_annual / timeframe.periods_per_year(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BudgetResponse {
    schedule_version: String,
    filing_status: ApiFilingStatus,
    jurisdiction: String,
    timeframe: ApiTimeframe,
    periods_per_year: f64,
    salary: f64,
    pre_tax_total: f64,
    taxable_income: f64,
    total_taxes: f64,
    post_tax_base: f64,
    post_tax_user_total: f64,
    discretionary: ApiRow,
    rows: Vec<ApiRow>,
    user_expenses: Vec<UserExpense>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JurisdictionsResponse {
    schedule_version: String,
    filing_status: ApiFilingStatus,
    jurisdictions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
    endpoints: [&'static str; 2],
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_settings(cli: Cli) -> Result<Settings, String> {
    if !cli.salary.is_finite() || cli.salary < 0.0 {
        return Err("--salary must be a non-negative number".to_string());
    }

    if cli.jurisdiction.trim().is_empty() {
        return Err("--jurisdiction must not be empty".to_string());
    }

    Ok(Settings {
        salary: cli.salary,
        filing_status: cli.filing_status,
        jurisdiction: cli.jurisdiction,
        timeframe: cli.timeframe.into(),
    })
}

fn validate_percent(index: usize, field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(format!(
            "expenses[{index}].{field} must be a fraction between 0 and 1"
        ));
    }
    Ok(())
}

fn expense_from_payload(index: usize, payload: ExpensePayload) -> Result<UserExpense, String> {
    let name = payload.name.unwrap_or_default();
    if name.trim().is_empty() {
        return Err(format!("expenses[{index}].name is required"));
    }

    let is_pre_tax = payload.is_pre_tax.unwrap_or(false);
    let amount = payload.amount.unwrap_or(0.0);
    if !amount.is_finite() {
        return Err(format!("expenses[{index}].amount must be a finite number"));
    }

    let rule = match (
        payload.percent_of_salary,
        payload.percent_of_post_tax_income,
    ) {
        (Some(_), Some(_)) => {
            return Err(format!(
                "expenses[{index}]: percentOfSalary and percentOfPostTaxIncome are mutually exclusive"
            ));
        }
        (Some(pct), None) => {
            validate_percent(index, "percentOfSalary", pct)?;
            ResolutionRule::PercentOfSalary(pct)
        }
        (None, Some(pct)) => {
            if is_pre_tax {
                return Err(format!(
                    "expenses[{index}]: percentOfPostTaxIncome is not allowed on a pre-tax expense"
                ));
            }
            validate_percent(index, "percentOfPostTaxIncome", pct)?;
            ResolutionRule::PercentOfPostTaxIncome(pct)
        }
        (None, None) => ResolutionRule::FixedAmount,
    };

    Ok(UserExpense {
        name,
        is_pre_tax,
        amount_annual: amount,
        rule,
        order: payload.order.unwrap_or(index as u32),
    })
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<BudgetPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: BudgetPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.salary {
        cli.salary = v;
    }
    if let Some(v) = payload.filing_status {
        cli.filing_status = v.into();
    }
    if let Some(v) = payload.jurisdiction {
        cli.jurisdiction = v;
    }
    if let Some(v) = payload.timeframe {
        cli.timeframe = v.into();
    }

    let settings = build_settings(cli)?;

    let mut expenses = Vec::new();
    for (index, expense) in payload.expenses.unwrap_or_default().into_iter().enumerate() {
        expenses.push(expense_from_payload(index, expense)?);
    }

    Ok(ApiRequest { settings, expenses })
}

fn default_cli_for_api() -> Cli {
    Cli {
        salary: 60_000.0,
        filing_status: CliFilingStatus::Single,
        jurisdiction: "California".to_string(),
        timeframe: CliTimeframe::Year,
    }
}

fn load_schedule(filing_status: CliFilingStatus) -> Result<TaxSchedule, String> {
    let raw = match filing_status {
        CliFilingStatus::Single => SCHEDULE_SINGLE_JSON,
        CliFilingStatus::Married => SCHEDULE_MARRIED_JSON,
    };
    serde_json::from_str(raw).map_err(|e| format!("Invalid tax schedule document: {e}"))
}

fn resolve_jurisdiction(schedule: &TaxSchedule, requested: &str) -> String {
    if schedule.jurisdictions.contains_key(requested) {
        requested.to_string()
    } else {
        FALLBACK_JURISDICTION.to_string()
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route(
            "/api/budget",
            get(budget_get_handler).post(budget_post_handler),
        )
        .route("/api/jurisdictions", get(jurisdictions_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Budget HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> Response {
    json_response(
        StatusCode::OK,
        ServiceInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            endpoints: ["/api/budget", "/api/jurisdictions"],
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn budget_get_handler(Query(payload): Query<BudgetPayload>) -> Response {
    budget_handler_impl(payload).await
}

async fn budget_post_handler(Json(payload): Json<BudgetPayload>) -> Response {
    budget_handler_impl(payload).await
}

async fn budget_handler_impl(payload: BudgetPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let schedule = match load_schedule(request.settings.filing_status) {
        Ok(schedule) => schedule,
        Err(msg) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg),
    };

    let jurisdiction = resolve_jurisdiction(&schedule, &request.settings.jurisdiction);
    let snapshot = derive_budget(
        request.settings.salary,
        &request.expenses,
        &schedule,
        &jurisdiction,
    );

    let response = build_budget_response(&request, &schedule, jurisdiction, &snapshot);
    json_response(StatusCode::OK, response)
}

async fn jurisdictions_handler(Query(query): Query<JurisdictionsQuery>) -> Response {
    let filing_status: CliFilingStatus = query
        .filing_status
        .unwrap_or(ApiFilingStatus::Single)
        .into();
    let schedule = match load_schedule(filing_status) {
        Ok(schedule) => schedule,
        Err(msg) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg),
    };

    json_response(
        StatusCode::OK,
        JurisdictionsResponse {
            schedule_version: schedule.version,
            filing_status: filing_status.into(),
            jurisdictions: schedule.jurisdictions.into_keys().collect(),
        },
    )
}

fn build_budget_response(
    request: &ApiRequest,
    schedule: &TaxSchedule,
    jurisdiction: String,
    snapshot: &BudgetSnapshot,
) -> BudgetResponse {
    let timeframe = request.settings.timeframe;
    BudgetResponse {
        schedule_version: schedule.version.clone(),
        filing_status: request.settings.filing_status.into(),
        jurisdiction,
        timeframe: timeframe.into(),
        periods_per_year: timeframe.periods_per_year(),
        salary: snapshot.salary,
        pre_tax_total: snapshot.pre_tax_total,
        taxable_income: snapshot.taxable_income,
        total_taxes: snapshot.total_taxes,
        post_tax_base: snapshot.post_tax_base,
        post_tax_user_total: snapshot.post_tax_user_total,
        discretionary: ApiRow::from_row(&snapshot.discretionary, timeframe),
        rows: snapshot
            .rows
            .iter()
            .map(|row| ApiRow::from_row(row, timeframe))
            .collect(),
        user_expenses: request.expenses.clone(),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
