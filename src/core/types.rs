use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One marginal-rate band. `upper: None` means unbounded; the JSON
/// documents simply omit the `upper` key on the top bracket.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub lower: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
    pub rate: f64,
}

/// How a jurisdiction (or the federal government) taxes income. A closed
/// three-way variant: call sites dispatch exhaustively, so a fourth scheme
/// is a compile-time-checked addition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaxSchema {
    None,
    Flat {
        rate: f64,
        #[serde(default, rename = "standardDeduction")]
        standard_deduction: f64,
    },
    Brackets {
        brackets: Vec<Bracket>,
        #[serde(default, rename = "standardDeduction")]
        standard_deduction: f64,
    },
}

/// FICA-equivalent payroll tax parameters. The surtax applies only when
/// both `surtax_threshold` and `surtax_rate` are present and non-zero.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollParams {
    pub oasdi_rate: f64,
    pub oasdi_wage_base: f64,
    pub medicare_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surtax_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surtax_rate: Option<f64>,
}

/// A versioned tax schedule document, one per filing status. Read-only
/// configuration supplied by the caller; the engine never mutates it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSchedule {
    pub version: String,
    pub filing_status: String,
    pub federal: TaxSchema,
    pub payroll: PayrollParams,
    pub jurisdictions: BTreeMap<String, TaxSchema>,
}

/// How a user expense's annual amount is resolved at derivation time.
/// A single tagged rule instead of two nullable percentage fields, so the
/// mutually-exclusive invariant is unrepresentable rather than maintained.
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "kebab-case")]
pub enum ResolutionRule {
    #[default]
    FixedAmount,
    PercentOfSalary(f64),
    PercentOfPostTaxIncome(f64),
}

/// A user-defined expense, passed into the engine as an immutable
/// snapshot. `amount_annual` is canonical yearly dollars; `order` matters
/// only for post-tax display ordering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserExpense {
    pub name: String,
    pub is_pre_tax: bool,
    pub amount_annual: f64,
    #[serde(default)]
    pub rule: ResolutionRule,
    #[serde(default)]
    pub order: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxComponent {
    Federal,
    Oasdi,
    Medicare,
    MedicareSurtax,
    Jurisdiction,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "component", rename_all = "kebab-case")]
pub enum RowKind {
    PreTaxExpense,
    Tax(TaxComponent),
    PostTaxExpense,
    Discretionary,
}

/// One resolved line item in the assembled budget.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRow {
    pub name: String,
    #[serde(flatten)]
    pub kind: RowKind,
    pub amount_annual: f64,
}

/// The complete derivation output consumed by presentation and
/// persistence. All amounts are canonical annual dollars.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSnapshot {
    pub salary: f64,
    pub pre_tax_total: f64,
    pub taxable_income: f64,
    pub taxes: Vec<BudgetRow>,
    pub total_taxes: f64,
    pub post_tax_base: f64,
    pub post_tax_user_total: f64,
    pub discretionary: BudgetRow,
    pub rows: Vec<BudgetRow>,
}

/// Display timeframe. Purely presentational: annual amounts are divided by
/// the period count for display and never mutated in storage.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Timeframe {
    Year,
    Month,
    Biweek,
    Week,
    Day,
}

impl Timeframe {
    pub fn periods_per_year(self) -> f64 {
        match self {
            Timeframe::Year => 1.0,
            Timeframe::Month => 12.0,
            Timeframe::Biweek => 26.0,
            Timeframe::Week => 52.0,
            Timeframe::Day => 365.0,
        }
    }
}
