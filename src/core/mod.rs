mod engine;
mod types;

pub use engine::{
    FicaBreakdown, compute_bracket_tax, compute_fica, compute_income_tax, derive_budget,
    non_negative,
};
pub use types::{
    Bracket, BudgetRow, BudgetSnapshot, PayrollParams, ResolutionRule, RowKind, TaxComponent,
    TaxSchedule, TaxSchema, Timeframe, UserExpense,
};
