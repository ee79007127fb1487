use super::types::{
    Bracket, BudgetRow, BudgetSnapshot, PayrollParams, ResolutionRule, RowKind, TaxComponent,
    TaxSchedule, TaxSchema, UserExpense,
};

/// The one floor-at-zero combinator. Every accumulation point in the
/// pipeline clamps through here so the policy stays uniform. NaN clamps
/// to zero as well.
pub fn non_negative(x: f64) -> f64 {
    x.max(0.0)
}

/// Progressive marginal-rate tax over an ordered, non-overlapping bracket
/// set covering `[0, inf)`. Negative income clamps to zero. Behavior is
/// defined only for well-formed ascending brackets; malformed sets are not
/// validated.
pub fn compute_bracket_tax(taxable_income: f64, brackets: &[Bracket]) -> f64 {
    let base = non_negative(taxable_income);
    let mut tax = 0.0;
    for bracket in brackets {
        if base <= bracket.lower {
            break;
        }
        let upper = bracket.upper.unwrap_or(f64::INFINITY);
        let slice = non_negative(base.min(upper) - bracket.lower);
        tax += slice * bracket.rate;
    }
    non_negative(tax)
}

/// Income tax under a jurisdiction's declared schema: zero, flat rate, or
/// progressive brackets, each after the schema's own standard deduction.
/// Serves both the federal schema and the state/jurisdiction schemas;
/// their contracts are identical.
pub fn compute_income_tax(income: f64, schema: &TaxSchema) -> f64 {
    match schema {
        TaxSchema::None => 0.0,
        TaxSchema::Flat {
            rate,
            standard_deduction,
        } => non_negative(income - standard_deduction) * rate,
        TaxSchema::Brackets {
            brackets,
            standard_deduction,
        } => compute_bracket_tax(non_negative(income - standard_deduction), brackets),
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FicaBreakdown {
    pub oasdi: f64,
    pub medicare: f64,
    pub surtax: f64,
}

impl FicaBreakdown {
    pub fn total(self) -> f64 {
        self.oasdi + self.medicare + self.surtax
    }
}

/// Payroll tax triple. The three components are independent, each computed
/// against the full payroll base, not sequential brackets drawing from a
/// shared remainder: OASDI is hard-capped at the wage base, Medicare is
/// uncapped, and the surtax applies only to income above its threshold
/// when both threshold and rate are configured and non-zero.
pub fn compute_fica(income: f64, params: &PayrollParams) -> FicaBreakdown {
    let base = non_negative(income);
    let oasdi = base.min(params.oasdi_wage_base) * params.oasdi_rate;
    let medicare = base * params.medicare_rate;
    let surtax = match (params.surtax_threshold, params.surtax_rate) {
        (Some(threshold), Some(rate)) if threshold != 0.0 && rate != 0.0 => {
            non_negative(base - threshold) * rate
        }
        _ => 0.0,
    };
    FicaBreakdown {
        oasdi,
        medicare,
        surtax,
    }
}

fn resolve_pre_tax(expense: &UserExpense, salary: f64) -> f64 {
    // Pre-tax expenses may reference salary only; a post-tax-income rule
    // on a pre-tax expense has nothing to resolve against and falls back
    // to the stored amount.
    let amount = match expense.rule {
        ResolutionRule::PercentOfSalary(pct) => salary * pct,
        ResolutionRule::FixedAmount | ResolutionRule::PercentOfPostTaxIncome(_) => {
            expense.amount_annual
        }
    };
    non_negative(amount)
}

fn resolve_post_tax(expense: &UserExpense, salary: f64, post_tax_base: f64) -> f64 {
    let amount = match expense.rule {
        ResolutionRule::PercentOfPostTaxIncome(pct) => post_tax_base * pct,
        ResolutionRule::PercentOfSalary(pct) => salary * pct,
        ResolutionRule::FixedAmount => expense.amount_annual,
    };
    non_negative(amount)
}

fn tax_row(name: String, component: TaxComponent, amount: f64) -> BudgetRow {
    BudgetRow {
        name,
        kind: RowKind::Tax(component),
        amount_annual: amount,
    }
}

/// Derive a full budget snapshot from a salary, an expense snapshot, a tax
/// schedule document, and a jurisdiction key. Pure: identical inputs yield
/// bit-identical output.
///
/// The stage order is a data-dependency order and must not change: pre-tax
/// resolution -> taxable income -> taxes -> post-tax base -> post-tax
/// resolution -> discretionary remainder. A jurisdiction key absent from
/// the schedule resolves to zero tax, never an error.
pub fn derive_budget(
    salary_annual: f64,
    expenses: &[UserExpense],
    schedule: &TaxSchedule,
    jurisdiction: &str,
) -> BudgetSnapshot {
    let salary = non_negative(salary_annual);

    let mut pre_tax_rows = Vec::new();
    let mut pre_tax_total = 0.0;
    for expense in expenses.iter().filter(|e| e.is_pre_tax) {
        let amount = resolve_pre_tax(expense, salary);
        pre_tax_total += amount;
        pre_tax_rows.push(BudgetRow {
            name: expense.name.clone(),
            kind: RowKind::PreTaxExpense,
            amount_annual: amount,
        });
    }

    let taxable_income = non_negative(salary - pre_tax_total);

    let federal = compute_income_tax(taxable_income, &schedule.federal);
    let fica = compute_fica(taxable_income, &schedule.payroll);
    let schema = schedule
        .jurisdictions
        .get(jurisdiction)
        .unwrap_or(&TaxSchema::None);
    let jurisdiction_tax = compute_income_tax(taxable_income, schema);

    let mut taxes = vec![
        tax_row(
            "Federal Income Tax".to_string(),
            TaxComponent::Federal,
            federal,
        ),
        tax_row(
            "Social Security (OASDI)".to_string(),
            TaxComponent::Oasdi,
            fica.oasdi,
        ),
        tax_row(
            "Medicare".to_string(),
            TaxComponent::Medicare,
            fica.medicare,
        ),
    ];
    // The surtax row is omitted entirely when it computes to zero, not
    // shown as a zero line.
    if fica.surtax > 0.0 {
        taxes.push(tax_row(
            "Additional Medicare Tax".to_string(),
            TaxComponent::MedicareSurtax,
            fica.surtax,
        ));
    }
    taxes.push(tax_row(
        format!("{jurisdiction} Income Tax"),
        TaxComponent::Jurisdiction,
        jurisdiction_tax,
    ));

    let total_taxes: f64 = taxes.iter().map(|row| row.amount_annual).sum();
    let post_tax_base = non_negative(salary - pre_tax_total - total_taxes);

    let mut post_tax_expenses: Vec<&UserExpense> =
        expenses.iter().filter(|e| !e.is_pre_tax).collect();
    post_tax_expenses.sort_by_key(|e| e.order);

    let mut post_tax_rows = Vec::with_capacity(post_tax_expenses.len());
    let mut post_tax_user_total = 0.0;
    for expense in post_tax_expenses {
        let amount = resolve_post_tax(expense, salary, post_tax_base);
        post_tax_user_total += amount;
        post_tax_rows.push(BudgetRow {
            name: expense.name.clone(),
            kind: RowKind::PostTaxExpense,
            amount_annual: amount,
        });
    }

    // Overspending silently zeroes the remainder rather than going
    // negative or signaling an error.
    let discretionary = BudgetRow {
        name: "Discretionary".to_string(),
        kind: RowKind::Discretionary,
        amount_annual: non_negative(post_tax_base - post_tax_user_total),
    };

    let mut rows = Vec::with_capacity(pre_tax_rows.len() + taxes.len() + post_tax_rows.len() + 1);
    rows.extend(pre_tax_rows);
    rows.extend(taxes.iter().cloned());
    rows.extend(post_tax_rows);
    rows.push(discretionary.clone());

    BudgetSnapshot {
        salary,
        pre_tax_total,
        taxable_income,
        taxes,
        total_taxes,
        post_tax_base,
        post_tax_user_total,
        discretionary,
        rows,
    }
}
