//! Column names, fill defaults and table kinds shared by every stage.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const EMPLOYEE_ID: &str = "employee_id";
pub const NAME: &str = "name";
pub const EMAIL: &str = "email";
pub const PHONE_NUMBER: &str = "phone_number";
pub const JOIN_DATE: &str = "join_date";
pub const PAYMENT_DATE: &str = "payment_date";
pub const SALARY: &str = "salary";
pub const PENSION_AMOUNT: &str = "pension_amount";

/// Salary `payment_date` after the merge.
pub const SALARY_PAYMENT_DATE: &str = "salary_payment_date";
/// Pension `payment_date` after the merge.
pub const PENSION_PAYMENT_DATE: &str = "pension_payment_date";
/// Derived column: `salary * exchange_rate`.
pub const SALARY_USD: &str = "salary_usd";

pub const DEFAULT_EMAIL: &str = "unknown@example.com";
pub const DEFAULT_PHONE_NUMBER: &str = "000-000-0000";
pub const DEFAULT_SALARY: f64 = 0.0;
pub const DEFAULT_PENSION_AMOUNT: f64 = 0.0;

/// The three input tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Employees,
    Salaries,
    Pensions,
}

impl TableKind {
    /// Every table, in load order.
    pub const ALL: [TableKind; 3] = [Self::Employees, Self::Salaries, Self::Pensions];

    /// Columns that must be present in the input file.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Employees => &[EMPLOYEE_ID, NAME, EMAIL, PHONE_NUMBER, JOIN_DATE],
            Self::Salaries => &[EMPLOYEE_ID, PAYMENT_DATE, SALARY],
            Self::Pensions => &[EMPLOYEE_ID, PAYMENT_DATE, PENSION_AMOUNT],
        }
    }

    /// Columns whose values identify a unique record. The last duplicate wins.
    pub fn uniqueness_key(&self) -> &'static [&'static str] {
        match self {
            Self::Employees => &[EMAIL],
            Self::Salaries | Self::Pensions => &[EMPLOYEE_ID, PAYMENT_DATE],
        }
    }

    /// Date columns normalized to `YYYY-MM-DD`.
    pub fn date_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Employees => &[JOIN_DATE],
            Self::Salaries | Self::Pensions => &[PAYMENT_DATE],
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Employees => "employees",
            Self::Salaries => "salaries",
            Self::Pensions => "pensions",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
