//! Reference data the clinic bills and budgets against.

use super::text;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use store_framework::Searchable;

/// A billable dental procedure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Procedure {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcedureForm {
    pub name: String,
    pub price: i64,
}

impl Searchable for Procedure {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![text(&self.name), Some(Cow::Owned(self.price.to_string()))]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseCategory {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub color: String,
    pub budget_amount: i64,
    pub budget_period: String,
    pub expense_type: String,
    pub is_tax_deductible: bool,
    pub cost_center: String,
    pub account_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_category_id: Option<i64>,
    pub is_active: bool,
    pub requires_approval: bool,
    pub approval_threshold: i64,
    pub reporting_group: String,
    pub sort_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpenseCategoryForm {
    pub name: String,
    pub description: String,
    pub color: String,
    pub budget_amount: i64,
    pub budget_period: String,
    pub expense_type: String,
    pub is_tax_deductible: bool,
    pub cost_center: String,
    pub account_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_category_id: Option<i64>,
    pub is_active: bool,
    pub requires_approval: bool,
    pub approval_threshold: i64,
    pub reporting_group: String,
    pub sort_order: i64,
}

impl Searchable for ExpenseCategory {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![text(&self.name), text(&self.description)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_framework::filter_items;

    #[test]
    fn procedures_match_by_price() {
        let procedures = vec![
            Procedure {
                name: "Filling".to_string(),
                price: 1500,
                ..Procedure::default()
            },
            Procedure {
                name: "Scaling".to_string(),
                price: 800,
                ..Procedure::default()
            },
        ];
        assert_eq!(filter_items(&procedures, "150")[0].name, "Filling");
        assert_eq!(filter_items(&procedures, "LING").len(), 2);
    }
}
