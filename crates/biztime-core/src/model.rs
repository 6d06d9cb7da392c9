use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A company, keyed by its normalized `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub code: String,
    pub name: String,
    pub description: String,
}

/// An invoice billed to a company.
///
/// `paid_date` is set exactly when `paid` is true; see
/// [`crate::shape::PaymentChange`] for how updates keep that pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub comp_code: String,
    pub amt: f64,
    pub paid: bool,
    pub add_date: String,
    pub paid_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Industry {
    pub code: String,
    pub industry: String,
}

/// A company together with everything that hangs off it.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyDetail {
    pub company: Company,
    pub invoices: Vec<Invoice>,
    /// Display names of the industries the company belongs to.
    pub industries: Vec<String>,
}

/// An invoice together with the company it is billed to.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub company: Company,
}

/// Industry code mapped to the codes of its associated companies.
///
/// Industries without companies map to an empty list.
pub type IndustryCompanies = BTreeMap<String, Vec<String>>;
