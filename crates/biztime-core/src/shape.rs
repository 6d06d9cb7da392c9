use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::IndustryCompanies;

/// Formats an instant the way the store keeps timestamps.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Folds `(industry_code, company_code)` rows from a left join into a
/// mapping. An industry whose only row carries no company still gets an
/// entry with an empty list.
pub fn group_industry_companies<I>(rows: I) -> IndustryCompanies
where
    I: IntoIterator<Item = (String, Option<String>)>,
{
    let mut grouped = IndustryCompanies::new();
    for (industry, company) in rows {
        let companies = grouped.entry(industry).or_default();
        if let Some(company) = company {
            companies.push(company);
        }
    }
    grouped
}

/// The payment columns an invoice update writes.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentChange {
    pub paid: bool,
    pub paid_date: Option<String>,
}

impl PaymentChange {
    /// Paying stamps `paid_date` with `now`; anything else clears it.
    /// An omitted flag counts as unpaid.
    pub fn resolve(paid: Option<bool>, now: DateTime<Utc>) -> Self {
        match paid {
            Some(true) => Self {
                paid: true,
                paid_date: Some(timestamp(now)),
            },
            Some(false) | None => Self {
                paid: false,
                paid_date: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row(industry: &str, company: Option<&str>) -> (String, Option<String>) {
        (industry.to_string(), company.map(str::to_string))
    }

    #[test]
    fn test_group_keeps_empty_industries() {
        let grouped = group_industry_companies(vec![
            row("tech", Some("tesla")),
            row("energy", None),
            row("tech", Some("apple")),
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["tech"], vec!["tesla", "apple"]);
        assert!(grouped["energy"].is_empty());
    }

    #[test]
    fn test_group_serializes_as_bare_object() {
        let grouped = group_industry_companies(vec![row("tech", Some("tesla")), row("energy", None)]);
        let json = serde_json::to_value(&grouped).unwrap();
        assert_eq!(json, serde_json::json!({ "tech": ["tesla"], "energy": [] }));
    }

    #[test]
    fn test_payment_change() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let paid = PaymentChange::resolve(Some(true), now);
        assert!(paid.paid);
        assert_eq!(paid.paid_date.as_deref(), Some("2024-03-01T12:30:00.000Z"));

        for flag in [Some(false), None] {
            let unpaid = PaymentChange::resolve(flag, now);
            assert!(!unpaid.paid);
            assert!(unpaid.paid_date.is_none());
        }
    }
}
