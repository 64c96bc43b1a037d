//! Chart of accounts.

use super::ResourceDefinition;

/// `accounts` resource, keyed by account number.
///
/// Accounts can be listed with the `active` or `inactive` filter.
pub static ACCOUNTS: ResourceDefinition = ResourceDefinition::new("accounts", "Account", "Accounts")
    .readable(&[
        "@url",
        "Active",
        "BalanceBroughtForward",
        "BalanceCarriedForward",
        "CostCenter",
        "CostCenterSettings",
        "Description",
        "Number",
        "Project",
        "ProjectSettings",
        "QuantitySettings",
        "QuantityUnit",
        "SRU",
        "TransactionInformation",
        "TransactionInformationSettings",
        "VATCode",
        "Year",
    ])
    .writeable(&[
        "Active",
        "BalanceBroughtForward",
        "CostCenter",
        "CostCenterSettings",
        "Description",
        "Number",
        "Project",
        "ProjectSettings",
        "QuantitySettings",
        "QuantityUnit",
        "SRU",
        "TransactionInformation",
        "TransactionInformationSettings",
        "VATCode",
    ])
    .required_on_create(&["Number", "Description"])
    .filters(&["active", "inactive"]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueryOptions, SortOrder};
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_account_query_respects_declaration() {
        let options = QueryOptions::new(ACCOUNTS.schema().unwrap())
            .filter("inactive")
            .filter("archived")
            .sort_by("Number")
            .sort_by("Balance")
            .sort_order("descending");

        let pairs = options.to_query_pairs(Utc::now());
        assert!(pairs.contains(&("filter".to_string(), "inactive".to_string())));
        assert!(pairs.contains(&("sortby".to_string(), "number".to_string())));
        assert_eq!(options.order(), SortOrder::Descending);
    }

    #[test]
    fn test_carried_forward_balance_is_read_only() {
        let schema = ACCOUNTS.schema().unwrap();
        let request = ACCOUNTS.update_request(
            "1930",
            json!({"Description": "Bank", "BalanceCarriedForward": 1200.5, "Year": 3}),
        );

        let body = schema
            .filter(request.required(), request.wrapper_key(), request.data())
            .unwrap();
        assert_eq!(body, json!({"Account": {"Description": "Bank"}}));
    }
}
