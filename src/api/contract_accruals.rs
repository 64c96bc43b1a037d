//! Contract accruals.

use super::ResourceDefinition;

/// `contractaccruals` resource, keyed by contract document number.
pub static CONTRACT_ACCRUALS: ResourceDefinition =
    ResourceDefinition::new("contractaccruals", "ContractAccrual", "ContractAccruals")
        .readable(&[
            "@url",
            "AccrualAccount",
            "AccrualRows",
            "CostAccount",
            "Description",
            "DocumentNumber",
            "Period",
            "Times",
            "Total",
            "VATIncluded",
        ])
        .writeable(&[
            "AccrualAccount",
            "AccrualRows",
            "CostAccount",
            "Description",
            "DocumentNumber",
            "Period",
            "Times",
            "Total",
            "VATIncluded",
        ])
        .required_on_create(&["DocumentNumber"]);
