//! Price lists.

use super::ResourceDefinition;

/// `pricelists` resource.
pub static PRICE_LISTS: ResourceDefinition = ResourceDefinition::new("pricelists", "PriceList", "PriceLists")
    .readable(&["@url", "Code", "Comments", "Description", "PreSelected"])
    .writeable(&["Code", "Comments", "Description", "PreSelected"])
    .required_on_create(&["Code", "Description"]);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_list_schema() {
        let schema = PRICE_LISTS.schema().unwrap();
        assert!(schema.is_readable("@url"));
        assert!(!schema.is_writeable("@url"));
    }

    #[test]
    fn test_price_list_create_body() {
        let schema = PRICE_LISTS.schema().unwrap();
        let request = PRICE_LISTS.create_request(json!({
            "Code": "A1",
            "Description": "desc",
            "@url": "https://api.example.com/3/pricelists/A1"
        }));

        let body = schema
            .filter(request.required(), request.wrapper_key(), request.data())
            .unwrap();
        assert_eq!(body, json!({"PriceList": {"Code": "A1", "Description": "desc"}}));
    }
}
