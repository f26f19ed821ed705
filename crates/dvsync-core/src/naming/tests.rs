use super::*;

#[test]
fn test_prefix_is_taken_before_first_separator() {
    assert_eq!(customization_prefix("cr123_Customer"), Some("cr123"));
    assert_eq!(customization_prefix("new_order_line"), Some("new"));
}

#[test]
fn test_prefix_without_separator_is_whole_name() {
    assert_eq!(customization_prefix("Account"), Some("Account"));
    assert_eq!(customization_prefix("_orphan"), Some("orphan"));
    assert_eq!(customization_prefix("__new_order"), Some("new"));
}

#[test]
fn test_blank_name_has_no_prefix() {
    assert_eq!(customization_prefix(""), None);
    assert_eq!(customization_prefix("   "), None);
    assert_eq!(customization_prefix("___"), None);
}

#[test]
fn test_sanitize_identifier() {
    assert_eq!(sanitize_identifier("Order_Line-Id"), "orderlineid");
    assert_eq!(sanitize_identifier("___"), "customfield");

    let long = "a".repeat(60);
    assert_eq!(sanitize_identifier(&long).len(), MAX_SANITIZED_LENGTH);
}

#[test]
fn test_pascal_case() {
    assert_eq!(pascal_case("order_line_id"), "OrderLineId");
    assert_eq!(pascal_case("code"), "Code");
    assert_eq!(pascal_case("createdAt"), "Createdat");
    assert_eq!(pascal_case("customerID"), "Customerid");
    assert_eq!(pascal_case("ORDER_ID"), "OrderId");
    assert_eq!(pascal_case("--"), "CustomField");
}

#[test]
fn test_generated_names() {
    assert_eq!(attribute_logical_name("cr123", "Code"), "cr123_code");
    assert_eq!(attribute_schema_name("cr123", "postal_code"), "cr123_PostalCode");
    assert_eq!(key_logical_name("CR123", "UQ_Customer_Code"), "cr123_uqcustomercode");
}
