use super::*;

fn person() -> XRType {
    XRType::product(
        "Person",
        vec![
            ("name".to_string(), XRType::Value),
            ("active".to_string(), XRType::BooleanExpression),
        ],
    )
}

#[test]
fn test_generic_never_overrides() {
    assert_eq!(XRType::Value.retype_from(&XRType::Generic), XRType::Value);
    assert_eq!(person().retype_from(&XRType::Generic), person());
    assert_eq!(XRType::Generic.retype_from(&person()), person());
}

#[test]
fn test_boolean_value_dominates() {
    assert_eq!(
        XRType::BooleanExpression.retype_from(&XRType::BooleanValue),
        XRType::BooleanValue
    );
    assert_eq!(
        XRType::BooleanValue.retype_from(&XRType::Value),
        XRType::BooleanValue
    );
    assert_eq!(
        XRType::Value.retype_from(&XRType::BooleanExpression),
        XRType::BooleanExpression
    );
}

#[test]
fn test_product_merge_is_outer_join() {
    let fresh = XRType::product(
        "Person",
        vec![
            ("active".to_string(), XRType::BooleanValue),
            ("age".to_string(), XRType::Value),
        ],
    );
    let merged = person().retype_from(&fresh);
    assert_eq!(merged.field("name"), Some(&XRType::Value));
    assert_eq!(merged.field("active"), Some(&XRType::BooleanValue));
    assert_eq!(merged.field("age"), Some(&XRType::Value));
}

#[test]
fn test_display_product() {
    assert_eq!(
        person().to_string(),
        "Person(name: Value, active: BooleanExpression)"
    );
}
