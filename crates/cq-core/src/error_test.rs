use super::*;
use crate::test_utils::*;
use crate::Query;

#[test]
fn test_typing_error_carries_subtree() {
    let p = person("p");
    let q = Query::map(people(), p.clone(), prop(&p, "age"));
    let err = XrError::typing("age is not a row", &q);
    match &err {
        XrError::Typing { message, subtree } => {
            assert_eq!(message, "age is not a row");
            assert_eq!(subtree, &q.to_string());
        }
        other => panic!("expected Typing, got {}", other),
    }
    let shown = err.to_string();
    assert!(shown.starts_with("[XR003] Type error: age is not a row"), "{}", shown);
    assert!(shown.ends_with(&format!("in: {}", q)), "{}", shown);
}

#[test]
fn test_every_tree_error_names_its_subtree() {
    let q = people();
    for err in [
        XrError::parse_shape("shape", &q),
        XrError::structural("structure", &q),
        XrError::typing("type", &q),
    ] {
        assert!(err.to_string().contains(&format!("\n  in: {}", q)), "{}", err);
    }
}
