use serde_json::json;
use std::rc::Rc;
use taq::query::{KeyName, QueryLauncher, QueryParams, QuerySpec, ScopeRegistry};
use taq::serializers::{axioms_from_json, solution_to_json};
use taq::template::{ComparisonOperator, Expr, Template};
use taq::{QueryResult, Solution};

#[test]
fn test_query_over_json_axioms() -> QueryResult<()> {
    let people = axioms_from_json(
        "person",
        r#"[
            {"name": "John", "age": 23, "address": {"city": "Oslo"}},
            {"name": "Mary", "age": 31.5, "address": {"city": "Bergen"}}
        ]"#,
    )?;

    let mut registry = ScopeRegistry::new();
    let global = registry.global_mut();
    global.add_axioms("person", people);
    global.add_template(
        Template::builder("older", "person")
            .variable("name")
            .variable("age")
            .criterion(Expr::comparison(
                Expr::var("age"),
                ComparisonOperator::GreaterThan,
                Expr::literal(30),
            ))
            .build(),
    );

    let spec = QuerySpec::new("older").key(KeyName::new("person", "older"));
    let mut params = QueryParams::new(spec, Rc::new(registry));
    params.set_handler(Box::new(|solution: &Solution| {
        assert_eq!(
            solution_to_json(solution),
            json!({"older": {"name": "Mary", "age": 31.5}})
        );
        true
    }));

    assert_eq!(QueryLauncher::launch(&mut params)?, 1);
    Ok(())
}

#[test]
fn test_solution_to_json_nested_values() -> QueryResult<()> {
    let axioms = axioms_from_json(
        "order",
        r#"{"id": 7, "lines": [1, 2], "customer": {"name": "Sue", "vip": true}}"#,
    )?;
    let mut solution = Solution::new();
    solution.put("order", axioms[0].clone());

    assert_eq!(
        solution_to_json(&solution),
        json!({
            "order": {
                "customer": {"name": "Sue", "vip": true},
                "id": 7,
                "lines": [1, 2]
            }
        })
    );
    Ok(())
}

#[test]
fn test_invalid_json_is_reported() {
    let err = axioms_from_json("person", r#"{"name": }"#).unwrap_err();
    assert!(err.to_string().to_lowercase().contains("axiom"));
}
