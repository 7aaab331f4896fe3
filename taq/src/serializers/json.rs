use crate::{Axiom, QueryError, QueryResult, Solution, Term, TermValue};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::str::FromStr;

/// Convert a term value to JSON.
///
/// Decimals become JSON numbers when serde_json can hold them, otherwise
/// strings. Nested axioms become objects.
pub fn term_value_to_json(value: &TermValue) -> Value {
    match value {
        TermValue::Integer(i) => Value::from(*i),
        TermValue::Decimal(d) => Number::from_str(&d.normalize().to_string())
            .map(Value::Number)
            .unwrap_or_else(|_| Value::String(d.to_string())),
        TermValue::Text(s) => Value::String(s.clone()),
        TermValue::Boolean(b) => Value::Bool(*b),
        TermValue::Axiom(axiom) => axiom_to_json(axiom),
        TermValue::List(items) => Value::Array(items.iter().map(term_value_to_json).collect()),
    }
}

/// An object of the axiom's terms. Anonymous terms are keyed by position.
pub fn axiom_to_json(axiom: &Axiom) -> Value {
    let mut object = Map::new();
    for (index, term) in axiom.terms().iter().enumerate() {
        let key = if term.is_anonymous() {
            index.to_string()
        } else {
            term.name.clone()
        };
        object.insert(key, term_value_to_json(&term.value));
    }
    Value::Object(object)
}

/// Every solution entry, keyed by qualified template name
pub fn solution_to_json(solution: &Solution) -> Value {
    let object = solution
        .iter()
        .map(|(key, axiom)| (key.to_string(), axiom_to_json(axiom)))
        .collect();
    Value::Object(object)
}

/// Read axioms named `name` from JSON.
///
/// Accepts one object or an array of objects. Object members become named
/// terms: whole numbers become integers, other numbers decimals, nested
/// objects axioms named after their member, and arrays lists.
pub fn axioms_from_json(name: &str, json: &str) -> QueryResult<Vec<Axiom>> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Object(object) => Ok(vec![object_to_axiom(name, &object)?]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(object) => object_to_axiom(name, object),
                other => Err(QueryError::InvalidAxiomData(format!(
                    "Expected object for axiom '{}', got {}",
                    name, other
                ))),
            })
            .collect(),
        other => Err(QueryError::InvalidAxiomData(format!(
            "Expected object or array for axiom '{}', got {}",
            name, other
        ))),
    }
}

fn object_to_axiom(name: &str, object: &Map<String, Value>) -> QueryResult<Axiom> {
    let terms = object
        .iter()
        .map(|(key, value)| Ok(Term::new(key.clone(), json_to_term_value(key, value)?)))
        .collect::<QueryResult<Vec<Term>>>()?;
    Ok(Axiom::new(name, terms))
}

fn json_to_term_value(key: &str, value: &Value) -> QueryResult<TermValue> {
    match value {
        Value::Bool(b) => Ok(TermValue::Boolean(*b)),
        Value::String(s) => Ok(TermValue::Text(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(TermValue::Integer(i)),
            None => {
                let text = n.to_string();
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map(TermValue::Decimal)
                    .map_err(|_| {
                        QueryError::InvalidAxiomData(format!(
                            "Number '{}' for term '{}' is out of range",
                            text, key
                        ))
                    })
            }
        },
        Value::Object(object) => Ok(TermValue::Axiom(object_to_axiom(key, object)?)),
        Value::Array(items) => items
            .iter()
            .map(|item| json_to_term_value(key, item))
            .collect::<QueryResult<Vec<_>>>()
            .map(TermValue::List),
        Value::Null => Err(QueryError::InvalidAxiomData(format!(
            "Term '{}' has no value",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_becomes_one_axiom() -> QueryResult<()> {
        let axioms = axioms_from_json("person", r#"{"name": "John", "age": 23}"#)?;

        assert_eq!(axioms.len(), 1);
        assert_eq!(axioms[0].name(), "person");
        assert_eq!(axioms[0].value("name"), Some(&TermValue::from("John")));
        assert_eq!(axioms[0].value("age"), Some(&TermValue::Integer(23)));
        Ok(())
    }

    #[test]
    fn test_term_order_follows_document() -> QueryResult<()> {
        let json = r#"{"name": "John", "age": 23, "city": "Oslo"}"#;
        let axioms = axioms_from_json("person", json)?;

        assert_eq!(axioms[0].archetype(), vec!["name", "age", "city"]);
        Ok(())
    }

    #[test]
    fn test_array_of_objects() -> QueryResult<()> {
        let json = r#"[{"name": "John"}, {"name": "Mary"}, {"name": "Sue"}]"#;
        let axioms = axioms_from_json("person", json)?;

        assert_eq!(axioms.len(), 3);
        assert_eq!(axioms[2].value("name"), Some(&TermValue::from("Sue")));
        Ok(())
    }

    #[test]
    fn test_fractional_number_is_decimal() -> QueryResult<()> {
        let axioms = axioms_from_json("price", r#"{"amount": 12.5}"#)?;

        assert_eq!(
            axioms[0].value("amount"),
            Some(&TermValue::Decimal(Decimal::new(125, 1)))
        );
        Ok(())
    }

    #[test]
    fn test_nested_object_and_array() -> QueryResult<()> {
        let json = r#"{"address": {"city": "Oslo"}, "tags": ["a", "b"]}"#;
        let axioms = axioms_from_json("person", json)?;

        let Some(TermValue::Axiom(address)) = axioms[0].value("address") else {
            panic!("address should be an axiom");
        };
        assert_eq!(address.name(), "address");
        assert_eq!(address.value("city"), Some(&TermValue::from("Oslo")));
        assert_eq!(
            axioms[0].value("tags"),
            Some(&TermValue::List(vec!["a".into(), "b".into()]))
        );
        Ok(())
    }

    #[test]
    fn test_null_is_rejected() {
        let result = axioms_from_json("person", r#"{"name": null}"#);

        assert!(matches!(result, Err(QueryError::InvalidAxiomData(_))));
        assert!(result.unwrap_err().to_string().contains("name"));
    }

    #[test]
    fn test_scalar_document_is_rejected() {
        assert!(axioms_from_json("person", "42").is_err());
        assert!(axioms_from_json("person", "[1, 2]").is_err());
        assert!(axioms_from_json("person", "{not json").is_err());
    }

    #[test]
    fn test_solution_to_json() {
        let mut solution = Solution::new();
        solution.put(
            "who",
            Axiom::new(
                "who",
                vec![
                    Term::new("name", "John"),
                    Term::new("score", Decimal::new(15, 1)),
                    Term::anonymous(true),
                ],
            ),
        );

        assert_eq!(
            solution_to_json(&solution),
            json!({"who": {"name": "John", "score": 1.5, "2": true}})
        );
    }
}
