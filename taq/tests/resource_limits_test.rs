use std::rc::Rc;
use taq::query::{
    ChainSpec, ExecutionContext, KeyName, QueryLauncher, QueryParams, QuerySpec, ScopeRegistry,
};
use taq::template::Template;
use taq::{Axiom, QueryError, ResourceLimits, Term};

fn registry(count: i64) -> Rc<ScopeRegistry> {
    let mut registry = ScopeRegistry::new();
    let global = registry.global_mut();
    global.add_axioms(
        "n",
        (0..count)
            .map(|i| Axiom::new("n", vec![Term::new("value", i)]))
            .collect(),
    );
    global.add_template(Template::builder("n", "n").variable("value").build());
    global.add_template(Template::builder("m", "n").variable("value").build());
    Rc::new(registry)
}

#[test]
fn test_default_limits() {
    let limits = ResourceLimits::default();
    assert_eq!(limits.max_candidates, 1_000_000);
    assert_eq!(limits.max_chain_depth, 64);
    assert_eq!(limits.max_evaluation_time_ms, 10_000);
}

#[test]
fn test_limits_from_json_fill_defaults() {
    let limits = ResourceLimits::from_json(r#"{"max_candidates": 50}"#).unwrap();
    assert_eq!(limits.max_candidates, 50);
    assert_eq!(limits.max_chain_depth, 64);

    assert!(ResourceLimits::from_json("{").is_err());
}

#[test]
fn test_candidate_limit() {
    let limits = ResourceLimits {
        max_candidates: 10,
        ..ResourceLimits::default()
    };
    // 4 x 4 join reads 4 + 16 candidates
    let spec = QuerySpec::new("pairs")
        .key(KeyName::new("n", "n"))
        .key(KeyName::new("n", "m"));
    let mut params =
        QueryParams::new(spec, registry(4)).with_context(ExecutionContext::with_limits(limits));

    match QueryLauncher::launch(&mut params) {
        Err(QueryError::ResourceLimitExceeded {
            limit_name,
            limit_value,
            actual_value,
        }) => {
            assert_eq!(limit_name, "max_candidates");
            assert_eq!(limit_value, "10");
            assert_eq!(actual_value, "11");
        }
        other => panic!("Expected ResourceLimitExceeded error, got {:?}", other),
    }
}

#[test]
fn test_candidate_count_restarts_per_launch() {
    let limits = ResourceLimits {
        max_candidates: 5,
        ..ResourceLimits::default()
    };
    let registry = registry(5);
    for _ in 0..3 {
        let spec = QuerySpec::new("all").key(KeyName::new("n", "n"));
        let mut params = QueryParams::new(spec, Rc::clone(&registry))
            .with_context(ExecutionContext::with_limits(limits.clone()));
        assert_eq!(QueryLauncher::launch(&mut params).unwrap(), 5);
    }
}

#[test]
fn test_chain_depth_limit() {
    let limits = ResourceLimits {
        max_chain_depth: 2,
        ..ResourceLimits::default()
    };
    let spec = QuerySpec::new("deep")
        .key(KeyName::new("n", "n"))
        .chain(ChainSpec::logic("m"))
        .chain(ChainSpec::logic("m"));
    let mut params =
        QueryParams::new(spec, registry(1)).with_context(ExecutionContext::with_limits(limits));

    match QueryLauncher::launch(&mut params) {
        Err(QueryError::ResourceLimitExceeded { limit_name, .. }) => {
            assert_eq!(limit_name, "max_chain_depth");
        }
        other => panic!("Expected ResourceLimitExceeded error, got {:?}", other),
    }
}

#[test]
fn test_evaluation_timeout() {
    let limits = ResourceLimits {
        max_evaluation_time_ms: 0,
        ..ResourceLimits::default()
    };
    let spec = QuerySpec::new("pairs")
        .key(KeyName::new("n", "n"))
        .key(KeyName::new("n", "m"));
    let mut params =
        QueryParams::new(spec, registry(200)).with_context(ExecutionContext::with_limits(limits));

    match QueryLauncher::launch(&mut params) {
        Err(QueryError::ResourceLimitExceeded { limit_name, .. }) => {
            assert_eq!(limit_name, "max_evaluation_time_ms");
        }
        other => panic!("Expected timeout, got {:?}", other),
    }
}
