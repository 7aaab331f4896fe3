use crate::query::{
    CalculateChainQuery, ChainLink, ChainQuery, ExecutionContext, LogicChainQuery, QueryChain,
    Scope,
};
use crate::source::AxiomCollection;
use crate::template::{
    ArithmeticOperation, ComparisonOperator, EvaluationStatus, Expr, QualifiedName, Template,
};
use crate::{Axiom, Locale, QueryError, Solution, Term, TermValue};

fn salaries() -> AxiomCollection {
    let mut collection = AxiomCollection::new();
    collection.insert_axioms(
        "salary",
        vec![
            Axiom::new("salary", vec![Term::new("name", "John"), Term::new("amount", 100)]),
            Axiom::new("salary", vec![Term::new("name", "Mary"), Term::new("amount", 250)]),
        ],
    );
    collection
}

fn pay_link() -> ChainLink {
    let template = Template::builder("pay", "salary")
        .variable("name")
        .variable("amount")
        .criterion(Expr::comparison(
            Expr::var("name"),
            ComparisonOperator::Equal,
            Expr::qualified("who", "name"),
        ))
        .build();
    ChainLink::new(LogicChainQuery::new(template, salaries()))
}

fn bonus_link() -> ChainLink {
    let template = Template::builder("bonus", "pay")
        .evaluator(
            "amount",
            Expr::arithmetic(
                Expr::qualified("pay", "amount"),
                ArithmeticOperation::Multiply,
                Expr::literal(2),
            ),
        )
        .build();
    ChainLink::new(CalculateChainQuery::new(template))
}

fn who(name: &str) -> Axiom {
    Axiom::new("who", vec![Term::new("name", name)])
}

#[test]
fn test_chain_runs_links_in_order() {
    let mut chain = QueryChain::new();
    chain.push(pay_link());
    chain.push(bonus_link());
    let mut solution = Solution::new();
    solution.put("who", who("Mary"));
    let mut stack = Vec::new();
    let mut context = ExecutionContext::new();

    let status = chain.execute_query(&mut solution, &mut stack, &mut context).unwrap();

    assert_eq!(status, EvaluationStatus::Complete);
    assert_eq!(solution.get_axiom("pay").value("amount"), Some(&TermValue::Integer(250)));
    assert_eq!(solution.get_axiom("bonus").value("amount"), Some(&TermValue::Integer(500)));
    assert_eq!(
        stack,
        vec![QualifiedName::global("pay"), QualifiedName::global("bonus")]
    );
}

#[test]
fn test_failed_link_short_circuits_and_withdraws() {
    let mut chain = QueryChain::new();
    chain.push(bonus_link());
    chain.push(pay_link());
    let mut solution = Solution::new();
    solution.put("who", who("Nobody"));
    solution.put("pay", Axiom::new("pay", vec![Term::new("amount", 1)]));
    let mut stack = Vec::new();
    let mut context = ExecutionContext::new();

    let status = chain.execute_query(&mut solution, &mut stack, &mut context).unwrap();

    assert_eq!(status, EvaluationStatus::ShortCircuit);
    assert!(!solution.contains("bonus"));
    assert!(solution.contains("who"));
}

#[test]
fn test_repeated_template_rewinds_chain() {
    let mut chain = QueryChain::new();
    chain.push(pay_link());
    let mut solution = Solution::new();
    let mut stack = Vec::new();
    let mut context = ExecutionContext::new();

    solution.put("who", who("John"));
    chain.execute_query(&mut solution, &mut stack, &mut context).unwrap();
    assert_eq!(solution.get_axiom("pay").value("amount"), Some(&TermValue::Integer(100)));

    // A second pass must not keep John's bindings
    solution.put("who", who("Mary"));
    let status = chain.execute_query(&mut solution, &mut stack, &mut context).unwrap();

    assert_eq!(status, EvaluationStatus::Complete);
    assert_eq!(solution.get_axiom("pay").value("amount"), Some(&TermValue::Integer(250)));
    assert_eq!(stack.len(), 1);
}

#[test]
fn test_missing_source_is_an_error() {
    let template = Template::builder("pay", "payroll").variable("name").build();
    let mut chain = QueryChain::new();
    chain.push(ChainLink::new(LogicChainQuery::new(template, salaries())));
    let mut stack = Vec::new();

    let result = chain.execute_query(
        &mut Solution::new(),
        &mut stack,
        &mut ExecutionContext::new(),
    );

    assert!(matches!(result, Err(QueryError::AxiomSourceNotFound(key)) if key == "payroll"));
}

#[test]
fn test_properties_initialize_link_template() {
    let link = pay_link().with_properties(vec![Term::new("name", "John")]);
    let mut chain = QueryChain::new();
    chain.push(link);
    let mut solution = Solution::new();
    solution.put("who", who("John"));
    let mut stack = Vec::new();

    let status = chain
        .execute_query(&mut solution, &mut stack, &mut ExecutionContext::new())
        .unwrap();

    assert_eq!(status, EvaluationStatus::Complete);
    assert_eq!(solution.get_axiom("pay").value("amount"), Some(&TermValue::Integer(100)));
}

#[test]
fn test_calculation_seeded_from_solution_entry() {
    let template = Template::builder("next_year", "who")
        .variable("name")
        .evaluator(
            "age",
            Expr::arithmetic(
                Expr::qualified("who", "age"),
                ArithmeticOperation::Add,
                Expr::literal(1),
            ),
        )
        .build();
    let mut chain = QueryChain::new();
    chain.push(ChainLink::new(CalculateChainQuery::new(template).with_seed_key("who")));
    let mut solution = Solution::new();
    solution.put("who", Axiom::new("who", vec![Term::new("name", "Tim"), Term::new("age", 12)]));
    let mut stack = Vec::new();

    chain
        .execute_query(&mut solution, &mut stack, &mut ExecutionContext::new())
        .unwrap();

    let next = solution.get_axiom("next_year");
    assert_eq!(next.value("name"), Some(&TermValue::from("Tim")));
    assert_eq!(next.value("age"), Some(&TermValue::Integer(13)));
}

#[test]
fn test_scope_notifier_switches_context() {
    let scope = Scope::new("hr").with_locale(Locale::new("de-DE"));
    let link = pay_link().with_scope(scope.notifier());
    let mut chain = QueryChain::new();
    chain.push(link);
    let mut solution = Solution::new();
    solution.put("who", who("John"));
    let mut context = ExecutionContext::new();

    chain
        .execute_query(&mut solution, &mut Vec::new(), &mut context)
        .unwrap();

    assert_eq!(context.active_scope(), "hr");
    assert_eq!(context.locale().tag(), "de-DE");
}

#[test]
fn test_chain_query_variants() {
    let logic: ChainQuery = LogicChainQuery::new(
        Template::builder("pay", "salary").variable("name").build(),
        salaries(),
    )
    .into();
    let calculate: ChainQuery =
        CalculateChainQuery::new(Template::builder("bonus", "pay").build()).into();

    assert!(matches!(logic, ChainQuery::Logic(_)));
    assert!(matches!(calculate, ChainQuery::Calculate(_)));
    assert_eq!(logic.template_name().name, "pay");
    assert_eq!(calculate.template_name().name, "bonus");
}
