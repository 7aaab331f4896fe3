use crate::query::{
    CalculateChainQuery, ChainLink, ChainQueryExecuter, ExecutionContext, KeyName,
    LogicChainQuery, LogicQuery, LogicQueryExecuter, QueryChain, QueryExecuter, Stage,
};
use crate::source::{AxiomCollection, AxiomListSource, AxiomSource};
use crate::template::{ArithmeticOperation, ComparisonOperator, Expr, Template};
use crate::{Axiom, Locale, Term, TermValue};
use std::cell::RefCell;
use std::rc::Rc;

fn numbered(name: &str, field: &str, values: &[i64]) -> Rc<dyn AxiomSource> {
    Rc::new(AxiomListSource::new(
        values
            .iter()
            .map(|v| Axiom::new(name, vec![Term::new(field, *v)]))
            .collect(),
    ))
}

fn stage(source_name: &str, source: Rc<dyn AxiomSource>, template: Template) -> Stage {
    let key_name = KeyName::new(source_name, template.qualified_name().clone());
    Stage::new(
        key_name,
        LogicQuery::new(source_name, Some(source)),
        template.into(),
    )
}

fn executer(stages: Vec<Stage>) -> LogicQueryExecuter {
    let tail = ChainQueryExecuter::new("test", Default::default(), ExecutionContext::new());
    LogicQueryExecuter::new(tail, stages)
}

fn value(executer: &dyn QueryExecuter, key: &str, term: &str) -> Option<TermValue> {
    executer.solution().get(key).and_then(|a| a.value(term)).cloned()
}

fn pairs(executer: &mut dyn QueryExecuter) -> Vec<(i64, i64)> {
    let mut found = Vec::new();
    while executer.execute().unwrap() {
        let (Some(TermValue::Integer(a)), Some(TermValue::Integer(b))) =
            (value(executer, "A", "id"), value(executer, "B", "id"))
        else {
            panic!("both stages should be bound");
        };
        found.push((a, b));
    }
    found
}

#[test]
fn test_two_stage_join_finds_single_match() {
    let a = stage(
        "a",
        numbered("a", "id", &[1, 2, 3]),
        Template::builder("A", "a").variable("id").build(),
    );
    let b = stage(
        "b",
        numbered("b", "ref", &[3]),
        Template::builder("B", "b")
            .variable("ref")
            .criterion(Expr::comparison(
                Expr::var("ref"),
                ComparisonOperator::Equal,
                Expr::qualified("A", "id"),
            ))
            .build(),
    );

    let candidates = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&candidates);
    let mut executer = executer(vec![a, b]);
    executer.add_axiom_listener(
        "a",
        Box::new(move |_: &str, _: Axiom, _: &Locale| {
            *counter.borrow_mut() += 1;
            true
        }),
    );

    assert!(executer.execute().unwrap());
    assert_eq!(value(&executer, "A", "id"), Some(TermValue::Integer(3)));
    assert_eq!(value(&executer, "B", "ref"), Some(TermValue::Integer(3)));

    assert!(!executer.execute().unwrap());
    assert!(!executer.execute().unwrap());
    assert!(executer.solution().is_empty());
    // Stage 0 read each axiom once; the first two were never retried
    assert_eq!(*candidates.borrow(), 3);
}

#[test]
fn test_last_stage_varies_fastest() {
    let mut executer = executer(vec![
        stage(
            "a",
            numbered("a", "id", &[1, 2]),
            Template::builder("A", "a").variable("id").build(),
        ),
        stage(
            "b",
            numbered("b", "id", &[10, 20, 30]),
            Template::builder("B", "b").variable("id").build(),
        ),
    ]);

    assert_eq!(
        pairs(&mut executer),
        vec![(1, 10), (1, 20), (1, 30), (2, 10), (2, 20), (2, 30)]
    );
}

#[test]
fn test_repeated_runs_are_deterministic() {
    let build = || {
        executer(vec![
            stage(
                "a",
                numbered("a", "id", &[3, 1, 2]),
                Template::builder("A", "a").variable("id").build(),
            ),
            stage(
                "b",
                numbered("b", "id", &[5, 4]),
                Template::builder("B", "b")
                    .variable("id")
                    .criterion(Expr::comparison(
                        Expr::var("id"),
                        ComparisonOperator::GreaterThan,
                        Expr::qualified("A", "id"),
                    ))
                    .build(),
            ),
        ])
    };

    let first = pairs(&mut build());
    let second = pairs(&mut build());
    assert_eq!(first, second);

    let mut reused = build();
    let third = pairs(&mut reused);
    reused.reset();
    assert_eq!(pairs(&mut reused), third);
    assert_eq!(third, first);
}

#[test]
fn test_empty_stage_ends_search() {
    let mut executer = executer(vec![
        stage(
            "a",
            numbered("a", "id", &[1, 2]),
            Template::builder("A", "a").variable("id").build(),
        ),
        stage(
            "b",
            numbered("b", "id", &[]),
            Template::builder("B", "b").variable("id").build(),
        ),
    ]);

    assert!(!executer.execute().unwrap());
    assert!(!executer.execute().unwrap());
}

#[test]
fn test_tail_failure_backtracks() {
    let mut collection = AxiomCollection::new();
    collection.insert_axioms(
        "salary",
        vec![Axiom::new(
            "salary",
            vec![Term::new("id", 2), Term::new("amount", 70)],
        )],
    );
    let pay = Template::builder("pay", "salary")
        .variable("id")
        .variable("amount")
        .criterion(Expr::comparison(
            Expr::var("id"),
            ComparisonOperator::Equal,
            Expr::qualified("A", "id"),
        ))
        .build();
    let double = Template::builder("double", "pay")
        .evaluator(
            "amount",
            Expr::arithmetic(
                Expr::qualified("pay", "amount"),
                ArithmeticOperation::Multiply,
                Expr::literal(2),
            ),
        )
        .build();
    let mut chain = QueryChain::new();
    chain.push(ChainLink::new(LogicChainQuery::new(pay, collection)));
    chain.push(ChainLink::new(CalculateChainQuery::new(double)));

    let tail = ChainQueryExecuter::new("salaries", Default::default(), ExecutionContext::new())
        .with_chain(chain);
    let mut executer = LogicQueryExecuter::new(
        tail,
        vec![stage(
            "a",
            numbered("a", "id", &[1, 2, 3]),
            Template::builder("A", "a").variable("id").build(),
        )],
    );

    assert!(executer.execute().unwrap());
    assert_eq!(value(&executer, "A", "id"), Some(TermValue::Integer(2)));
    assert_eq!(value(&executer, "double", "amount"), Some(TermValue::Integer(140)));
    assert!(!executer.execute().unwrap());
}

#[test]
fn test_seed_initializes_first_stage() {
    let mut executer = executer(vec![stage(
        "a",
        numbered("a", "id", &[1, 2, 3]),
        Template::builder("A", "a").variable("id").build(),
    )])
    .with_seed(Axiom::new("a", vec![Term::new("id", 2)]));

    assert!(executer.execute().unwrap());
    assert_eq!(value(&executer, "A", "id"), Some(TermValue::Integer(2)));
    assert!(!executer.execute().unwrap());

    executer.reset();
    assert!(executer.execute().unwrap());
    assert_eq!(value(&executer, "A", "id"), Some(TermValue::Integer(2)));
}

#[test]
fn test_axiom_listeners_bind_once_per_key() {
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    let mut executer = executer(vec![
        stage(
            "a",
            numbered("a", "id", &[1, 2]),
            Template::builder("A", "a").variable("id").build(),
        ),
        stage(
            "a",
            numbered("a", "id", &[1, 2]),
            Template::builder("B", "a").variable("id").build(),
        ),
    ]);
    executer.add_axiom_listener(
        "a",
        Box::new(move |_: &str, _: Axiom, _: &Locale| {
            *counter.borrow_mut() += 1;
            true
        }),
    );

    while executer.execute().unwrap() {}

    assert_eq!(executer.stages()[0].query.listener_count(), 1);
    assert_eq!(executer.stages()[1].query.listener_count(), 0);
    assert_eq!(*calls.borrow(), 2);
}

#[test]
fn test_chain_executer_runs_once() {
    let template = Template::builder("t", "person").evaluator(
        "greeting",
        Expr::arithmetic(Expr::literal("hello "), ArithmeticOperation::Add, Expr::var("name")),
    );
    let mut chain = QueryChain::new();
    chain.push(ChainLink::new(
        CalculateChainQuery::new(template.build())
            .with_seed(Axiom::new("person", vec![Term::new("name", "John")])),
    ));
    let mut executer = ChainQueryExecuter::new("greet", Default::default(), ExecutionContext::new())
        .with_chain(chain);

    assert!(executer.execute().unwrap());
    assert_eq!(
        value(&executer, "t", "greeting"),
        Some(TermValue::from("hello John"))
    );
    assert!(!executer.execute().unwrap());

    executer.backup_to_start();
    assert!(executer.execute().unwrap());
}
