use std::cell::Cell;
use std::rc::Rc;
use taq::query::{ExecutionContext, KeyName, QueryLauncher, QueryParams, QuerySpec, ScopeRegistry};
use taq::source::SourceInterrupted;
use taq::template::Template;
use taq::{Axiom, AxiomCollection, AxiomSource, DeferredAxiomSource, Term};

fn reading(value: i64) -> Axiom {
    Axiom::new("reading", vec![Term::new("value", value)])
}

#[test]
fn test_list_source_restarts_from_first_axiom() {
    let mut collection = AxiomCollection::new();
    collection.insert_axioms("reading", vec![reading(1), reading(2)]);
    let source = collection.axiom_source("reading").unwrap();
    let context = ExecutionContext::new();

    let first: Vec<Axiom> = source.iterator(&context).collect();
    let second: Vec<Axiom> = source.iterator(&context).collect();

    assert_eq!(first, second);
    assert_eq!(source.len_hint(), Some(2));
    assert!(collection.axiom_source("missing").is_none());
}

#[test]
fn test_deferred_source_runs_producer_per_iteration() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let source = DeferredAxiomSource::new("reading", move |_: &ExecutionContext| {
        counter.set(counter.get() + 1);
        Ok(vec![reading(counter.get())])
    });
    let context = ExecutionContext::new();

    assert_eq!(source.iterator(&context).next(), Some(reading(1)));
    assert_eq!(source.iterator(&context).next(), Some(reading(2)));
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_interrupted_source_yields_no_solutions() {
    let mut registry = ScopeRegistry::new();
    let global = registry.global_mut();
    global.add_source(
        "reading",
        Rc::new(DeferredAxiomSource::new(
            "reading",
            |_: &ExecutionContext| -> Result<Vec<Axiom>, SourceInterrupted> {
                Err(SourceInterrupted)
            },
        )),
    );
    global.add_template(Template::builder("r", "reading").variable("value").build());

    let spec = QuerySpec::new("readings").key(KeyName::new("reading", "r"));
    let mut params = QueryParams::new(spec, Rc::new(registry));

    assert_eq!(QueryLauncher::launch(&mut params).unwrap(), 0);
    assert!(params.solution.is_empty());
}
