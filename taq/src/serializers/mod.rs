mod json;

pub use json::{axiom_to_json, axioms_from_json, solution_to_json, term_value_to_json};
