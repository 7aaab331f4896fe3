use super::{BackupMode, QualifiedName, SolutionPairer, Template};
use crate::{Axiom, Solution};

/// A head template followed by linked templates that must unify with the
/// same axiom. Links are addressed by index instead of a `next` pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateChain {
    templates: Vec<Template>,
}

impl TemplateChain {
    pub fn new(head: Template) -> Self {
        Self {
            templates: vec![head],
        }
    }

    /// Append a linked template
    pub fn link(mut self, template: Template) -> Self {
        self.templates.push(template);
        self
    }

    pub fn head(&self) -> &Template {
        &self.templates[0]
    }

    pub fn head_mut(&mut self) -> &mut Template {
        &mut self.templates[0]
    }

    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    /// Index of the template linked after `index`
    pub fn next(&self, index: usize) -> Option<usize> {
        (index + 1 < self.templates.len()).then_some(index + 1)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn key(&self) -> &str {
        self.head().key()
    }

    pub fn qualified_name(&self) -> &QualifiedName {
        self.head().qualified_name()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Template> {
        self.templates.iter_mut()
    }

    /// Unify the head and then every linked template with `axiom`
    pub fn unify(&mut self, axiom: &Axiom, solution: &Solution, case_insensitive: bool) -> bool {
        let head = self.head_mut();
        let unified = if case_insensitive {
            head.unify_case_insensitive(axiom, solution)
        } else {
            head.unify(axiom, solution)
        };
        unified && self.unify_chain(axiom, solution, case_insensitive)
    }

    /// Unify the linked templates only
    pub fn unify_chain(
        &mut self,
        axiom: &Axiom,
        solution: &Solution,
        case_insensitive: bool,
    ) -> bool {
        self.templates.iter_mut().skip(1).all(|template| {
            if case_insensitive {
                template.unify_case_insensitive(axiom, solution)
            } else {
                template.unify(axiom, solution)
            }
        })
    }

    /// Pair every template's unbound variables with values in `solution`.
    /// Returns the number of variables paired.
    pub fn unify_solution(&mut self, solution: &Solution, case_insensitive: bool) -> usize {
        self.templates
            .iter_mut()
            .map(|template| {
                let mut pairer = SolutionPairer::new(solution, case_insensitive)
                    .excluding(template.qualified_name());
                template.visit_variables(&mut pairer);
                pairer.paired()
            })
            .sum()
    }

    pub fn backup(&mut self, mode: BackupMode) {
        for template in self.templates.iter_mut() {
            template.backup(mode);
        }
    }

    pub fn reset(&mut self) {
        for template in self.templates.iter_mut() {
            template.reset();
        }
    }

    pub fn is_backed_up(&self) -> bool {
        self.templates.iter().all(Template::is_backed_up)
    }
}

impl From<Template> for TemplateChain {
    fn from(template: Template) -> Self {
        TemplateChain::new(template)
    }
}
