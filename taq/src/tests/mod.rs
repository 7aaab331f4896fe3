

mod chain;
mod executer;
