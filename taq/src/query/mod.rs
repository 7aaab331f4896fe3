//! Query execution
//!
//! Logic stages, calculators, chained queries and the executers that drive
//! them, plus the launcher that builds an executer from a query spec.

pub mod calculator;
pub mod chain;
pub mod context;
pub mod executer;
pub mod launcher;
pub mod logic;
pub mod scope;
pub mod status;
pub mod worker;

pub use calculator::Calculator;
pub use chain::{CalculateChainQuery, ChainLink, ChainQuery, LogicChainQuery, QueryChain};
pub use context::ExecutionContext;
pub use executer::{ChainQueryExecuter, LogicQueryExecuter, QueryExecuter, Stage};
pub use launcher::{ChainSpec, KeyName, QueryLauncher, QueryParams, QuerySpec};
pub use logic::{Continuation, LogicQuery};
pub use scope::{Scope, ScopeNotifier, ScopeRegistry};
pub use status::QueryStatus;
pub use worker::WorkerService;
