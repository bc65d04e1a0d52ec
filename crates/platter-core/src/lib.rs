//! platter-core — shared building blocks for the Platter orchestrator
//!
//! Holds the capability interface the planner drives (named tools behind an
//! allow-list) and the budget rules applied to restaurant menus and payments.

pub mod budget;
pub mod tools;

pub use budget::{BudgetFilter, ExcludedItem, PaymentConfirmation, Wallet};
pub use tools::{ToolDefinition, ToolExecutor, ToolHandler, ToolRegistry, json_schema};
