pub mod api_models;
pub mod cashflow;
pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod http_server;
pub mod logging;
pub mod models;
pub mod payroll;
pub mod store;

pub use config::Config;
pub use error::{BusinessError, Result};
pub use models::{
    Employee, EmploymentType, PayMethod, Shift, TaxSuperRule, Transaction, TransactionType,
};
