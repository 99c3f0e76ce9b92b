#![warn(clippy::all)]

#[macro_use]
extern crate diesel;
#[macro_use]
extern crate error_chain;

mod actual_client;
mod bank_statements;
mod budget_api;
mod budget_fetcher;
mod budget_file;
mod budget_month;
mod budget_session;
mod cli;
mod constants;
mod database;
mod schema;
mod statement_converter;
mod types;

mod errors {
    error_chain! {}
}

pub use cli::{run, run_convert};
pub use errors::{Error, Result};
pub use types::FetchOutcome;
