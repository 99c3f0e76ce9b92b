use error_chain::ChainedError;
use std::io::Write;
use std::process;

fn main() {
    match actual_budget_month::run() {
        Ok(outcome) => process::exit(outcome.exit_code()),
        Err(err) => {
            let stderr = &mut std::io::stderr();
            writeln!(stderr, "{}", err.display_chain()).ok();
            process::exit(1);
        }
    }
}
