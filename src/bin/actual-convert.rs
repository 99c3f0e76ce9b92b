use error_chain::ChainedError;
use std::io::Write;
use std::process;

fn main() {
    if let Err(err) = actual_budget_month::run_convert() {
        let stderr = &mut std::io::stderr();
        writeln!(stderr, "{}", err.display_chain()).ok();
        process::exit(1);
    }
}
