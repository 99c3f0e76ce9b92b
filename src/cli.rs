use std::io;
use std::path::{Path, PathBuf};

use crate::actual_client::*;
use crate::bank_statements::*;
use crate::budget_fetcher::*;
use crate::constants::*;
use crate::errors::*;
use crate::statement_converter::*;
use crate::types::*;

pub fn run() -> Result<FetchOutcome> {
    initialize();
    let matches = get_clap_app().get_matches();
    let month = matches
        .value_of(MONTH_ARG)
        .expect("CLAP matches should have MONTH_ARG");
    let config = session_config_from_matches(&matches);
    let mut client = ActualClient::new()?;
    Ok(BudgetFetcher::run(
        &mut client,
        &config,
        month,
        &mut io::stdout(),
        &mut io::stderr(),
    ))
}

pub fn run_convert() -> Result<()> {
    initialize();
    let matches = get_convert_clap_app().get_matches();
    let bank = Bank::from_name(
        matches
            .value_of(BANK_ARG)
            .expect("CLAP matches should have BANK_ARG"),
    )?;
    let input_file = Path::new(
        matches
            .value_of_os(INPUT_FILE_ARG)
            .expect("CLAP matches should have INPUT_FILE_ARG"),
    );
    let report = StatementConverter::convert(bank, input_file)?;
    println!(
        "{} rows written, {} rows skipped.",
        report.written,
        report.skipped.len()
    );
    Ok(())
}

fn initialize() {
    openssl_probe::init_ssl_cert_env_vars();
    dotenv::dotenv().ok();
    env_logger::init();
}

fn get_clap_app() -> clap::App<'static, 'static> {
    clap::App::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about("Download an Actual budget and print one month's budget snapshot.")
        .arg(
            clap::Arg::with_name(MONTH_ARG)
                .value_name("YYYY-MM")
                .help("Budget month to print, e.g. 2024-10")
                .required(true)
                .index(1),
        )
        .arg(
            clap::Arg::with_name(DATA_DIR_ARG)
                .env(DATA_DIR_ENV)
                .long(DATA_DIR_ARG)
                .value_name("PATH")
                .help("Directory where downloaded budget files are stored")
                .takes_value(true)
                .required(true),
        )
        .arg(
            clap::Arg::with_name(SERVER_URL_ARG)
                .env(SERVER_URL_ENV)
                .long(SERVER_URL_ARG)
                .value_name("URL")
                .help("Actual sync server address")
                .takes_value(true)
                .required(true),
        )
        .arg(
            clap::Arg::with_name(PASSWORD_ARG)
                .env(PASSWORD_ENV)
                .hide_env_values(true)
                .long(PASSWORD_ARG)
                .value_name("PASSWORD")
                .help("Actual sync server password")
                .takes_value(true)
                .required(true),
        )
        .arg(
            clap::Arg::with_name(SYNC_ID_ARG)
                .env(SYNC_ID_ENV)
                .long(SYNC_ID_ARG)
                .value_name("ID")
                .help("Sync ID of the budget to download (found under Advanced settings)")
                .takes_value(true)
                .required(true),
        )
}

fn get_convert_clap_app() -> clap::App<'static, 'static> {
    clap::App::new("actual-convert")
        .version(clap::crate_version!())
        .about("Convert a bank statement export into a CSV file Actual can import.")
        .arg(
            clap::Arg::with_name(BANK_ARG)
                .help("Bank that produced the statement")
                .possible_values(&BANK_NAMES)
                .required(true)
                .index(1),
        )
        .arg(
            clap::Arg::with_name(INPUT_FILE_ARG)
                .value_name("FILE")
                .help("Statement export (.csv for revolut, .xls for bankinter and ingdirect)")
                .required(true)
                .index(2),
        )
}

fn session_config_from_matches(matches: &clap::ArgMatches) -> SessionConfig {
    SessionConfig {
        data_dir: PathBuf::from(
            matches
                .value_of_os(DATA_DIR_ARG)
                .expect("CLAP matches should have DATA_DIR_ARG"),
        ),
        server_url: matches
            .value_of(SERVER_URL_ARG)
            .expect("CLAP matches should have SERVER_URL_ARG")
            .to_string(),
        password: matches
            .value_of(PASSWORD_ARG)
            .expect("CLAP matches should have PASSWORD_ARG")
            .to_string(),
        sync_id: SyncId(
            matches
                .value_of(SYNC_ID_ARG)
                .expect("CLAP matches should have SYNC_ID_ARG")
                .to_string(),
        ),
    }
}
