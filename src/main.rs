use std::path;
use std::process;

use clap::ArgEnum;
use env_logger;
use log;

use tape_sort::{Config, TapeSorterBuilder, WriteMode};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let config_path = arg_parser.value_of("config").expect("value is required");
    let mut config = match Config::from_file(path::Path::new(config_path)) {
        Ok(config) => config,
        Err(err) => {
            log::error!("configuration loading error: {}", err);
            process::exit(1);
        }
    };

    if let Some(input) = arg_parser.value_of("input") {
        config.path_in = input.into();
    }
    if let Some(output) = arg_parser.value_of("output") {
        config.path_out = output.into();
    }

    if let Err(err) = config.validate() {
        log::error!("{}", err);
        process::exit(1);
    }

    let mut input_tape = match config.open_input() {
        Ok(tape) => tape,
        Err(err) => {
            log::error!("input tape opening error: {}", err);
            process::exit(1);
        }
    };

    let mode: Mode = arg_parser.value_of_t_or_exit("write_mode");
    let mut sorter_builder = TapeSorterBuilder::new().with_write_mode(match mode {
        Mode::Append => WriteMode::Append,
        Mode::InPlace => WriteMode::InPlace,
    });

    if let Some(tmp_dir) = arg_parser.value_of("tmp_dir") {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    let sorter = sorter_builder.build();

    match sorter.sort(&mut input_tape, &config.path_out) {
        Ok(output_tape) => log::info!(
            "{} values sorted into {}",
            output_tape.size(),
            output_tape.path().display()
        ),
        Err(err) => {
            log::error!("tape sorting error: {}", err);
            process::exit(1);
        }
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum Mode {
    Append,
    InPlace,
}

impl Mode {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Mode::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Mode as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("tape-sort")
        .about("external merge sort of a simulated tape")
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("configuration file (`key: value` lines)")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("input tape file, overrides path_in")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("output tape file, overrides path_out")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("write_mode")
                .short('w')
                .long("write-mode")
                .help("how merged values are written onto tapes")
                .takes_value(true)
                .default_value("append")
                .possible_values(Mode::possible_values()),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary tapes")
                .takes_value(true),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
