use std::time::Instant;
use std::{env, fs, process};

use maf_base::{utils, MafIndex, MafIndexParams};
use getopts::Options;
use log::LevelFilter;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new();
    init_logger(config.verbosity);

    // Check if the database already exists.
    if utils::file_exists(&config.db_file) {
        if config.overwrite {
            eprintln!("Overwriting database {}", config.db_file);
            fs::remove_file(&config.db_file).map_err(|x| x.to_string())?;
        } else {
            return Err(format!("Database {} already exists", config.db_file));
        }
    }

    // Create the database.
    MafIndex::create(&config.db_file, &config.maf_file, &config.target, &config.params)
        .map_err(|x| x.to_string())?;

    // Statistics.
    let index = MafIndex::open(&config.db_file, &config.maf_file, &config.target).map_err(|x| x.to_string())?;
    eprintln!(
        "The index contains {} alignment blocks for {} in {}",
        index.len(), index.target(), index.maf_file()
    );
    if let Some(size) = index.file_size() {
        eprintln!("Database size: {}", size);
    }

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

//-----------------------------------------------------------------------------

fn init_logger(verbosity: usize) {
    env_logger::Builder::new()
        .filter_level(match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        })
        .init();
}

struct Config {
    pub maf_file: String,
    pub db_file: String,
    pub target: String,
    pub params: MafIndexParams,
    pub overwrite: bool,
    pub verbosity: usize,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("t", "target", "name of the reference sequence (required)", "STR");
        opts.optopt("o", "output", "output file name (default: <input>.db)", "FILE");
        let batch_desc = format!("number of entries per transaction (default: {})", MafIndex::BATCH_SIZE);
        opts.optopt("b", "batch-size", &batch_desc, "INT");
        opts.optflag("", "overwrite", "overwrite the database file if it exists");
        opts.optflagmulti("v", "verbose", "print progress information (repeat for more)");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] alignment.maf", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let maf_file = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };
        let db_file = matches.opt_str("o").unwrap_or(format!("{}.db", maf_file));

        let target = if let Some(s) = matches.opt_str("t") {
            s
        } else {
            eprintln!("Reference sequence name must be provided with --target");
            process::exit(1);
        };

        let mut params = MafIndexParams::default();
        if let Some(s) = matches.opt_str("b") {
            match s.parse::<usize>() {
                Ok(n) if n > 0 => params.batch_size = n,
                _ => {
                    eprintln!("--batch-size: invalid value {}", s);
                    process::exit(1);
                }
            }
        }

        Config {
            maf_file,
            db_file,
            target,
            params,
            overwrite: matches.opt_present("overwrite"),
            verbosity: matches.opt_count("v"),
        }
    }
}

//-----------------------------------------------------------------------------
