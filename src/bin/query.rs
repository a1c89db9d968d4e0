use maf_base::{formats, MafIndex, Strand};

use std::io::{self, BufWriter, Write};
use std::time::Instant;
use std::{env, process};

use getopts::Options;
use log::{info, LevelFilter};

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new()?;
    init_logger(config.verbosity);

    // Open the index.
    let mut index = MafIndex::open(&config.db_file, &config.maf_file, &config.target).map_err(|x| x.to_string())?;
    info!("Opened index for {} with {} blocks", index.target(), index.len());

    let mut output = BufWriter::new(io::stdout().lock());
    if config.splice {
        // FASTA output.
        let alignment = index.get_spliced(&config.starts, &config.ends, config.strand).map_err(|x| x.to_string())?;
        info!("Spliced alignment: {} sequences, {} columns", alignment.len(), alignment.alignment_len());
        formats::write_fasta(&alignment, &mut output).map_err(|x| x.to_string())?;
    } else {
        // MAF output.
        formats::write_maf_header(None, &mut output).map_err(|x| x.to_string())?;
        formats::write_header_lines(&[config.query_line()], &mut output).map_err(|x| x.to_string())?;
        let search = index.search(&config.starts, &config.ends).map_err(|x| x.to_string())?;
        let mut blocks = 0;
        for block in search {
            let block = block.map_err(|x| x.to_string())?;
            formats::write_maf_block(&block, &mut output).map_err(|x| x.to_string())?;
            blocks += 1;
        }
        info!("Found {} blocks", blocks);
    }
    output.flush().map_err(|x| x.to_string())?;

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    info!("Used {:.3} seconds", seconds);

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

pub struct Config {
    pub db_file: String,
    pub maf_file: String,
    pub target: String,
    pub starts: Vec<usize>,
    pub ends: Vec<usize>,
    pub strand: Strand,
    pub splice: bool,
    pub verbosity: usize,
}

impl Config {
    pub fn new() -> Result<Config, String> {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("m", "maf", "indexed MAF file (required)", "FILE");
        opts.optopt("t", "target", "name of the reference sequence (required)", "STR");
        opts.optmulti("r", "region", "half-open reference interval (required; may repeat)", "START-END");
        opts.optopt("s", "strand", "output strand for --splice (default: +)", "+|-");
        opts.optflag("", "splice", "output a spliced alignment over the regions in FASTA format");
        opts.optflagmulti("v", "verbose", "print progress information (repeat for more)");
        let matches = opts.parse(&args[1..]).map_err(|x| x.to_string())?;

        let header = format!("Usage: {} [options] alignment.maf.db", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let db_file = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };

        let mut starts: Vec<usize> = Vec::new();
        let mut ends: Vec<usize> = Vec::new();
        for region in matches.opt_strs("r") {
            let (start, end) = parse_region(&region)?;
            starts.push(start);
            ends.push(end);
        }
        if starts.is_empty() {
            return Err("At least one region must be provided with --region".to_string());
        }

        let strand = if let Some(s) = matches.opt_str("s") {
            Strand::from_symbol(s.as_bytes()).ok_or(format!("--strand: invalid value {}", s))?
        } else {
            Strand::Forward
        };

        Ok(Config {
            db_file,
            maf_file: matches.opt_str("m").ok_or("MAF file must be provided with --maf".to_string())?,
            target: matches.opt_str("t").ok_or("Reference sequence name must be provided with --target".to_string())?,
            starts,
            ends,
            strand,
            splice: matches.opt_present("splice"),
            verbosity: matches.opt_count("v"),
        })
    }

    // Describes the query as a MAF comment.
    pub fn query_line(&self) -> String {
        let regions: Vec<String> = self.starts.iter().zip(self.ends.iter()).map(|(s, e)| format!("{}-{}", s, e)).collect();
        format!("query {} {}", self.target, regions.join(","))
    }
}

fn parse_region(region: &str) -> Result<(usize, usize), String> {
    let (start, end) = region.split_once('-').ok_or(format!("--region: expected START-END, got {}", region))?;
    let start = start.parse::<usize>().map_err(|x| format!("--region: invalid start {}: {}", start, x))?;
    let end = end.parse::<usize>().map_err(|x| format!("--region: invalid end {}: {}", end, x))?;
    Ok((start, end))
}

//-----------------------------------------------------------------------------
