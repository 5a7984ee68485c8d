//
// busctl.rs --- Bus controller host tool.
//
// Copyright (C) 2016, James Bielman <jamesjb@gmail.com>
// All Rights Reserved.
//
// Released under the "BSD3" license. See the file "LICENSE"
// for details.
//

use std::env;
use std::fs;
use std::process::exit;
use std::time::Duration;

use getopts::Options;
use log::{info, warn};

use busctl::error::Result;
use busctl::fw::Config;
use busctl::host::{self, Client};
use busctl::image::BinaryImage;

fn print_usage(opts: &Options) {
    let brief = "Usage: busctl [OPTIONS...] COMMAND [ARG]\n\n\
                 Commands:\n    \
                 load FILE      load a program image and start the target\n    \
                 upload FILE    store up to 16 bytes at address 0\n    \
                 download       print the 16 bytes at address 0\n    \
                 echo BYTE      send a hex byte and print the reply";
    print!("{}", opts.usage(brief));
}

fn usage_error(opts: &Options, msg: &str) -> ! {
    println!("busctl: {}\n", msg);
    print_usage(opts);
    exit(1);
}

/// Parse and validate command line options, returning the `Matches`
/// object containing option information.
fn parse_options() -> getopts::Matches {
    let args: Vec<String> = env::args().collect();
    let mut opts = Options::new();

    opts.optopt("p", "port", "serial port (default: first attached controller)", "PATH");
    opts.optopt("b", "baud", "line rate (default: 9600)", "BAUD");
    opts.optopt("t", "timeout", "reply timeout in milliseconds (default: 2000)", "MS");
    opts.optflag("", "help", "display this help and exit");
    opts.optflag("", "version", "output version information and exit");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => usage_error(&opts, &f.to_string()),
    };

    if matches.opt_present("help") {
        print_usage(&opts);
        exit(0);
    }

    if matches.opt_present("version") {
        println!("{}", env!("CARGO_PKG_VERSION"));
        exit(0);
    }

    let wanted = match matches.free.first().map(|s| s.as_str()) {
        Some("load") | Some("upload") | Some("echo") => 2,
        Some("download") => 1,
        Some(cmd) => usage_error(&opts, &format!("unknown command '{}'", cmd)),
        None => usage_error(&opts, "no command"),
    };
    if matches.free.len() != wanted {
        usage_error(&opts, "wrong number of arguments");
    }

    matches
}

fn run() -> Result<()> {
    let matches = parse_options();

    let baud = match matches.opt_str("b") {
        Some(arg) => arg.parse::<u32>()?,
        None => Config::default().baud,
    };
    let timeout = match matches.opt_str("t") {
        Some(arg) => arg.parse::<u64>()?,
        None => 2000,
    };
    let path = match matches.opt_str("p") {
        Some(path) => path,
        None => host::find_port()?,
    };

    info!("opening {} at {} baud", path, baud);
    let port = host::open(&path, baud, Duration::from_millis(timeout))?;
    let mut client = Client::new(port);

    let cmd = matches.free[0].as_str();
    match cmd {
        "load" => {
            let image = BinaryImage::read_file(&matches.free[1])?;
            let base = Config::default().image_base as u32;
            if image.base() != 0 && image.base() != base {
                warn!("image starts at {:04X} but is loaded at {:04X}", image.base(), base);
            }
            client.load(image.bytes())?;
            println!("loaded {} bytes in {} blocks", image.len(), image.block_count());
        },
        "upload" => {
            let data = fs::read(&matches.free[1])?;
            client.upload(&data)?;
        },
        "download" => {
            let data = client.download()?;
            let hex: Vec<String> = data.iter().map(|b| format!("{:02X}", b)).collect();
            println!("{}", hex.join(" "));
        },
        _ => {
            let byte = u8::from_str_radix(&matches.free[1], 16)?;
            println!("{:02X}", client.echo(byte)?);
        },
    }

    Ok(())
}

fn main() {
    env_logger::init();

    match run() {
        Ok(_) => (),
        Err(err) => {
            println!("busctl: {}", err);
            exit(1);
        }
    }
}
