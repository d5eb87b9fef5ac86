use std::sync::atomic::{AtomicUsize, Ordering};
use std::{env, fmt, path::PathBuf};

use anyhow::{Context, Result};
use std::fmt::Write;
use tracing::{field::Visit, Id, Level, Subscriber};
use tracing_core::Field;

use tzrepo::{Compiler, Version};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Ok(());
    }

    let mut help = false;
    let mut verbose = false;
    let mut lmt = false;
    let mut unpack = false;
    let mut compile = false;
    let mut version: Option<String> = None;
    let mut workdir: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if !arg.starts_with('-') {
            break;
        }
        match arg {
            "-help" => help = true,
            "-unpack" => unpack = true,
            "-compile" => compile = true,
            "-verbose" => verbose = true,
            "-lmt" => lmt = true,
            "-version" if version.is_none() && i + 1 < args.len() => {
                i += 1;
                version = Some(args[i].clone());
            }
            "-workdir" if workdir.is_none() && i + 1 < args.len() => {
                i += 1;
                workdir = Some(PathBuf::from(&args[i]));
            }
            _ => println!("Unrecognized option: {}", arg),
        }
        i += 1;
    }

    if help {
        print_usage();
        return Ok(());
    }

    StderrTracer::register(verbose)?;

    let version = version
        .map(|version| version.parse::<Version>())
        .transpose()
        .context("invalid -version argument")?;
    let workdir = workdir.unwrap_or_else(|| PathBuf::from("tzrepo"));
    let compiler = Compiler::new(&workdir, lmt)
        .with_context(|| format!("cannot use work directory {}", workdir.display()))?;

    if unpack {
        let unpacked = match version {
            Some(version) => {
                compiler.unpack_version(version)?;
                version
            }
            None => compiler.unpack()?,
        };
        println!("Version \"{}\" unpacked.", unpacked);
    }

    if compile {
        let compiled = match version {
            Some(version) => {
                compiler.compile_version(version)?;
                version
            }
            None => compiler.compile()?,
        };
        println!("Version \"{}\" compiled.", compiled);
    }

    Ok(())
}

fn print_usage() {
    println!(
        "Usage of timezone compiler with command line options:\n\
         -help      Print this usage message\n\
         -verbose   Print details during execution\n\
         -workdir   Set working directory which contains timezone data \
         by giving next command line argument as absolute path\n\
         -unpack    Unpack timezone archive to subdirectory\n\
         -compile   Compile timezone data (archives or subdirectories)\n\
         -version   Use only given timezone version instead of newest \
         available version (example: -version 2011n)\n\
         -lmt       Include LMT zone entries during compilation"
    );
}

struct StringVisitor<'a> {
    string: &'a mut String,
}

impl Visit for StringVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.string, "{:?}", value);
        } else {
            let _ = write!(self.string, " {} = {:?};", field.name(), value);
        }
    }
}

/// Plain stderr subscriber; `-verbose` raises the level from WARN to TRACE
struct StderrTracer {
    max_level: Level,
}

static AUTO_ID: AtomicUsize = AtomicUsize::new(1);

impl StderrTracer {
    fn register(verbose: bool) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
        let max_level = if verbose { Level::TRACE } else { Level::WARN };
        tracing::subscriber::set_global_default(StderrTracer { max_level })
    }
}

impl Subscriber for StderrTracer {
    fn enabled(&self, metadata: &tracing::Metadata<'_>) -> bool {
        *metadata.level() <= self.max_level
    }

    fn new_span(&self, _span: &tracing_core::span::Attributes<'_>) -> Id {
        Id::from_u64(AUTO_ID.fetch_add(1, Ordering::Relaxed) as u64)
    }

    fn record(&self, _span: &Id, _values: &tracing_core::span::Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &tracing::Event<'_>) {
        let mut text = String::new();
        let mut visitor = StringVisitor { string: &mut text };
        event.record(&mut visitor);

        eprintln!("{} {}", event.metadata().level(), text);
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}
