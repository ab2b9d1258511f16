//! codec-cli — manual inspection and diagnostics for the valuegraph codec.
//!
//! ```bash
//! codec-cli encode --mode tree <in.json
//! codec-cli encode --mode graph --demo shared-map
//! codec-cli decode --mode graph <payload.json
//! codec-cli inspect
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use valuegraph::{Codec, MapValue, Value};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Tree,
    Graph,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a value to the wire format.
    Encode {
        #[arg(long, value_enum, default_value_t = Mode::Tree)]
        mode: Mode,
        #[arg(long)]
        pretty: bool,
        /// Synthesize a canned demo value instead of reading input.
        #[arg(long)]
        demo: Option<String>,
        /// Input file path (omit for stdin).
        file: Option<PathBuf>,
    },
    /// Decode a payload from the wire format.
    Decode {
        #[arg(long, value_enum, default_value_t = Mode::Tree)]
        mode: Mode,
        file: Option<PathBuf>,
    },
    /// Print the registry's built-in type ids and the active config defaults.
    Inspect,
}

fn main() {
    let cli = Cli::parse();
    let mut codec = Codec::new();

    match cli.command {
        Commands::Encode { mode, pretty, demo, file } => {
            codec.config_mut().pretty = pretty;
            let value = match demo {
                Some(name) => match demo_value(&name) {
                    Some(v) => v,
                    None => {
                        eprintln!("unknown demo `{name}`; try `shared-map` or `cycle`");
                        std::process::exit(1);
                    }
                },
                None => {
                    let text = read_input(file.as_ref()).unwrap_or_else(|e| fail(&e));
                    codec.parse(&text).unwrap_or_else(|e| fail(&e))
                }
            };
            let encoded = match mode {
                Mode::Tree => codec.stringify(&value),
                Mode::Graph => codec.serialize(&value),
            };
            match encoded {
                Ok(text) => println!("{text}"),
                Err(e) => fail(&e),
            }
        }
        Commands::Decode { mode: _, file } => {
            let text = read_input(file.as_ref()).unwrap_or_else(|e| fail(&e));
            match codec.deserialize(&text) {
                Ok(value) => println!("{value:#?}"),
                Err(e) => {
                    println!("{{");
                    println!("  \"success\": false,");
                    println!("  \"error\": \"{e}\",");
                    println!("  \"version\": \"{}\"", env!("CARGO_PKG_VERSION"));
                    println!("}}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Inspect => {
            let ids = codec.registry().builtin_ids();
            println!("{{");
            println!("  \"builtinTypes\": {:?},", ids);
            println!("  \"maxDepth\": {:?},", codec.config().max_depth);
            println!("  \"maxRegExpPatternLength\": {:?},", codec.config().max_regexp_pattern_length);
            println!("  \"symbolPolicy\": {:?},", codec.config().symbol_policy);
            println!("  \"allowUnsafeRegExp\": {}", codec.config().allow_unsafe_regexp);
            println!("}}");
        }
    }
}

fn demo_value(name: &str) -> Option<Value> {
    match name {
        "shared-map" => {
            let m = Value::instance(MapValue(vec![(Value::String("count".into()), Value::Number(1.0))]));
            Some(Value::object(vec![("a".into(), m.clone()), ("b".into(), m)]))
        }
        "cycle" => {
            let obj = Value::object(vec![]);
            if let Value::Object(cell) = &obj {
                cell.borrow_mut().push(("self".to_string(), obj.clone()));
            }
            Some(obj)
        }
        _ => None,
    }
}

fn read_input(file: Option<&PathBuf>) -> io::Result<String> {
    match file {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

fn fail(err: &impl std::fmt::Display) -> ! {
    eprintln!("error: {err}");
    std::process::exit(1);
}
