//! Shuttle CLI: Inspect code blobs and actions, replay verification fixtures
//!
//! Commands:
//!   shuttle wrap           prepend a code header to a body
//!   shuttle validate-code  run the code format validator on a blob
//!   shuttle decode         decode a hex action or batch to JSON
//!   shuttle verify         verify a batch fixture against its state
//!   shuttle config         print the default verifier config

use shuttle_core::code::{
    wrap, CodeValidator, FORMAT_CUSTOM, FORMAT_RAW, FORMAT_WASM, TEE_TYPE_NONE, TEE_TYPE_SEV,
    TEE_TYPE_SGX,
};
use shuttle_core::{decode_batch, Action, Env, MemoryState, Verifier, VerifierConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::process;

type CliResult = Result<(), Box<dyn Error>>;

fn print_usage() {
    println!(
        r#"
Shuttle verification core

Usage: shuttle <command> [options]

Commands:
  wrap          <raw|wasm|custom> <none|sgx|sev> <body-file> [out-file]   Wrap a code body in a header
  validate-code <code-file>                                               Validate a code blob
  decode        <hex> [--batch]                                           Decode an action (or batch) to JSON
  verify        <fixture.json> [--config <file>] [--apply]                Verify a batch fixture
  config        [out-file]                                                Print or save the default config

Fixture format:
  {{ "block_time": 1700000000, "caller": "<hex>", "privileged": ["<hex>"],
    "state": {{ "<hex key>": "<hex value>" }}, "actions": ["<hex action>"] }}

Examples:
  shuttle wrap wasm sgx module.wasm module.shuttle
  shuttle validate-code module.shuttle
  shuttle verify block-42.json --config verifier.json
"#
    );
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let result = match args[1].as_str() {
        "wrap" => cmd_wrap(&args[2..]),
        "validate-code" => cmd_validate_code(&args[2..]),
        "decode" => cmd_decode(&args[2..]),
        "verify" => cmd_verify(&args[2..]),
        "config" => cmd_config(&args[2..]),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("  Error: {}", e);
        process::exit(1);
    }
}

fn parse_format(s: &str) -> Result<u8, Box<dyn Error>> {
    match s {
        "raw" => Ok(FORMAT_RAW),
        "wasm" => Ok(FORMAT_WASM),
        "custom" => Ok(FORMAT_CUSTOM),
        other => Ok(other.parse()?),
    }
}

fn parse_tee(s: &str) -> Result<u8, Box<dyn Error>> {
    match s {
        "none" => Ok(TEE_TYPE_NONE),
        "sgx" => Ok(TEE_TYPE_SGX),
        "sev" => Ok(TEE_TYPE_SEV),
        other => Ok(other.parse()?),
    }
}

fn cmd_wrap(args: &[String]) -> CliResult {
    if args.len() < 3 {
        eprintln!("Usage: shuttle wrap <raw|wasm|custom> <none|sgx|sev> <body-file> [out-file]");
        return Ok(());
    }
    let format = parse_format(&args[0])?;
    let tee = parse_tee(&args[1])?;
    let body = std::fs::read(&args[2])?;
    let code = wrap(format, 1, tee, &body);

    match args.get(3) {
        Some(out) => {
            std::fs::write(out, &code)?;
            println!("  Wrote {} bytes to {}", code.len(), out);
        }
        None => println!("{}", hex::encode(&code)),
    }
    Ok(())
}

fn cmd_validate_code(args: &[String]) -> CliResult {
    if args.is_empty() {
        eprintln!("Usage: shuttle validate-code <code-file>");
        return Ok(());
    }
    let code = std::fs::read(&args[0])?;
    let validator = CodeValidator::with_defaults(VerifierConfig::default().max_code_size);
    let header = validator.validate(&code)?;
    println!("\n  Code OK: {} bytes", code.len());
    println!("  format:   {}", header.format);
    println!("  version:  {}", header.version);
    println!("  tee type: {}", header.tee_type);
    Ok(())
}

fn cmd_decode(args: &[String]) -> CliResult {
    if args.is_empty() {
        eprintln!("Usage: shuttle decode <hex> [--batch]");
        return Ok(());
    }
    let bytes = hex::decode(args[0].trim())?;
    let json = if args.iter().any(|a| a == "--batch") {
        serde_json::to_string_pretty(&decode_batch(&bytes)?)?
    } else {
        serde_json::to_string_pretty(&Action::decode(&bytes)?)?
    };
    println!("{}", json);
    Ok(())
}

/// A recorded block: snapshot, environment and the actions to verify
#[derive(Debug, Deserialize)]
struct BlockFixture {
    #[serde(default)]
    block_time: Option<u64>,
    #[serde(default)]
    caller: String,
    #[serde(default)]
    privileged: Vec<String>,
    #[serde(default)]
    state: BTreeMap<String, String>,
    actions: Vec<String>,
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn cmd_verify(args: &[String]) -> CliResult {
    if args.is_empty() {
        eprintln!("Usage: shuttle verify <fixture.json> [--config <file>] [--apply]");
        return Ok(());
    }

    let config = match flag_value(args, "--config") {
        Some(path) => VerifierConfig::load(path)?,
        None => VerifierConfig::default(),
    };
    let verifier = Verifier::new(config)?;

    let fixture: BlockFixture = serde_json::from_str(&std::fs::read_to_string(&args[0])?)?;
    let mut state = MemoryState::from_hex_map(&fixture.state)?;
    let actions = fixture
        .actions
        .iter()
        .map(|h| -> Result<Action, Box<dyn Error>> { Ok(Action::decode(&hex::decode(h.trim())?)?) })
        .collect::<Result<Vec<_>, Box<dyn Error>>>()?;

    let block_time = match fixture.block_time {
        Some(t) => t,
        None => u64::try_from(chrono::Utc::now().timestamp())?,
    };
    let caller = hex::decode(&fixture.caller)?;
    let privileged = fixture
        .privileged
        .iter()
        .map(hex::decode)
        .collect::<Result<Vec<_>, _>>()?;
    let is_privileged = |c: &[u8]| privileged.iter().any(|p| p == c);
    let env = Env::new(block_time, &caller, &is_privileged);

    println!(
        "\n  Verifying {} actions at block time {} ({} state entries)",
        actions.len(),
        block_time,
        state.len()
    );
    match verifier.verify_batch(&actions, &env, &state) {
        Ok(summary) => {
            println!("  Batch accepted");
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Err(e) => {
            println!("  Batch rejected [{:?}]: {}", e.class(), e);
            process::exit(2);
        }
    }

    if args.iter().any(|a| a == "--apply") {
        for action in &actions {
            let outcome = verifier.execute(action, &env, &mut state)?;
            println!("{}", serde_json::to_string(&outcome)?);
        }
        println!("  Applied; {} state entries", state.len());
    }
    Ok(())
}

fn cmd_config(args: &[String]) -> CliResult {
    let config = VerifierConfig::default();
    match args.first() {
        Some(path) => {
            config.save(path)?;
            println!("  Saved default config to {}", path);
        }
        None => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}
