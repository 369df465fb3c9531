//! Minimal CLI over the library. Set `ARGON2PW_CONFIG` to a JSON config file
//! to hash with custom parameters, and `RUST_LOG` to see diagnostics.

use std::env;
use std::process::ExitCode;

use argon2pw::config::load_config;
use argon2pw::strength::requirements;
use argon2pw::{decode, generate_password, generate_password_with_length, PasswordHasher, Runtime};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn print_usage() -> ExitCode {
    eprintln!("Commands:\n  hash-password <plaintext>\n  verify-password <plaintext> <argon2-hash>\n  generate-password [length]\n  generate-and-hash\n  check-strength <plaintext>\n  decode <argon2-hash>");
    ExitCode::from(2)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_hasher() -> Result<PasswordHasher, String> {
    let runtime = Runtime::detect();
    match env::var("ARGON2PW_CONFIG") {
        Ok(path) => {
            tracing::info!(%path, "loading hash config");
            let config = load_config(&path).map_err(|e| format!("config load failed: {e}"))?;
            PasswordHasher::with_config(runtime, &config).map_err(|e| format!("{e}"))
        }
        Err(_) => Ok(PasswordHasher::new(runtime)),
    }
}

fn run(args: &[String]) -> Result<ExitCode, String> {
    match args.get(1).map(String::as_str) {
        Some("hash-password") if args.len() == 3 => {
            let hash = build_hasher()?
                .hash(&args[2])
                .map_err(|e| format!("hashing failed: {e}"))?;
            println!("{hash}");
        }
        Some("verify-password") if args.len() == 4 => {
            let matches = build_hasher()?
                .verify(&args[2], &args[3])
                .map_err(|e| format!("verification failed: {e}"))?;
            println!("{}", if matches { "match" } else { "no-match" });
            if !matches {
                return Ok(ExitCode::FAILURE);
            }
        }
        Some("generate-password") if args.len() <= 3 => {
            let password = match args.get(2) {
                Some(length) => {
                    let length: i64 = length.parse().map_err(|e| format!("invalid length: {e}"))?;
                    generate_password_with_length(length)
                }
                None => generate_password(),
            }
            .map_err(|e| format!("generation failed: {e}"))?;
            println!("{password}");
        }
        Some("generate-and-hash") if args.len() == 2 => {
            let password = generate_password().map_err(|e| format!("generation failed: {e}"))?;
            let hash = build_hasher()?
                .hash(&password)
                .map_err(|e| format!("hashing failed: {e}"))?;
            let printable = json!({ "password": password, "hash": hash });
            println!("{}", serde_json::to_string_pretty(&printable).map_err(|e| format!("{e}"))?);
        }
        Some("check-strength") if args.len() == 3 => {
            let report = requirements(&args[2]);
            println!("{}", serde_json::to_string_pretty(&report).map_err(|e| format!("{e}"))?);
            if !report.is_satisfied() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Some("decode") if args.len() == 3 => {
            let decoded = decode(&args[2]).map_err(|e| format!("decode failed: {e}"))?;
            let printable = json!({
                "memoryKiB": decoded.memory_kib,
                "iterations": decoded.iterations,
                "parallelism": decoded.parallelism,
                "saltLength": decoded.salt.len(),
                "keyLength": decoded.digest.len(),
            });
            println!("{}", serde_json::to_string_pretty(&printable).map_err(|e| format!("{e}"))?);
        }
        _ => return Ok(print_usage()),
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_logging();
    let args: Vec<String> = env::args().collect();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
