use std::io::stdin;
use std::process::ExitCode;

use auth_check::{hash_params, hash_password, password_equals};

// Same default cost as the server's SCRYPT_LOG_N
const DEFAULT_LOG_N: u8 = 15;

// Prints a hash for ADMIN_PASSWORD_HASH.
// Use release build for performance, debug build is VERY slow
fn main() -> ExitCode {
    let log_n = match std::env::var("SCRYPT_LOG_N") {
        Ok(value) => match value.trim().parse() {
            Ok(log_n) => log_n,
            Err(_) => {
                eprintln!("SCRYPT_LOG_N must be a small integer, got {:?}", value);
                return ExitCode::FAILURE;
            }
        },
        Err(_) => DEFAULT_LOG_N,
    };
    let params = match hash_params(log_n) {
        Ok(params) => params,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut password = String::new();
    println!("Enter password to hash (no whitespace!):");
    if let Err(err) = stdin().read_line(&mut password) {
        eprintln!("Failed to read password: {}", err);
        return ExitCode::FAILURE;
    }
    let password = password.trim();

    if password.is_empty() {
        println!("Password cannot be empty.");
        return ExitCode::FAILURE;
    }

    let password_hash = match hash_password(password, params) {
        Ok(hash) => hash,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    println!("Generated password hash: {}", password_hash);
    println!("Verification result: {}", password_equals(&password_hash, password));
    ExitCode::SUCCESS
}
