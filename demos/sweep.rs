//! Sweep example
//!
//! Reads package import paths from stdin, one per line, and prints the
//! decision for each one:
//!
//! ```bash
//! printf 'github.com/golang/example/hello\ngopkg.in/yaml.v2\n' \
//!     | cargo run --example sweep -- suppress
//! ```
//!
//! The mode is `archive`, `fast-forks` or `suppress` (default). Credentials
//! are picked up from `GITHUB_CLIENT_ID` and `GITHUB_CLIENT_SECRET`; without
//! them the anonymous tier allows one request per minute.

use pkg_sweep::{BatchEvaluator, Check, EvaluatorConfig, GithubAuth, Package};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let check = match std::env::args().nth(1).as_deref() {
        None | Some("suppress") => Check::Suppress,
        Some("archive") => Check::Archive,
        Some("fast-forks") => Check::FastFork,
        Some(other) => {
            eprintln!("unknown mode {other:?}, expected archive, fast-forks or suppress");
            std::process::exit(2);
        }
    };

    let config = EvaluatorConfig {
        auth: GithubAuth::from_env(),
        ..Default::default()
    };
    let evaluator = BatchEvaluator::builder(config).build()?;

    let mut packages = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            packages.push(Package::new(line));
        }
    }

    let mut results = evaluator.run(check, packages);
    let (mut positive, mut failed) = (0, 0);
    while let Some(result) = results.recv().await {
        match result.error {
            Some(e) => {
                failed += 1;
                eprintln!("error  {e}");
            }
            None if result.decision => {
                positive += 1;
                println!("{check}  {}", result.path);
            }
            None => println!("keep  {}", result.path),
        }
    }

    eprintln!("{positive} flagged for {check}, {failed} failed");
    Ok(())
}
