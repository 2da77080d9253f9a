use anyhow::Result;
use clap::{Parser, Subcommand};
use sitepulse::report;
use sitepulse::session::{self, Command, Session};
use sitepulse_core::{Extractor, DEFAULT_CHUNK_CHARS};
use sitepulse_local::config::{FetchConfig, OllamaConfig, RenderConfig};
use sitepulse_local::ollama::OllamaExtractor;
use sitepulse_local::pipeline::{self, ScrapedPage};
use sitepulse_local::retrieve::Retriever;
use sitepulse_local::sentiment::{word_frequency, SentimentAggregator};
use std::io::Write;
use tokio::io::AsyncBufReadExt;

#[derive(Parser, Debug)]
#[command(name = "sitepulse")]
#[command(
    about = "Scrape one web page, then extract data with a local model or chart its sentiment",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a page (browser render, plain HTTP fallback) and print its cleaned text.
    Scrape(ScrapeCmd),
    /// Scrape a page, then ask the local model to pull out what the instruction describes.
    Extract(ExtractCmd),
    /// Scrape a page, then classify every paragraph and count frequent words.
    Sentiment(SentimentCmd),
    /// Line-oriented session: scrape once, then extract/sentiment without re-fetching.
    Interactive(InteractiveCmd),
    /// Diagnose configuration/launch issues (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct ScrapeCmd {
    url: String,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Chunk size (chars) used for the reported chunk count.
    #[arg(long, default_value_t = DEFAULT_CHUNK_CHARS)]
    max_chunk_chars: usize,
}

#[derive(clap::Args, Debug)]
struct ExtractCmd {
    url: String,
    /// What to extract, in plain language.
    #[arg(long, short = 'i')]
    instruction: String,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Max characters per chunk sent to the model.
    #[arg(long, default_value_t = DEFAULT_CHUNK_CHARS)]
    max_chunk_chars: usize,
}

#[derive(clap::Args, Debug)]
struct SentimentCmd {
    url: String,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// How many of the most frequent words to list.
    #[arg(long, default_value_t = 20)]
    top_words: usize,
}

#[derive(clap::Args, Debug)]
struct InteractiveCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
    /// Max characters per chunk sent to the model.
    #[arg(long, default_value_t = DEFAULT_CHUNK_CHARS)]
    max_chunk_chars: usize,
    /// How many of the most frequent words to list.
    #[arg(long, default_value_t = 20)]
    top_words: usize,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Probe the Ollama endpoint (`GET /api/tags`).
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    check_ollama: bool,
    /// Timeout for each probe (ms).
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn is_text(output: &str) -> bool {
    output.eq_ignore_ascii_case("text")
}

fn require_url(url: &str) -> Result<&str> {
    let url = url.trim();
    if url.is_empty() {
        anyhow::bail!("please enter a URL");
    }
    Ok(url)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("SITEPULSE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn extractor() -> Result<OllamaExtractor> {
    let client = reqwest::Client::builder().build()?;
    Ok(OllamaExtractor::from_env(client))
}

async fn run_extract(
    extractor: &OllamaExtractor,
    page: &ScrapedPage,
    instruction: &str,
    max_chunk_chars: usize,
) -> Result<String> {
    let chunks = page.chunks(max_chunk_chars);
    tracing::info!(
        url = %page.raw.url,
        chunks = chunks.len(),
        model = extractor.model(),
        "extracting"
    );
    Ok(extractor.extract(&chunks, instruction).await?)
}

fn print_scrape(page: &ScrapedPage, output: &str, max_chunk_chars: usize) {
    if is_text(output) {
        for w in &page.raw.warnings {
            eprintln!("warning: {w}");
        }
        println!("{}", page.cleaned);
    } else {
        println!("{}", report::scrape_json(page, max_chunk_chars));
    }
}

fn print_extract(
    page: &ScrapedPage,
    extractor: &OllamaExtractor,
    instruction: &str,
    extracted: &str,
    output: &str,
) {
    if is_text(output) {
        println!("{extracted}");
    } else {
        let v = serde_json::json!({
            "url": page.raw.url,
            "source": page.raw.source,
            "instruction": instruction,
            "model": extractor.model(),
            "ollama_base_url": extractor.base_url(),
            "extracted": extracted,
            "warnings": page.raw.warnings,
        });
        println!("{v}");
    }
}

fn print_sentiment(page: &ScrapedPage, output: &str, top_n: usize) {
    let report = SentimentAggregator::default().report(&page.cleaned);
    let freq = word_frequency(&report.all_text);
    if is_text(output) {
        for w in &page.raw.warnings {
            eprintln!("warning: {w}");
        }
        println!("{}", report::sentiment_text(&report, &freq, top_n));
    } else {
        println!("{}", report::sentiment_json(page, &report, &freq, top_n));
    }
}

async fn interactive(args: InteractiveCmd) -> Result<()> {
    let retriever = Retriever::from_env()?;
    let extractor = extractor()?;
    let mut session = Session::new();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    eprintln!("{}", session::HELP);
    loop {
        eprint!("sitepulse> ");
        let _ = std::io::stderr().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let cmd = match session::parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };
        match cmd {
            Command::Quit => break,
            Command::Help => eprintln!("{}", session::HELP),
            Command::Scrape(url) => {
                let page = pipeline::scrape(&retriever, &url).await;
                if page.raw.is_empty() {
                    eprintln!("nothing retrieved from {url}");
                }
                print_scrape(&page, &args.output, args.max_chunk_chars);
                session.replace(page);
            }
            Command::Show => match (session.url(), session.page()) {
                (Some(url), Some(page)) => {
                    eprintln!("current page: {url}");
                    print_scrape(page, &args.output, args.max_chunk_chars);
                }
                _ => eprintln!("No page scraped yet; run `scrape <url>` first."),
            },
            Command::Extract(instruction) => {
                let Some(page) = session.page() else {
                    eprintln!("No page scraped yet; run `scrape <url>` first.");
                    continue;
                };
                match run_extract(&extractor, page, &instruction, args.max_chunk_chars).await {
                    Ok(out) => {
                        print_extract(page, &extractor, &instruction, &out, &args.output)
                    }
                    Err(e) => eprintln!("extraction failed: {e}"),
                }
            }
            Command::Sentiment => match session.page() {
                Some(page) => print_sentiment(page, &args.output, args.top_words),
                None => eprintln!("No page scraped yet; run `scrape <url>` first."),
            },
        }
    }
    Ok(())
}

async fn doctor(args: DoctorCmd) -> Result<()> {
    fn has_env(k: &str) -> bool {
        std::env::var(k).ok().is_some_and(|v| !v.trim().is_empty())
    }

    let t0 = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(args.timeout_ms);
    let render = RenderConfig::from_env();
    let fetch = FetchConfig::from_env();
    let ollama = OllamaConfig::from_env();

    let mut checks: Vec<serde_json::Value> = Vec::new();

    // Check: node binary runs.
    if render.disabled {
        checks.push(serde_json::json!({
            "name": "node_available", "ok": true, "skipped": true,
            "message": "browser render disabled", "hint": "",
        }));
    } else {
        let probe = tokio::time::timeout(
            timeout,
            tokio::process::Command::new(&render.node_bin)
                .arg("--version")
                .kill_on_drop(true)
                .output(),
        )
        .await;
        let (ok, message) = match probe {
            Ok(Ok(out)) if out.status.success() => (
                true,
                String::from_utf8_lossy(&out.stdout).trim().to_string(),
            ),
            Ok(Ok(out)) => (false, format!("node exited with {}", out.status)),
            Ok(Err(e)) => (false, e.to_string()),
            Err(_) => (false, "node --version timed out".to_string()),
        };
        checks.push(serde_json::json!({
            "name": "node_available", "ok": ok, "skipped": false,
            "message": message,
            "hint": if ok { "" } else { "Install Node.js or set SITEPULSE_NODE; pages will use the plain HTTP fallback." },
        }));
    }

    // Check: playwright module resolvable.
    let pw_ok = render.disabled || sitepulse_local::render::playwright_resolvable(&render);
    checks.push(serde_json::json!({
        "name": "playwright_module", "ok": pw_ok, "skipped": render.disabled,
        "message": if pw_ok { "playwright found" } else { "playwright not found on NODE_PATH" },
        "hint": if pw_ok { "" } else { "Run `npm i -g playwright && npx playwright install chromium`, or set SITEPULSE_NODE_PATH." },
    }));

    // Check: ollama reachable (optional).
    if args.check_ollama {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let url = format!("{}/api/tags", ollama.base_url.trim_end_matches('/'));
        let (ok, message) = match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => (true, "ollama reachable".to_string()),
            Ok(resp) => (false, format!("ollama HTTP {}", resp.status())),
            Err(e) => (false, e.to_string()),
        };
        checks.push(serde_json::json!({
            "name": "ollama_reachable", "ok": ok, "skipped": false,
            "message": message,
            "hint": if ok { "" } else { "Start `ollama serve` or set SITEPULSE_OLLAMA_BASE_URL." },
        }));
    } else {
        checks.push(serde_json::json!({
            "name": "ollama_reachable", "ok": true, "skipped": true,
            "message": "skipped", "hint": "",
        }));
    }

    let ok = checks
        .iter()
        .all(|c| c["ok"].as_bool().unwrap_or(false));
    let payload = serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": ok,
        "name": "sitepulse",
        "version": env!("CARGO_PKG_VERSION"),
        "elapsed_ms": t0.elapsed().as_millis(),
        "configured": {
            "render": {
                "disabled": render.disabled,
                "node_bin": render.node_bin,
                "page_load_timeout_ms": render.page_load_timeout.as_millis() as u64,
                "settle_ms": render.settle.as_millis() as u64,
                "hard_timeout_ms": render.hard_timeout.as_millis() as u64,
            },
            "fetch": {
                "timeout_ms": fetch.timeout.as_millis() as u64,
                "custom_user_agent": has_env("SITEPULSE_USER_AGENT"),
            },
            "ollama": {
                "base_url": ollama.base_url,
                "model": ollama.model,
                "timeout_ms": ollama.timeout.as_millis() as u64,
            },
            "env_file": has_env("SITEPULSE_ENV_FILE"),
        },
        "checks": checks,
    });

    if is_text(&args.output) {
        println!("sitepulse {} (ok={})", env!("CARGO_PKG_VERSION"), ok);
        println!(
            "render: disabled={} node={}",
            render.disabled, payload["configured"]["render"]["node_bin"].as_str().unwrap_or("")
        );
        println!(
            "ollama: {} model={}",
            payload["configured"]["ollama"]["base_url"].as_str().unwrap_or(""),
            payload["configured"]["ollama"]["model"].as_str().unwrap_or("")
        );
        println!("checks:");
        if let Some(arr) = payload["checks"].as_array() {
            for c in arr {
                let name = c["name"].as_str().unwrap_or("?");
                let ok = c["ok"].as_bool().unwrap_or(false);
                if c["skipped"].as_bool().unwrap_or(false) {
                    println!("- {name}: skipped");
                } else {
                    println!("- {}: {}", name, if ok { "ok" } else { "fail" });
                }
            }
        }
    } else {
        println!("{payload}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional env-file loader (opt-in via SITEPULSE_ENV_FILE; never overrides process env).
    if let Ok(p) = std::env::var("SITEPULSE_ENV_FILE") {
        let p = p.trim();
        if !p.is_empty() {
            let _ = sitepulse::load_env_file(std::path::Path::new(p));
        }
    }

    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape(args) => {
            let url = require_url(&args.url)?;
            let page = pipeline::scrape(&Retriever::from_env()?, url).await;
            print_scrape(&page, &args.output, args.max_chunk_chars);
        }
        Commands::Extract(args) => {
            let url = require_url(&args.url)?;
            let instruction = args.instruction.trim();
            if instruction.is_empty() {
                anyhow::bail!("please describe what to extract (--instruction)");
            }
            let extractor = extractor()?;
            let page = pipeline::scrape(&Retriever::from_env()?, url).await;
            let out = run_extract(&extractor, &page, instruction, args.max_chunk_chars).await?;
            print_extract(&page, &extractor, instruction, &out, &args.output);
        }
        Commands::Sentiment(args) => {
            let url = require_url(&args.url)?;
            let page = pipeline::scrape(&Retriever::from_env()?, url).await;
            print_sentiment(&page, &args.output, args.top_words);
        }
        Commands::Interactive(args) => interactive(args).await?,
        Commands::Doctor(args) => doctor(args).await?,
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "sitepulse",
                "version": env!("CARGO_PKG_VERSION"),
            });
            if is_text(&args.output) {
                println!("sitepulse {}", env!("CARGO_PKG_VERSION"));
            } else {
                println!("{v}");
            }
        }
    }
    Ok(())
}
