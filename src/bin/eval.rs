use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use tennis_torch::answer_client::{AnswerClient, AnswerService};
use tennis_torch::citations::cited_numbers;
use tennis_torch::config::AppConfig;
use tennis_torch::models::AnswerResult;

#[derive(Parser, Debug)]
#[command(name = "eval")]
#[command(about = "Run a question set against the answer service")]
struct Cli {
    #[arg(long, default_value = "eval/prompts.jsonl")]
    file: String,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct EvalPrompt {
    id: String,
    query: String,
    #[serde(default)]
    expect_contains: Vec<String>,
    #[serde(default)]
    min_matches: Option<usize>,
}

#[derive(Debug, Default, PartialEq)]
struct Tally {
    total: usize,
    failed_requests: usize,
    passed: usize,
    with_citations: usize,
    markers: usize,
    resolved_markers: usize,
}

impl Tally {
    fn record(&mut self, prompt: &EvalPrompt, answer: &AnswerResult) -> bool {
        let cited = cited_numbers(&answer.response);
        if !cited.is_empty() {
            self.with_citations += 1;
        }
        self.markers += cited.len();
        self.resolved_markers += cited
            .iter()
            .filter(|n| answer.match_for_citation(**n).is_some())
            .count();

        let lower = answer.response.to_ascii_lowercase();
        let contains_pass = prompt
            .expect_contains
            .iter()
            .all(|needle| lower.contains(&needle.to_ascii_lowercase()));
        let matches_pass = prompt
            .min_matches
            .map_or(true, |min| answer.matches.len() >= min);

        let pass = contains_pass && matches_pass;
        if pass {
            self.passed += 1;
        }
        pass
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let api_url = cli.api_url.unwrap_or(config.api_base_url);
    let client = AnswerClient::new(api_url, config.request_timeout)?;

    let prompts = load_prompts(&cli.file)?;
    if prompts.is_empty() {
        anyhow::bail!("no prompts found in {}", cli.file);
    }

    let mut tally = Tally::default();
    for prompt in &prompts {
        tally.total += 1;
        let answer = match client.query(&prompt.query).await {
            Ok(answer) => answer,
            Err(err) => {
                tally.failed_requests += 1;
                println!("--- {} --- request failed: {}", prompt.id, err);
                continue;
            }
        };

        let pass = tally.record(prompt, &answer);
        if cli.verbose || !pass {
            println!("--- {} --- {}", prompt.id, if pass { "pass" } else { "FAIL" });
            println!("Q: {}", prompt.query);
            println!("A: {}", answer.response.replace('\n', " "));
            println!("Matches: {}", answer.matches.len());
            println!();
        }
    }

    println!("Eval prompts: {}", tally.total);
    println!("Request failures: {}", tally.failed_requests);
    println!("Expectation pass rate: {:.1}%", ratio(tally.passed, tally.total) * 100.0);
    println!(
        "Citation rate: {:.1}%",
        ratio(tally.with_citations, tally.total) * 100.0
    );
    println!(
        "Resolved citations: {:.1}% ({}/{})",
        ratio(tally.resolved_markers, tally.markers) * 100.0,
        tally.resolved_markers,
        tally.markers
    );

    Ok(())
}

fn load_prompts(path: &str) -> Result<Vec<EvalPrompt>> {
    let file = File::open(path).with_context(|| format!("failed opening {}", path))?;
    let reader = BufReader::new(file);
    let mut prompts = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parsed: EvalPrompt = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON at {} line {}", path, idx + 1))?;
        prompts.push(parsed);
    }

    Ok(prompts)
}

fn ratio(n: usize, d: usize) -> f32 {
    if d == 0 {
        return 0.0;
    }
    n as f32 / d as f32
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
