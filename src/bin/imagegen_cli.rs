//! imagegen-cli — 模型目录查询与图像生成的命令行工具
//!
//! Usage:
//!   imagegen-cli models [--refresh]                  List available models
//!   imagegen-cli generate <prompt> [OPTIONS]         Generate and save an image

use anyhow::{bail, Context};
use imagegen_core::{ImageClientBuilder, RequestParams, StyleTag};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "models" => cmd_models(&args[2..]).await,
        "generate" => cmd_generate(&args[2..]).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"imagegen-cli — AI 图像生成命令行工具

USAGE:
    imagegen-cli <COMMAND> [OPTIONS]

COMMANDS:
    models [--refresh] [--json]     List available generation models
    generate <prompt> [OPTIONS]     Generate an image and write it to disk
    version                         Show version information
    help                            Show this help message

GENERATE OPTIONS:
    --model <id>                    Model id (default: turbo)
    --style <tag>                   photorealistic | anime | fantasy-art | abstract
    --negative <text>               Negative prompt
    --width <px> / --height <px>    Output size, 256..=2048 (default: 1024)
    --seed <n>                      Fixed seed
    --enhance                       Enhance the prompt with a text model first
    --no-safe                       Disable safe mode
    --logo                          Keep the provider logo
    --out <path>                    File or directory to write (default: .)

ENVIRONMENT:
    IMAGEGEN_IMAGE_BASE_URL         Image service base URL
    IMAGEGEN_TEXT_BASE_URL          Text service base URL
    RUST_LOG                        Log filter (default: warn)"#
    );
}

fn cmd_version() {
    println!("imagegen-cli {}", env!("CARGO_PKG_VERSION"));
}

async fn cmd_models(args: &[String]) -> anyhow::Result<()> {
    let client = ImageClientBuilder::from_env().build()?;
    let catalog = if args.iter().any(|a| a == "--refresh") {
        client.refetch_models().await
    } else {
        client.models().await
    };

    if args.iter().any(|a| a == "--json") {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    for model in &catalog.models {
        println!("{:<12} {:<12} {}", model.id, model.display_name, model.description);
    }
    if catalog.fallback {
        eprintln!(
            "(fallback list: {})",
            catalog.last_error.as_deref().unwrap_or("upstream list unavailable")
        );
    } else if catalog.cached {
        eprintln!("(cached)");
    }
    Ok(())
}

async fn cmd_generate(args: &[String]) -> anyhow::Result<()> {
    let (request, out) = parse_generate_args(args)?;
    let client = ImageClientBuilder::from_env().build()?;

    let image = client.generate(&request).await?;
    let path = client
        .save_image(&image, &out)
        .await
        .with_context(|| format!("writing image to {}", out.display()))?;

    println!("{}", path.display());
    eprintln!("prompt: {}", image.final_prompt);
    Ok(())
}

fn parse_generate_args(args: &[String]) -> anyhow::Result<(RequestParams, PathBuf)> {
    let mut prompt: Option<String> = None;
    let mut out = PathBuf::from(".");
    let mut req = RequestParams::new("");
    let mut width = req.width;
    let mut height = req.height;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--model" => req = req.with_model(value("--model")?),
            "--style" => req = req.with_style(value("--style")?.parse::<StyleTag>()?),
            "--negative" => req = req.with_negative_prompt(value("--negative")?),
            "--width" => width = value("--width")?.parse().context("--width must be a number")?,
            "--height" => {
                height = value("--height")?
                    .parse()
                    .context("--height must be a number")?
            }
            "--seed" => {
                req = req.with_seed(value("--seed")?.parse().context("--seed must be a number")?)
            }
            "--out" => out = PathBuf::from(value("--out")?),
            "--enhance" => req = req.with_enhance(true),
            "--no-safe" => req = req.with_safe_mode(false),
            "--logo" => req = req.with_no_logo(false),
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            text => {
                if prompt.is_some() {
                    bail!("prompt given twice; quote it as one argument");
                }
                prompt = Some(text.to_string());
            }
        }
    }

    let Some(prompt) = prompt else {
        bail!("missing prompt");
    };
    req.prompt_text = prompt;
    Ok((req.with_size(width, height), out))
}
