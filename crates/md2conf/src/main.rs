//! md2conf CLI - converts a markdown document to Confluence storage
//! format and publishes it as a page, creating or updating as needed.
//!
//! Without `--publish` the rendered page is written to stdout; with
//! incomplete credentials a publish run downgrades to render-only
//! instead of failing.

mod error;
mod output;

use std::path::PathBuf;

use clap::Parser;
use md2conf_confluence::{ConfluenceClient, PagePublisher, PublishOptions, PublishOutcome};
use md2conf_renderer::{
    convert_admonition_blocks, convert_code_blocks, drop_first_line, extract_title, notice_banner,
    render_markdown, wrap_with_toc,
};
use tracing_subscriber::EnvFilter;

use error::CliError;
use output::Output;

/// Converts and deploys a markdown post to Confluence.
#[derive(Parser)]
#[command(name = "md2conf", version, about)]
struct Cli {
    /// Full path of the markdown file to convert and upload.
    #[arg(short = 'm', long)]
    markdown_file: PathBuf,

    /// Confluence space key. Unnecessary if '--publish' is not set.
    #[arg(short = 's', long, env = "CONFLUENCE_SPACE")]
    space: Option<String>,

    /// Confluence username. For API tokens, use the full email address.
    #[arg(short = 'u', long, env = "CONFLUENCE_USR")]
    username: Option<String>,

    /// Confluence password or API token.
    #[arg(short = 'p', long, env = "CONFLUENCE_PSW", hide_env_values = true)]
    password: Option<String>,

    /// Confluence URL, e.g. 'https://mycompany.atlassian.net/wiki'.
    #[arg(long, env = "CONFLUENCE_URL")]
    url: Option<String>,

    /// Parent page ID under which the page will be created.
    #[arg(short = 'a', long)]
    ancestor_id: Option<String>,

    /// Log verbosity (error, warn, info, debug).
    #[arg(short = 'l', long, default_value = "info")]
    loglevel: String,

    /// Page title; taken from the first heading in the markdown file
    /// when omitted.
    #[arg(long)]
    title: Option<String>,

    /// Generate a Table of Contents block.
    #[arg(long)]
    toc: bool,

    /// Skip the auto-update notice block.
    #[arg(long)]
    no_notice: bool,

    /// File name to save the rendered content to.
    #[arg(short = 'o', long)]
    out_file: Option<PathBuf>,

    /// Publish to Confluence. Requires credentials via flags or
    /// environment variables.
    #[arg(long)]
    publish: bool,

    /// Update the page even when no changes are detected.
    #[arg(long)]
    force_update: bool,

    /// Full link to the CI job for the notice block.
    #[arg(long, env = "JOB_URL")]
    job_url: Option<String>,

    /// Full link to the git repository for the notice block.
    #[arg(long)]
    repo_url: Option<String>,
}

/// Resolved publish credentials.
struct Credentials {
    url: String,
    space: String,
    username: String,
    password: String,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let filter =
        EnvFilter::try_new(&cli.loglevel).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(&cli, &output) {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn run(cli: &Cli, output: &Output) -> Result<(), CliError> {
    let credentials = resolve_credentials(cli, output);

    if !cli.markdown_file.exists() {
        return Err(CliError::Validation(format!(
            "Markdown file '{}' does not exist.",
            cli.markdown_file.display()
        )));
    }
    let markdown = std::fs::read_to_string(&cli.markdown_file)?;

    let title = cli
        .title
        .clone()
        .or_else(|| extract_title(&markdown))
        .ok_or_else(|| {
            CliError::Validation(
                "Can not determine a title for this page. \
                 Add a heading to the markdown file or provide one via --title."
                    .to_owned(),
            )
        })?;
    output.info(&format!("Title: {title}"));

    let result = render_markdown(&markdown);
    let mut html = result.html;

    // The first rendered heading became the page title; Confluence
    // already shows the title above the body.
    if cli.title.is_none() {
        html = drop_first_line(&html);
    }

    if !cli.no_notice {
        let banner = notice_banner(cli.job_url.as_deref(), cli.repo_url.as_deref());
        html = banner + &html;
    }
    if cli.toc {
        html = wrap_with_toc(&html);
    }

    // Macro conversion runs last so the banner and layout blocks take
    // the same path through storage-format canonicalization as the rest
    // of the page.
    html = convert_code_blocks(&html);
    html = convert_admonition_blocks(&html);

    if let Some(out_file) = &cli.out_file {
        std::fs::write(out_file, &html)?;
        output.info(&format!(
            "Rendered content written to '{}'.",
            out_file.display()
        ));
    }

    match credentials {
        Some(credentials) => publish(cli, output, &credentials, &title, &html)?,
        None => {
            output.info("Rendered page content:");
            println!("{html}");
        }
    }

    Ok(())
}

/// Publish the rendered content, creating or updating the page.
fn publish(
    cli: &Cli,
    output: &Output,
    credentials: &Credentials,
    title: &str,
    html: &str,
) -> Result<(), CliError> {
    output.info(&format!("Space key: {}", credentials.space));

    let client = ConfluenceClient::new(
        &credentials.url,
        &credentials.username,
        &credentials.password,
    );
    let options = PublishOptions {
        space: credentials.space.clone(),
        ancestor_id: cli.ancestor_id.clone(),
        force_update: cli.force_update,
        debug_artifacts: cli.loglevel.eq_ignore_ascii_case("debug"),
    };
    let publisher = PagePublisher::new(&client, options);

    match publisher.publish(title, html)? {
        PublishOutcome::Created => output.success(&format!("Page \"{title}\" created.")),
        PublishOutcome::Updated => output.success(&format!("Page \"{title}\" updated.")),
        PublishOutcome::Unchanged => output.info(
            "No changes detected. Page update skipped. \
             To force a page update, use the '--force-update' flag.",
        ),
    }
    Ok(())
}

/// Check publish credentials, downgrading to render-only when incomplete.
fn resolve_credentials(cli: &Cli, output: &Output) -> Option<Credentials> {
    if !cli.publish {
        if cli.force_update {
            output.warning("'--force-update' passed while '--publish' is not.");
        }
        output.info("The markdown file will only be rendered. No push to Confluence will be performed.");
        return None;
    }

    let mut missing = Vec::new();
    if cli.url.is_none() {
        output.error(
            "Please provide a valid Confluence URL via '--url' or the environment variable 'CONFLUENCE_URL'.",
        );
        missing.push("url");
    }
    if cli.space.is_none() {
        output.error(
            "Please provide a valid Confluence space key via '--space' or the environment variable 'CONFLUENCE_SPACE'.",
        );
        missing.push("space");
    }
    if cli.username.is_none() || cli.password.is_none() {
        output.error("Please provide a valid username and password via arguments or environment variables.");
        missing.push("credentials");
    }

    if !missing.is_empty() {
        output.warning(
            "Some of the required credentials were not defined, forcing render-only mode.",
        );
        return None;
    }

    Some(Credentials {
        url: cli.url.clone()?,
        space: cli.space.clone()?,
        username: cli.username.clone()?,
        password: cli.password.clone()?,
    })
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_minimal_invocation_parses() {
        let cli = Cli::try_parse_from(["md2conf", "-m", "README.md"]).unwrap();
        assert_eq!(cli.markdown_file, PathBuf::from("README.md"));
        assert!(!cli.publish);
        assert_eq!(cli.loglevel, "info");
    }

    #[test]
    fn test_publish_flags_parse() {
        let cli = Cli::try_parse_from([
            "md2conf",
            "--markdown-file",
            "doc.md",
            "--publish",
            "--force-update",
            "--toc",
            "--url",
            "https://confluence.example.com/wiki",
            "-s",
            "DOCS",
            "-u",
            "bot@example.com",
            "-p",
            "token",
            "-a",
            "12345",
        ])
        .unwrap();

        assert!(cli.publish);
        assert!(cli.force_update);
        assert!(cli.toc);
        assert_eq!(cli.ancestor_id.as_deref(), Some("12345"));
    }
}
