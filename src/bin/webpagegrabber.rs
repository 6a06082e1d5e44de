use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use webpage_grabber::config::{BrowserOptions, DEFAULT_OUTPUT, DEFAULT_TIMEOUT_SECS, GrabConfig};
use webpage_grabber::grabber;

/// Fetches a page with a headless Chrome and saves its HTML
/// once scripts have run and the body is visible
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// URL of the dynamic page to fetch
    #[arg(short, long, default_value = "")]
    url: String,

    /// Output file to save the content
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Timeout in seconds for the whole fetch
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS, allow_negative_numbers = true)]
    timeout: i64,

    /// Log browser steps
    #[arg(short, long)]
    verbose: bool,
}

/// Go-style flag names and the long flag each one stands for.
const FLAG_ALIASES: [(&str, &str); 3] = [("url", "--url"), ("o", "--output"), ("t", "--timeout")];

/// Rewrites Go-style spellings (`-url`, `--o`, `--t=30`, ...) into clap's
/// long flags. clap would otherwise read `-url` as `-u rl`.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let Some(flag) = arg.to_str().and_then(|s| s.strip_prefix('-')) else {
                return arg;
            };
            let flag = flag.strip_prefix('-').unwrap_or(flag);
            let (name, value) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (flag, None),
            };

            match FLAG_ALIASES.iter().find(|(alias, _)| *alias == name) {
                Some((_, long)) => match value {
                    Some(value) => OsString::from(format!("{long}={value}")),
                    None => OsString::from(*long),
                },
                None => arg,
            }
        })
        .collect()
}

/// Filter used when `RUST_LOG` is unset. headless_chrome logs every launch
/// attempt at info, so it stays at error unless `-v` is given.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,webpage_grabber=debug,webpagegrabber=debug"
    } else {
        "warn,headless_chrome=error"
    }
}

fn main() -> ExitCode {

    let args = Args::parse_from(normalize_args(std::env::args_os()));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(args.verbose)));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Can't start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let config = GrabConfig::new(args.url, args.output, args.timeout);
    let options = BrowserOptions::from_env();

    let result = runtime.block_on(grabber::run(&config, &options));
    // a Chrome launch abandoned at the deadline must not hold up the exit
    runtime.shutdown_background();

    match result {
        Ok(_) => {
            println!("Content successfully saved to {}", config.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(normalize_args(args.iter().map(OsString::from)))
    }

    #[test]
    fn go_style_flags() {
        let args = parse(&["webpagegrabber", "-url", "http://example.com", "-o", "/tmp/test.html", "-t", "30"]);

        assert_eq!(args.url, "http://example.com");
        assert_eq!(args.output, PathBuf::from("/tmp/test.html"));
        assert_eq!(args.timeout, 30);
    }

    #[test]
    fn url_with_equals_sign() {
        let args = parse(&["webpagegrabber", "-url=http://example.com/?a=b"]);
        assert_eq!(args.url, "http://example.com/?a=b");
    }

    #[test]
    fn defaults() {
        let args = parse(&["webpagegrabber"]);

        assert_eq!(args.url, "");
        assert_eq!(args.output, PathBuf::from("out.html"));
        assert_eq!(args.timeout, 60);
        assert!(!args.verbose);
    }

    #[test]
    fn go_style_double_dash_flags() {
        let args = parse(&["webpagegrabber", "--o", "x.html", "--t=15", "--url=http://example.com"]);

        assert_eq!(args.url, "http://example.com");
        assert_eq!(args.output, PathBuf::from("x.html"));
        assert_eq!(args.timeout, 15);

        let args = parse(&["webpagegrabber", "--o=y.html", "--t", "7", "-url", "a"]);
        assert_eq!(args.output, PathBuf::from("y.html"));
        assert_eq!(args.timeout, 7);
    }

    #[test]
    fn values_and_other_flags_pass_through() {
        let normalized = normalize_args(
            ["webpagegrabber", "-v", "--output", "-t", "-5", "page.html"].map(OsString::from),
        );

        assert_eq!(
            normalized,
            ["webpagegrabber", "-v", "--output", "--timeout", "-5", "page.html"].map(OsString::from)
        );
    }

    #[test]
    fn headless_chrome_is_quiet_by_default() {
        assert!(default_filter(false).contains("headless_chrome=error"));
        assert!(!default_filter(false).starts_with("info"));
        assert!(default_filter(true).contains("webpage_grabber=debug"));
    }

    #[test]
    fn long_flags_and_negative_timeout() {
        let args = parse(&["webpagegrabber", "--url", "http://example.com", "--output", "page.html", "--timeout", "-5"]);

        assert_eq!(args.output, PathBuf::from("page.html"));
        assert_eq!(args.timeout, -5);
    }
}
