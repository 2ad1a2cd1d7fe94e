use snippet_debugger::console::run_console;
use snippet_debugger::debugger::Stepper;
use snippet_debugger::executor::BatchEngine;
use snippet_debugger::host::run_host_mode;
use snippet_debugger::parser::Language;
use snippet_debugger::EngineConfig;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

const USAGE: &str = "usage: snippet-debugger [--host] [--language <java|python|javascript>] \
[--timeout-ms <n>] [--run] <file>";

struct Options {
    host: bool,
    run: bool,
    language: Option<Language>,
    config: EngineConfig,
    file: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        host: false,
        run: false,
        language: None,
        config: EngineConfig::default(),
        file: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--host" => options.host = true,
            "--run" => options.run = true,
            "--language" => {
                let tag = args.next().ok_or("--language needs a value")?;
                options.language = Some(Language::from_tag(&tag));
            }
            "--timeout-ms" => {
                let value = args.next().ok_or("--timeout-ms needs a value")?;
                let ms = value
                    .parse()
                    .map_err(|_| format!("invalid timeout: {value}"))?;
                options.config = options.config.with_timeout_ms(ms);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown flag {flag}\n{USAGE}")),
            _ => options.file = Some(arg),
        }
    }
    Ok(options)
}

/// Only installs a subscriber when `RUST_LOG` is set; always on stderr.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn language_for(path: &str) -> Language {
    match path.rsplit('.').next() {
        Some("py") => Language::Python,
        Some("js") => Language::JavaScript,
        _ => Language::Java,
    }
}

fn main() -> ExitCode {
    init_tracing();

    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    match run(options) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(options: Options) -> io::Result<ExitCode> {
    if options.host {
        run_host_mode(options.config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(path) = options.file else {
        eprintln!("{USAGE}");
        return Ok(ExitCode::from(2));
    };
    let code = fs::read_to_string(&path)?;
    let language = options.language.unwrap_or_else(|| language_for(&path));

    if options.run {
        let timeout = options.config.timeout();
        let mut engine = BatchEngine::new(options.config);
        let result = engine.execute(&code, language, timeout);
        let mut stdout = io::stdout();
        serde_json::to_writer_pretty(&mut stdout, &result)?;
        writeln!(stdout)?;
        return Ok(if result.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let mut stepper = Stepper::new(options.config);
    stepper.load_with_language(&code, language);
    let stdin = io::stdin();
    run_console(&mut stepper, stdin.lock(), &mut io::stderr())?;
    Ok(ExitCode::SUCCESS)
}
