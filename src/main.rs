use anyhow::Result;
use clap::Parser;
use junit_docx_report::{generate_report, RenderOptions};
use log::{warn, LevelFilter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert JUnit XML test results to a Word document report",
    after_help = "Examples:\n    junit-docx-report test-results.xml report.docx\n    junit-docx-report junit.xml out/test_report.docx --verbose"
)]
struct Args {
    /// Input JUnit XML file.
    input_file: PathBuf,

    /// Output Word document (.docx).
    output_file: PathBuf,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Title printed at the top of the report.
    #[arg(long, default_value = "Test Execution Report")]
    title: String,
}

fn init_logging(verbose: bool) -> Result<()> {
    let (level, crate_level) = if verbose {
        (LevelFilter::Info, LevelFilter::Debug)
    } else {
        (LevelFilter::Warn, LevelFilter::Warn)
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.level(),
                message
            ))
        })
        .level(level)
        .level_for("junit_docx_report", crate_level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let is_xml = args
        .input_file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    if args.input_file.exists() && !is_xml {
        warn!(
            "input file '{}' does not have .xml extension",
            args.input_file.display()
        );
    }

    let options = RenderOptions {
        title: args.title,
        ..RenderOptions::default()
    };
    generate_report(&args.input_file, &args.output_file, &options)?;

    println!("Report successfully generated: {}", args.output_file.display());
    Ok(())
}
