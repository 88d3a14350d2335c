use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use intake_core::ExtractionConfig;
use intake_sheet::extract_sheet;
use tracing_subscriber::EnvFilter;

mod workbook;

#[derive(Parser, Debug)]
#[command(
    name = "intake-cli",
    about = "Trích xuất bệnh sử từ file bảng tính (xlsx, xls, xlsb, ods)."
)]
struct Args {
    /// Đường dẫn tới file bảng tính.
    #[arg(short, long)]
    input: PathBuf,

    /// Tên worksheet cần đọc; mặc định là worksheet đầu tiên.
    #[arg(short, long)]
    sheet: Option<String>,

    /// Chấp nhận thêm nhãn "Address" bên cạnh "Adress".
    #[arg(long)]
    accept_address_spelling: bool,

    /// In JSON có thụt lề.
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let sheet = workbook::load_sheet(&args.input, args.sheet.as_deref())?;

    let config = ExtractionConfig {
        accept_address_spelling: args.accept_address_spelling,
        ..ExtractionConfig::default()
    };
    let result = extract_sheet(&sheet, &config)
        .with_context(|| format!("Không trích xuất được file {:?}", args.input))?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");

    Ok(())
}
