use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use log::{error, warn};
use std::fs;
use std::path::PathBuf;

use factura::config::{self, Config};
use factura::data::{Invoice, RenderOptions, totals::invoice_totals};
use factura::messages::Messages;
use factura::util::assets::AssetLoader;
use factura::util::files::{suggested_file_name, write_pdf_file};
use factura::{FacturaError, parse_free_text, render_invoice_pdf};

#[derive(Parser)]
#[clap(name = "factura", about = "Renders invoices and quotes as PDF")]
struct Opt {
    /// Config file to use instead of the one in the user's config folder
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render an invoice JSON file to PDF
    Render(RenderOpt),
    /// Parse free text into item groups and print them as JSON
    Parse {
        /// Text file, `-` for stdin
        #[clap(default_value = "-")]
        file: PathBuf,
    },
    /// Print subtotal, tax and total of an invoice JSON file
    Totals { invoice: PathBuf },
}

#[derive(Parser)]
struct RenderOpt {
    invoice: PathBuf,
    #[clap(long, short = 'o')]
    out: Option<PathBuf>,
    #[clap(long)]
    title: Option<String>,
    #[clap(long)]
    footer_note: Option<String>,
    /// Logo path, URL or data URI
    #[clap(long)]
    logo: Option<String>,
    /// Signature path, URL or data URI
    #[clap(long)]
    signature: Option<String>,
    #[clap(long)]
    header_color: Option<String>,
    #[clap(long)]
    items_heading: Option<String>,
}

impl RenderOpt {
    /// Flags override the configured defaults.
    fn render_options(&self, config: &Config) -> RenderOptions {
        let mut options = config.render_options();
        let set = |target: &mut Option<String>, value: &Option<String>| {
            if value.is_some() {
                target.clone_from(value);
            }
        };
        set(&mut options.title, &self.title);
        set(&mut options.footer_note, &self.footer_note);
        set(&mut options.logo_url, &self.logo);
        set(&mut options.signature_url, &self.signature);
        set(&mut options.header_color_hex, &self.header_color);
        set(&mut options.items_heading, &self.items_heading);
        options
    }
}

fn read_invoice(path: &PathBuf) -> Result<Invoice> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let invoice = serde_json::from_str(&json).map_err(FacturaError::from)?;
    Ok(invoice)
}

fn read_text(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        return Ok(std::io::read_to_string(std::io::stdin())?);
    }
    Ok(fs::read_to_string(path)?)
}

fn render(opt: &RenderOpt, config: &Config) -> Result<()> {
    let invoice = read_invoice(&opt.invoice)?;

    let validation = invoice.validate();
    for line in validation.warning_lines() {
        warn!("{line}");
    }
    if validation.has_errors() {
        for line in validation.error_lines() {
            error!("{}: {line}", Messages::InvalidInvoice);
        }
        return Err(FacturaError::Validation(validation.error_lines().join("; ")).into());
    }

    let options = opt.render_options(config);
    let loader = AssetLoader::new(config.fetch_timeout());
    let assets = loader.resolve(&options, &config.fonts, config.default_logo.as_deref());
    let bytes = render_invoice_pdf(&invoice, &options, &assets)?;

    let out = opt
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(suggested_file_name(&invoice)));
    write_pdf_file(&out, &bytes)?;
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let opt = Opt::parse();

    let config = match &opt.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
    .map_err(|e| anyhow!(FacturaError::Config(e.to_string())))?;

    match &opt.command {
        Command::Render(render_opt) => render(render_opt, &config)?,
        Command::Parse { file } => {
            let groups = parse_free_text(&read_text(file)?);
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
        Command::Totals { invoice } => {
            let totals = invoice_totals(&read_invoice(invoice)?);
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
    }
    Ok(())
}
