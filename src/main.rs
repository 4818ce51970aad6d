// quickink-pdf: Produce signed PDFs and signing certificates

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use clap::Parser;
use quickink_pdf::{
    signed_filename, AnySource, FetchFailurePolicy, GenerationConfig, GenerationContext,
    SignError, SignatureInfo,
};
use quickink_pdf::signature::format_iso;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// Data Structures
// ============================================================================

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Embed a signature into a PDF, or issue a signing certificate")]
struct Args {
    /// Signature info as JSON (camelCase fields); flags below override it
    #[arg(long)]
    info: Option<String>,

    /// Signer name
    #[arg(short, long)]
    name: Option<String>,

    /// Signer email
    #[arg(short, long)]
    email: Option<String>,

    /// Signature image: PNG file path or data URI
    #[arg(short, long)]
    signature: Option<String>,

    /// Document title
    #[arg(short, long)]
    title: Option<String>,

    /// Signing time (ISO-8601, defaults to now)
    #[arg(long)]
    signed_at: Option<String>,

    /// Signer IP address
    #[arg(long)]
    ip: Option<String>,

    /// Document description (certificate only)
    #[arg(long)]
    description: Option<String>,

    /// Source document (URL or file path). Without it a certificate is produced
    #[arg(long)]
    source: Option<String>,

    /// Output filename (defaults to {title}_signed.pdf)
    #[arg(short, long)]
    output: Option<String>,

    /// Generation config file (JSON)
    #[arg(long)]
    config: Option<String>,

    /// Product name shown in footers and the certificate header
    #[arg(long)]
    product: Option<String>,

    /// Produce a certificate when the source document cannot be fetched
    #[arg(long)]
    fallback_certificate: bool,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    init_tracing();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run() -> Result<(), SignError> {
    let args = Args::parse();

    let config = load_config(&args)?;
    let info = build_info(&args)?;

    let context = GenerationContext::with_source(config, AnySource::default());
    let pdf = context.generate_signed_document(args.source.as_deref(), &info)?;

    let output_file = args
        .output
        .clone()
        .unwrap_or_else(|| signed_filename(&info.document_title));
    std::fs::write(&output_file, &pdf)?;

    println!("✓ Generated: {}", output_file);
    println!("  Document: {}", info.document_title);
    println!("  Signer: {} <{}>", info.signer_name, info.signer_email);
    match args.source.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(source) => println!("  Source: {}", source),
        None => println!("  Source: none (signing certificate)"),
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn load_config(args: &Args) -> Result<GenerationConfig, SignError> {
    let mut config = match &args.config {
        Some(path) => GenerationConfig::from_json_file(path)?,
        None => GenerationConfig::default(),
    };
    if let Some(product) = &args.product {
        config.product_name = product.clone();
    }
    if args.fallback_certificate {
        config.on_fetch_failure = FetchFailurePolicy::Certificate;
    }
    Ok(config)
}

fn build_info(args: &Args) -> Result<SignatureInfo, SignError> {
    let mut info: SignatureInfo = match &args.info {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| SignError::ValidationError(format!("{}: {}", path, e)))?;
            serde_json::from_str(&content)
                .map_err(|e| SignError::ValidationError(format!("Invalid JSON: {}", e)))?
        }
        None => SignatureInfo {
            signature_image_data: String::new(),
            signer_name: String::new(),
            signer_email: String::new(),
            signed_at: format_iso(&Utc::now()),
            ip_address: None,
            document_title: "Document".to_string(),
            document_description: None,
            audit_trail: Vec::new(),
        },
    };

    if let Some(name) = &args.name {
        info.signer_name = name.clone();
    }
    if let Some(email) = &args.email {
        info.signer_email = email.clone();
    }
    if let Some(signature) = &args.signature {
        info.signature_image_data = load_signature(signature)?;
    }
    if let Some(title) = &args.title {
        info.document_title = title.clone();
    }
    if let Some(signed_at) = &args.signed_at {
        info.signed_at = signed_at.clone();
    }
    if args.ip.is_some() {
        info.ip_address = args.ip.clone();
    }
    if args.description.is_some() {
        info.document_description = args.description.clone();
    }

    Ok(info)
}

/// Accepts a data URI as-is; anything else is read as a PNG file.
fn load_signature(value: &str) -> Result<String, SignError> {
    if value.starts_with("data:") {
        return Ok(value.to_string());
    }
    let bytes = std::fs::read(value)
        .map_err(|e| SignError::ImageDecodeError(format!("{}: {}", value, e)))?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(bytes)))
}
