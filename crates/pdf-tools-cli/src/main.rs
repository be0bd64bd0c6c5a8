use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use pdf_overlay::{
    AnnotationKind, AnnotationRecord, BoundsPolicy, Color, CoordinateSpaceContext, DocumentId,
    DocumentStore, ExportOptions, ExportPipeline, FieldValueMap, FileStore, Geometry, PdfHandle,
    Rect, StrokeStyle, fill, record_form_values,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pdft", about = "Fill PDF forms and burn annotations into pages", version)]
struct Cli {
    /// Document store directory
    #[arg(long, global = true, default_value = ".pdft")]
    store: PathBuf,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a PDF to the store
    Import {
        /// PDF file to import
        input: PathBuf,

        /// Document id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// List the form fields of a PDF file
    Fields {
        /// PDF file to inspect
        input: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Fill form fields of a PDF file directly, without the store
    Fill {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Field value as NAME=VALUE, repeatable
        #[arg(long = "set", value_parser = parse_key_val)]
        values: Vec<(String, String)>,

        /// Flatten the form after filling
        #[arg(long)]
        flatten: bool,
    },

    /// Record form values for a stored document
    Values {
        /// Document id
        #[arg(long)]
        id: String,

        /// Field value as NAME=VALUE, repeatable
        #[arg(long = "set", value_parser = parse_key_val)]
        values: Vec<(String, String)>,

        /// JSON object of field values, overridden by --set pairs
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Add an annotation to a stored document
    Annotate {
        /// Document id
        #[arg(long)]
        id: String,

        /// Zero-based page index
        #[arg(long, default_value = "0")]
        page: usize,

        #[arg(long, default_value = "highlight", value_enum)]
        kind: KindArg,

        /// Rectangle in rendered pixels as X0,Y0,X1,Y1 (origin top-left)
        #[arg(long)]
        rect: String,

        /// Width of the rendered page the rect was measured on
        #[arg(long)]
        rendered_width: f64,

        /// Height of the rendered page the rect was measured on
        #[arg(long)]
        rendered_height: f64,

        /// Text of a note
        #[arg(long)]
        contents: Option<String>,

        /// Colour as RRGGBB
        #[arg(long)]
        color: Option<String>,

        /// 0.0 to 1.0
        #[arg(long)]
        opacity: Option<f64>,
    },

    /// Export a stored document with its form values and annotations applied
    Export {
        /// Document id
        #[arg(long)]
        id: String,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Export options JSON file
        #[arg(long)]
        options: Option<PathBuf>,

        /// Flatten the form
        #[arg(long)]
        flatten: bool,

        /// Write an overlay preview PNG of this page
        #[arg(long, requires = "preview")]
        preview_page: Option<usize>,

        /// Preview PNG file
        #[arg(long, requires = "preview_page")]
        preview: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Highlight,
    Text,
}

impl From<KindArg> for AnnotationKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Highlight => Self::Highlight,
            KindArg::Text => Self::Text,
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid NAME=VALUE: no `=` found in `{s}`"))?;
    Ok((key.to_string(), value.to_string()))
}

fn parse_rect(s: &str) -> Result<Rect> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid rect `{s}`"))?;
    match parts.as_slice() {
        [x0, y0, x1, y1] => Ok(Rect::new(*x0, *y0, *x1, *y1).normalized()),
        _ => bail!("Rect needs four numbers, got `{s}`"),
    }
}

async fn read_pdf(path: &Path) -> Result<PdfHandle> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(PdfHandle::load(&bytes)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let store = Arc::new(FileStore::new(&cli.store));

    match cli.command {
        Commands::Import { input, id } => {
            let bytes = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            pdf_overlay::pdf::verify_header(&bytes)?;
            let id = id.map(DocumentId::new).unwrap_or_else(DocumentId::generate);
            store.insert(&id, &bytes).await?;
            println!("Imported {} → {}", input.display(), id);
        }

        Commands::Fields { input, json } => {
            let mut pdf = read_pdf(&input).await?;
            let fields = pdf.form()?.fields();
            if json {
                println!("{}", serde_json::to_string_pretty(&fields)?);
            } else {
                for field in &fields {
                    println!(
                        "{:<32} {:<10} {}{}",
                        field.name,
                        field.kind.to_string(),
                        field.value.as_deref().unwrap_or("-"),
                        if field.read_only { " (read-only)" } else { "" }
                    );
                    if !field.options.is_empty() {
                        println!("{:<32} options: {}", "", field.options.join(", "));
                    }
                }
                println!("{} fields", fields.len());
            }
        }

        Commands::Fill {
            input,
            output,
            values,
            flatten,
        } => {
            let values: FieldValueMap = values.into_iter().collect();
            let mut pdf = read_pdf(&input).await?;
            let report = {
                let mut form = pdf.form()?;
                fill(&mut form, &values)
            };
            for name in &report.missing {
                eprintln!("No field named {name}");
            }
            for (name, reason) in &report.errors {
                eprintln!("{name}: {reason}");
            }
            if report.nothing_filled() {
                bail!("None of the {} values matched a field", report.attempted_count);
            }
            if flatten {
                if let Some(reason) = &report.appearance_failure {
                    bail!("Refusing to flatten: {reason}");
                }
                pdf.flatten_form()?;
            }
            tokio::fs::write(&output, pdf.save()?).await?;
            println!(
                "Filled {}/{} fields → {}",
                report.filled_count,
                report.attempted_count,
                output.display()
            );
        }

        Commands::Values { id, values, from } => {
            let mut merged = match from {
                Some(path) => {
                    let json = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    serde_json::from_str::<FieldValueMap>(&json)
                        .with_context(|| format!("{} is not a JSON object of strings", path.display()))?
                }
                None => FieldValueMap::new(),
            };
            merged.extend(values);
            let id = DocumentId::new(id);
            let count = merged.len();
            record_form_values(store.as_ref(), &id, merged).await?;
            println!("Recorded {count} values for {id}");
        }

        Commands::Annotate {
            id,
            page,
            kind,
            rect,
            rendered_width,
            rendered_height,
            contents,
            color,
            opacity,
        } => {
            let id = DocumentId::new(id);
            let record = store.get(&id).await?;
            let pdf = PdfHandle::load(&record.original)?;
            let page_handle = pdf.page(page)?;
            let ctx = CoordinateSpaceContext::capture(
                rendered_width,
                rendered_height,
                page_handle.width(),
                page_handle.height(),
                1.0,
                1.0,
            );

            let kind = AnnotationKind::from(kind);
            let mut style = match kind {
                AnnotationKind::Highlight => StrokeStyle {
                    color: Color::YELLOW,
                    opacity: 0.4,
                    ..StrokeStyle::default()
                },
                _ => StrokeStyle::default(),
            };
            if let Some(hex) = color {
                style.color = Color::from_hex(&hex).with_context(|| format!("Invalid colour `{hex}`"))?;
            }
            if let Some(opacity) = opacity {
                style.opacity = opacity.clamp(0.0, 1.0);
            }

            let mut annotation = AnnotationRecord::new(page, kind, Geometry::from_rect(parse_rect(&rect)?))
                .with_style(style);
            if let Some(contents) = contents {
                annotation = annotation.with_contents(contents);
            }
            let annotation = annotation.with_context(ctx, &BoundsPolicy::default())?;
            let annotation_id = annotation.id.clone();

            let mut annotations = record.annotations;
            annotations.push(annotation);
            store.put_annotations(&id, annotations).await?;
            store
                .put_export_metadata(&id, record.export_metadata.bumped())
                .await?;
            println!("Added annotation {annotation_id} to {id}");
        }

        Commands::Export {
            id,
            output,
            options,
            flatten,
            preview_page,
            preview,
        } => {
            let mut export_options = match options {
                Some(path) => ExportOptions::load(&path).await?,
                None => ExportOptions::default(),
            };
            export_options.flatten |= flatten;
            export_options.preview_page = preview_page;

            let pipeline = ExportPipeline::new(store, export_options);
            let artifact = pipeline.export(&DocumentId::new(id)).await?;

            tokio::fs::write(&output, &artifact.bytes).await?;
            if let (Some(path), Some(png)) = (preview, &artifact.preview_png) {
                tokio::fs::write(&path, png).await?;
                println!("Preview → {}", path.display());
            }

            for skipped in &artifact.report.skipped_annotations {
                eprintln!("Skipped annotation {}: {}", skipped.id, skipped.reason);
            }
            for warning in &artifact.report.warnings {
                eprintln!("Warning: {warning}");
            }
            println!("{}", artifact.report.summary());
            println!(
                "Exported version {} → {}",
                artifact.metadata.version,
                output.display()
            );
        }
    }

    Ok(())
}
