//! Command-line interface for rngschema

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use rngschema::{
    check_schema, serialize_schema, validate_document, Compiler, Document, Limits, XmlSchema,
};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "rngschema")]
#[command(author, version, about = "RELAX NG schema compiler and content validator", long_about = None)]
struct Cli {
    /// Use strict resource limits
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a grammar into the compact JSON format
    Compile {
        /// Entry grammar file
        #[arg(value_name = "GRAMMAR")]
        grammar: PathBuf,

        /// Directories searched for the grammar and its includes
        #[arg(short = 'I', long = "search-dir", value_name = "DIR")]
        search_dirs: Vec<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report schema issues on stderr
        #[arg(long)]
        issues: bool,
    },

    /// Validate an XML document
    Validate {
        /// Grammar (.rng) or compiled schema (.json)
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Directories searched for the grammar and its includes
        #[arg(short = 'I', long = "search-dir", value_name = "DIR")]
        search_dirs: Vec<PathBuf>,

        /// Path to the XML file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the content model of every element
    Inspect {
        /// Grammar (.rng) or compiled schema (.json)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Directories searched for the grammar and its includes
        #[arg(short = 'I', long = "search-dir", value_name = "DIR")]
        search_dirs: Vec<PathBuf>,

        /// Show only this element
        #[arg(short, long)]
        element: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List unreachable and undeclared elements
    Check {
        /// Grammar (.rng) or compiled schema (.json)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Directories searched for the grammar and its includes
        #[arg(short = 'I', long = "search-dir", value_name = "DIR")]
        search_dirs: Vec<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let limits = if cli.strict {
        Limits::strict()
    } else {
        Limits::default()
    };

    let result = match cli.command {
        Commands::Compile {
            grammar,
            search_dirs,
            output,
            issues,
        } => cmd_compile(&limits, grammar, search_dirs, output, issues),
        Commands::Validate {
            schema,
            search_dirs,
            file,
        } => cmd_validate(&limits, schema, search_dirs, file),
        Commands::Inspect {
            schema,
            search_dirs,
            element,
            json,
        } => cmd_inspect(&limits, schema, search_dirs, element, json),
        Commands::Check {
            schema,
            search_dirs,
        } => cmd_check(&limits, schema, search_dirs),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Compile a grammar, or read a schema compiled earlier
#[cfg(feature = "cli")]
fn load_schema(
    limits: &Limits,
    path: &Path,
    search_dirs: Vec<PathBuf>,
) -> Result<XmlSchema, Box<dyn std::error::Error>> {
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let data = fs::read_to_string(path)?;
        Ok(rngschema::serialization::deserialize_schema_with_limits(
            &data, limits,
        )?)
    } else {
        let compiler = Compiler::new(search_dirs).with_limits(limits.clone());
        Ok(compiler.compile(path)?)
    }
}

#[cfg(feature = "cli")]
fn cmd_compile(
    limits: &Limits,
    grammar: PathBuf,
    search_dirs: Vec<PathBuf>,
    output: Option<PathBuf>,
    issues: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(limits, &grammar, search_dirs)?;

    if issues {
        for issue in check_schema(&schema) {
            eprintln!("warning: {}", issue);
        }
    }

    let data = serialize_schema(&schema)?;
    match output {
        Some(path) => {
            fs::write(&path, data)?;
            println!(
                "Compiled {} elements into {}",
                schema.len(),
                path.display()
            );
        }
        None => println!("{}", data),
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_validate(
    limits: &Limits,
    schema_path: PathBuf,
    search_dirs: Vec<PathBuf>,
    file: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(limits, &schema_path, search_dirs)?;

    let xml_content = fs::read(&file)?;
    let doc = Document::parse_with_limits(&xml_content, limits)?;

    let result = validate_document(&schema, &doc)?;

    if result.ok {
        println!("✓ Document is valid");
        Ok(())
    } else {
        println!("✗ Document is invalid");
        println!();
        println!("Errors:");
        for error in &result.errors {
            println!("  - {}", error);
        }
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    limits: &Limits,
    schema_path: PathBuf,
    search_dirs: Vec<PathBuf>,
    element: Option<String>,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use serde_json::{json, Value};

    let schema = load_schema(limits, &schema_path, search_dirs)?;

    let selected: Vec<_> = match &element {
        Some(name) => vec![schema
            .element_schema(name)
            .ok_or_else(|| format!("Element <{}> not found in schema", name))?],
        None => schema.element_schemas().collect(),
    };

    if json_output {
        let elements: Vec<Value> = selected
            .iter()
            .map(|es| {
                json!({
                    "name": es.name,
                    "type": es.element_type.as_str(),
                    "attributes": es.attributes.iter().collect::<Vec<_>>(),
                    "content": es.expr.to_string(),
                })
            })
            .collect();
        let output = json!({
            "start": schema.start_element(),
            "elements": elements,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if element.is_none() {
            println!("rngschema v{}", rngschema::VERSION);
            println!();
            println!("Start element: {}", schema.start_element());
            println!("Elements: {}", schema.len());
            println!();
        }
        for es in selected {
            println!("{}", es.print_structure());
            println!("  type: {}", es.element_type);
            if !es.attributes.is_empty() {
                let attrs: Vec<&str> = es.attributes.iter().map(String::as_str).collect();
                println!("  attributes: {}", attrs.join(", "));
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_check(
    limits: &Limits,
    schema_path: PathBuf,
    search_dirs: Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(limits, &schema_path, search_dirs)?;
    let issues = check_schema(&schema);

    if issues.is_empty() {
        println!("✓ No issues found");
    } else {
        println!("{} issue(s):", issues.len());
        for issue in &issues {
            println!("  - {}", issue);
        }
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
