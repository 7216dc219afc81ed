//! heapdb - inspect and edit heap files from the command line

use anyhow::{Context, Result, bail};
use clap::{Parser as ClapParser, Subcommand};
use heapdb::access::{FieldType, HeapFile, Tuple, TupleCursor, TupleDesc, TupleFile, Value};
use heapdb::config::{DEFAULT_BUFFER_POOL_FRAMES, StorageConfig};
use heapdb::storage::page::{HeapPage, slot_capacity};
use heapdb::storage::{BufferPoolManager, DEFAULT_PAGE_SIZE};
use log::info;
use std::path::PathBuf;

/// heapdb - a slotted-page heap file tool
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Page size in bytes for new files; existing files keep the size they were created with
    #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Number of buffer pool frames
    #[arg(short, long, default_value_t = DEFAULT_BUFFER_POOL_FRAMES)]
    frames: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty heap file with the given fields (`name:int`, `name:double`, `name:char`)
    Create {
        file: PathBuf,
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Insert one row; values are given in schema order
    Insert { file: PathBuf, values: Vec<String> },
    /// Delete the row at a page and slot
    Delete {
        file: PathBuf,
        page: usize,
        slot: usize,
    },
    /// Print every row with its position
    Scan { file: PathBuf },
    /// Print the schema and page usage
    Info { file: PathBuf },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = StorageConfig::default()
        .with_page_size(args.page_size)
        .with_buffer_pool_frames(args.frames);
    config.validate().context("Invalid storage configuration")?;
    let buffer_pool = BufferPoolManager::new(config.buffer_pool_frames);

    match args.command {
        Command::Create { file, fields } => {
            let td = parse_schema(&fields)?;
            let heap = HeapFile::create(&file, td, buffer_pool.clone(), &config)
                .with_context(|| format!("Failed to create {}", file.display()))?;
            info!("Created {}", heap.name());
            println!("Created {} ({} byte rows)", file.display(), heap.tuple_desc().length());
        }
        Command::Insert { file, values } => {
            let heap = open(&file, &buffer_pool, &config)?;
            let tuple = parse_tuple(heap.tuple_desc(), &values)?;
            let cursor = heap.insert_tuple(&tuple).context("Failed to insert row")?;
            println!("Inserted at {}", cursor);
        }
        Command::Delete { file, page, slot } => {
            let heap = open(&file, &buffer_pool, &config)?;
            let cursor = TupleCursor::new(page, slot);
            heap.delete_tuple(cursor)
                .with_context(|| format!("Failed to delete {}", cursor))?;
            println!("Deleted {}", cursor);
        }
        Command::Scan { file } => {
            let heap = open(&file, &buffer_pool, &config)?;
            println!("{}", heap.tuple_desc().names().join(" | "));
            let mut rows = 0;
            for item in &heap {
                let (cursor, tuple) = item?;
                println!("{} {}", cursor, tuple);
                rows += 1;
            }
            println!("{} rows", rows);
        }
        Command::Info { file } => {
            let heap = open(&file, &buffer_pool, &config)?;
            print_info(&heap, &buffer_pool)?;
        }
    }

    buffer_pool.flush_all().context("Failed to flush pages")?;
    Ok(())
}

fn open(file: &PathBuf, buffer_pool: &BufferPoolManager, config: &StorageConfig) -> Result<HeapFile> {
    HeapFile::open_existing(file, buffer_pool.clone(), config)
        .with_context(|| format!("Failed to open {}", file.display()))
}

fn parse_schema(fields: &[String]) -> Result<TupleDesc> {
    let mut types = Vec::with_capacity(fields.len());
    let mut names = Vec::with_capacity(fields.len());
    for field in fields {
        let (name, ty) = field
            .split_once(':')
            .with_context(|| format!("Field '{}' is not of the form name:type", field))?;
        let field_type = match ty.to_ascii_lowercase().as_str() {
            "int" => FieldType::Int,
            "double" => FieldType::Double,
            "char" => FieldType::Char,
            other => bail!("Unknown field type '{}'", other),
        };
        types.push(field_type);
        names.push(name.to_string());
    }
    Ok(TupleDesc::new(types, names)?)
}

fn parse_tuple(td: &TupleDesc, values: &[String]) -> Result<Tuple> {
    if values.len() != td.len() {
        bail!("Expected {} values, got {}", td.len(), values.len());
    }

    let mut parsed = Vec::with_capacity(values.len());
    for (i, raw) in values.iter().enumerate() {
        let value = match td.field_type(i)? {
            FieldType::Int => Value::Int(
                raw.parse()
                    .with_context(|| format!("'{}' is not an integer", raw))?,
            ),
            FieldType::Double => Value::Double(
                raw.parse()
                    .with_context(|| format!("'{}' is not a number", raw))?,
            ),
            FieldType::Char => Value::Char(raw.clone()),
        };
        parsed.push(value);
    }
    Ok(Tuple::new(parsed))
}

fn print_info(heap: &HeapFile, buffer_pool: &BufferPoolManager) -> Result<()> {
    let td = heap.tuple_desc();
    println!("File:      {}", heap.name());
    println!("Fields:");
    for (i, (ty, name)) in td.types().iter().zip(td.names()).enumerate() {
        println!("  {:>3} {:<20} {:<10} offset {}", i, name, ty, td.offset_of(i)?);
    }
    println!("Row size:  {} bytes", td.length());
    println!(
        "Capacity:  {} rows per {} byte page",
        slot_capacity(heap.file().page_size(), td.length()),
        heap.file().page_size()
    );
    println!("Pages:     {}", heap.num_pages());

    let mut total = 0;
    for index in 0..heap.num_pages() {
        let count = buffer_pool.with_page(&heap.page_id(index), |buf| {
            HeapPage::new(buf, td).map(|page| page.count())
        })??;
        println!("  page {:>5}: {} rows", index, count);
        total += count;
    }
    println!("Rows:      {}", total);

    Ok(())
}
