//! cloudsheets CLI - read and write cloud spreadsheets and drive folders

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cloudsheets::{AuthOption, ClientConfig, SheetSelector, Toolbox};
use cloudsheets_core::schema::SheetProperties;
use cloudsheets_core::{CellBuilder, CellValue, Color, RangeAddress};

/// Printed when a requested range has no data in the response
const RANGE_NOT_FOUND: &str = "Sheet name or range not found.";

#[derive(Parser)]
#[command(name = "cloudsheets")]
#[command(author, version, about = "Cloud spreadsheet and drive tool")]
struct Cli {
    /// Bearer access token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Directory holding token.json and client-secret.json
    #[arg(long, global = true)]
    oauth_dir: Option<PathBuf>,

    /// Attempts per remote call
    #[arg(long, global = true, default_value = "5")]
    retry_count: u32,

    /// Retry immediately instead of backing off exponentially
    #[arg(long, global = true)]
    no_backoff: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the formatted values of one or more ranges
    Values {
        spreadsheet_id: String,

        /// A1 ranges; every sheet when omitted
        ranges: Vec<String>,
    },

    /// Print cell values with their size and visibility
    Cells {
        spreadsheet_id: String,

        /// A1 ranges; every sheet when omitted
        ranges: Vec<String>,
    },

    /// Write rows of values starting at the first cell of a range
    SetValues {
        spreadsheet_id: String,

        /// Start cell, e.g. "Sheet1!B2"
        range: String,

        /// Comma separated values of one row (repeatable)
        #[arg(short, long = "row")]
        rows: Vec<String>,

        /// Keep every value as text instead of detecting numbers and booleans
        #[arg(long)]
        raw: bool,
    },

    /// Change the properties of one sheet
    UpdateProperties {
        spreadsheet_id: String,

        /// Sheet title
        #[arg(long, conflicts_with = "sheet_id", required_unless_present = "sheet_id")]
        sheet: Option<String>,

        /// Sheet id
        #[arg(long)]
        sheet_id: Option<i64>,

        /// New sheet title
        #[arg(long)]
        title: Option<String>,

        /// Tab color as #rrggbb
        #[arg(long)]
        tab_color: Option<String>,

        /// Hide or show the sheet
        #[arg(long)]
        hidden: Option<bool>,

        /// New position of the sheet
        #[arg(long)]
        index: Option<u32>,
    },

    /// Write a bold, colored header row followed by data rows
    WriteTable {
        spreadsheet_id: String,

        /// Target sheet title
        sheet: String,

        /// Comma separated header cells
        #[arg(long)]
        header: String,

        /// Comma separated values of one data row (repeatable)
        #[arg(short, long = "row")]
        rows: Vec<String>,

        /// Top-left cell of the table
        #[arg(long, default_value = "A1")]
        start: String,

        /// Header background as #rrggbb
        #[arg(long, default_value = "#ff00ff")]
        header_color: String,
    },

    /// Print the id of a sheet
    SheetId {
        spreadsheet_id: String,
        sheet: String,
    },

    /// Rename a spreadsheet
    SetTitle {
        spreadsheet_id: String,
        title: String,
    },

    /// Drive operations
    Drive {
        #[command(subcommand)]
        command: DriveCommand,
    },
}

#[derive(Subcommand)]
enum DriveCommand {
    /// List the children of a folder
    List { folder_id: String },

    /// Upload a local file
    Upload {
        file: PathBuf,

        /// Destination folder id (default: root)
        #[arg(long)]
        folder: Option<String>,

        /// Mime type of the content
        #[arg(long, default_value = "application/octet-stream")]
        mime_type: String,
    },

    /// Create a chain of nested folders, e.g. "reports/2024/q1"
    Mkdir {
        path: String,

        /// Parent folder id (default: root)
        #[arg(long)]
        folder: Option<String>,
    },

    /// Download a file
    Download { file_id: String, output: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let auth = AuthOption::from_parts(cli.token, cli.oauth_dir)?;
    let mut config = ClientConfig::default();
    config.retry.retry_count = cli.retry_count;
    config.retry.use_exponential_backoff = !cli.no_backoff;
    let toolbox = Toolbox::new(auth, config).context("Failed to set up the client")?;

    match cli.command {
        Commands::Values {
            spreadsheet_id,
            ranges,
        } => print_values(&toolbox, &spreadsheet_id, &ranges).await,
        Commands::Cells {
            spreadsheet_id,
            ranges,
        } => print_cells(&toolbox, &spreadsheet_id, &ranges).await,
        Commands::SetValues {
            spreadsheet_id,
            range,
            rows,
            raw,
        } => {
            let rows = rows.iter().map(|row| parse_row(row, raw)).collect();
            toolbox
                .spreadsheet
                .set_sheet_values(&spreadsheet_id, &range, rows)
                .await
                .with_context(|| format!("Failed to write '{}'", range))?;
            eprintln!("Updated {}", range);
            Ok(())
        }
        Commands::UpdateProperties {
            spreadsheet_id,
            sheet,
            sheet_id,
            title,
            tab_color,
            hidden,
            index,
        } => {
            let selector = match (sheet_id, sheet) {
                (Some(id), _) => SheetSelector::Id(id),
                (None, Some(name)) => SheetSelector::Name(name),
                (None, None) => bail!("Either --sheet or --sheet-id is required"),
            };
            let tab_color = tab_color
                .as_deref()
                .map(Color::from_hex)
                .transpose()?
                .map(Into::into);
            let properties = SheetProperties {
                title,
                tab_color,
                hidden,
                index,
                ..Default::default()
            };

            toolbox
                .spreadsheet
                .update_sheet_properties(&spreadsheet_id, vec![(selector, properties)])
                .await
                .context("Failed to update sheet properties")?;
            eprintln!("Updated sheet properties");
            Ok(())
        }
        Commands::WriteTable {
            spreadsheet_id,
            sheet,
            header,
            rows,
            start,
            header_color,
        } => {
            let anchor = table_anchor(&sheet, &start)?;
            let header_row = header
                .split(',')
                .map(|cell| {
                    CellBuilder::new(cell.trim())
                        .bold(true)
                        .background_color(&header_color)
                })
                .collect::<cloudsheets_core::Result<Vec<_>>>()?;

            let mut table = vec![header_row];
            table.extend(rows.iter().map(|row| parse_row(row, false)));
            let row_count = table.len();

            toolbox
                .spreadsheet
                .set_sheet_values(&spreadsheet_id, &anchor, table)
                .await
                .with_context(|| format!("Failed to write table at '{}'", anchor))?;
            eprintln!("Wrote {} rows at {}", row_count, anchor);
            Ok(())
        }
        Commands::SheetId {
            spreadsheet_id,
            sheet,
        } => {
            let id = toolbox
                .spreadsheet
                .get_sheet_id_by_name(&spreadsheet_id, &sheet)
                .await?;
            println!("{}", id);
            Ok(())
        }
        Commands::SetTitle {
            spreadsheet_id,
            title,
        } => {
            toolbox
                .spreadsheet
                .update_spreadsheet_title(&spreadsheet_id, &title)
                .await
                .context("Failed to rename spreadsheet")?;
            eprintln!("Renamed spreadsheet to '{}'", title);
            Ok(())
        }
        Commands::Drive { command } => run_drive(&toolbox, command).await,
    }
}

async fn print_values(toolbox: &Toolbox, spreadsheet_id: &str, ranges: &[String]) -> Result<()> {
    let values = toolbox
        .spreadsheet
        .get_sheet_values(spreadsheet_id, ranges)
        .await
        .context("Failed to read values")?;

    for key in output_keys(ranges, values.keys())? {
        println!("== {}", key);
        for row in &values[&key] {
            println!("{}", row.join("\t"));
        }
    }

    Ok(())
}

async fn print_cells(toolbox: &Toolbox, spreadsheet_id: &str, ranges: &[String]) -> Result<()> {
    let cells = toolbox
        .spreadsheet
        .get_sheet_cells(spreadsheet_id, ranges)
        .await
        .context("Failed to read cells")?;

    for key in output_keys(ranges, cells.keys())? {
        println!("== {}", key);
        for row in &cells[&key] {
            let line: Vec<String> = row
                .iter()
                .map(|snapshot| {
                    let text = snapshot.cell.formatted_value.as_deref().unwrap_or_default();
                    let hidden = if snapshot.visible { "" } else { " hidden" };
                    format!("{} [{}x{}{}]", text, snapshot.width, snapshot.height, hidden)
                })
                .collect();
            println!("{}", line.join("\t"));
        }
    }

    Ok(())
}

/// Keys to print: the requested ranges in order, or every key sorted when
/// nothing was requested. Fails if a requested range is missing.
fn output_keys<'a>(
    ranges: &[String],
    found: impl Iterator<Item = &'a String>,
) -> Result<Vec<String>> {
    let found: Vec<&String> = found.collect();
    let requested: Vec<&String> = ranges.iter().filter(|r| !r.trim().is_empty()).collect();

    if requested.is_empty() {
        let mut keys: Vec<String> = found.into_iter().cloned().collect();
        keys.sort();
        return Ok(keys);
    }

    if requested.iter().any(|r| !found.contains(r)) {
        bail!(RANGE_NOT_FOUND);
    }
    Ok(requested.into_iter().cloned().collect())
}

async fn run_drive(toolbox: &Toolbox, command: DriveCommand) -> Result<()> {
    match command {
        DriveCommand::List { folder_id } => {
            let items = toolbox
                .drive
                .list(&folder_id)
                .await
                .with_context(|| format!("Failed to list folder '{}'", folder_id))?;
            for item in items {
                let marker = if item.is_folder() { "d" } else { "-" };
                println!("{}\t{}\t{}", marker, item.id, item.name);
            }
        }
        DriveCommand::Upload {
            file,
            folder,
            mime_type,
        } => {
            let item = toolbox
                .drive
                .upload(folder.as_deref(), &file, &mime_type)
                .await
                .with_context(|| format!("Failed to upload '{}'", file.display()))?;
            println!("{}\t{}", item.id, item.name);
        }
        DriveCommand::Mkdir { path, folder } => {
            match toolbox
                .drive
                .mkdir(folder.as_deref(), &path)
                .await
                .with_context(|| format!("Failed to create '{}'", path))?
            {
                Some(item) => println!("{}\t{}", item.id, item.name),
                None => eprintln!("Nothing to create"),
            }
        }
        DriveCommand::Download { file_id, output } => {
            let written = toolbox
                .drive
                .download(&file_id, &output)
                .await
                .with_context(|| format!("Failed to download '{}'", file_id))?;
            eprintln!("Wrote {} bytes to '{}'", written, output.display());
        }
    }

    Ok(())
}

/// A1 string of `start` on `sheet`, quoting the sheet name if needed.
fn table_anchor(sheet: &str, start: &str) -> Result<String> {
    // A lone cell reference reads as a sheet name, so parse it as a one-cell range
    let cell = RangeAddress::parse(&format!("{0}:{0}", start))
        .with_context(|| format!("Invalid start cell '{}'", start))?;
    if !cell.sheet_name().is_empty() {
        bail!("Start cell '{}' must not name a sheet", start);
    }

    let (column, row) = (cell.start_column(), cell.start_row());
    Ok(RangeAddress::new(sheet, column, row, Some(column), Some(row)).to_a1_string())
}

fn parse_row(row: &str, raw: bool) -> Vec<CellBuilder> {
    row.split(',')
        .map(|cell| CellBuilder::new(parse_cell(cell.trim(), raw)))
        .collect()
}

fn parse_cell(text: &str, raw: bool) -> CellValue {
    if raw {
        return CellValue::from(text);
    }

    if text.eq_ignore_ascii_case("true") {
        CellValue::Bool(true)
    } else if text.eq_ignore_ascii_case("false") {
        CellValue::Bool(false)
    } else {
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::from(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("42", false), CellValue::Number(42.0));
        assert_eq!(parse_cell("TRUE", false), CellValue::Bool(true));
        assert_eq!(parse_cell("apples", false), CellValue::from("apples"));
        assert_eq!(parse_cell("inf", false), CellValue::from("inf"));
        assert_eq!(parse_cell("42", true), CellValue::from("42"));
    }

    #[test]
    fn test_table_anchor() {
        assert_eq!(table_anchor("Data", "B2").unwrap(), "Data!B2");
        assert_eq!(table_anchor("My Data", "A1").unwrap(), "'My Data'!A1");
        assert!(table_anchor("Data", "Other!A1").is_err());
    }

    #[test]
    fn test_output_keys() {
        let found = vec!["Sheet1".to_string(), "Data".to_string()];
        assert_eq!(output_keys(&[], found.iter()).unwrap(), vec!["Data", "Sheet1"]);

        let requested = vec!["Data".to_string()];
        assert_eq!(output_keys(&requested, found.iter()).unwrap(), vec!["Data"]);

        let missing = vec!["Nope!A1".to_string()];
        let err = output_keys(&missing, found.iter()).unwrap_err();
        assert_eq!(err.to_string(), RANGE_NOT_FOUND);
    }
}
