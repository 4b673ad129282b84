//! Workbook rendering for a finished `MonthlyTable`.
//!
//! Layout of the single sheet:
//!
//! ```text
//! | Data       | Hora Leitura | Leitura (m³ acum.) | Vazão Registrada | Outorga | Situação  |
//! |------------|--------------|--------------------|------------------|---------|-----------|
//! | 01/03/2024 | 23:59        | 100                | 0                | 200     | Regular   |
//! | 02/03/2024 | 23:59        | 250                | 150              | 200     | Irregular |
//! | TOTAL MENSAL |            |                    | 150              | 400     |           |
//! ```
//!
//! plus a column chart of daily flow against the permitted flow anchored at H2.

use rust_xlsxwriter::{
    Chart, ChartType, ConditionalFormatCell, ConditionalFormatCellRule, Format, FormatAlign,
    FormatBorder, Workbook, Worksheet,
};
use tracing::{info, instrument};

use crate::aggregate::{MonthlyTable, Status};
use crate::config::ThresholdRule;
use crate::error::Result;

pub const SHEET_NAME: &str = "Resumo Mensal";
pub const REPORT_FILE_NAME: &str = "resumo_situacao_mensal.xlsx";
pub const REPORT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const COL_DATE: u16 = 0;
const COL_HOUR: u16 = 1;
const COL_READING: u16 = 2;
const COL_DAILY: u16 = 3;
const COL_PERMITTED: u16 = 4;
const COL_STATUS: u16 = 5;

const COLUMN_WIDTHS: [f64; 6] = [18.0, 18.0, 35.0, 20.0, 30.0, 15.0];

// H2
const CHART_ROW: u32 = 1;
const CHART_COL: u16 = 7;
const CHART_SCALE: f64 = 1.5;

/// Column headers for a given rule; the permitted-flow wording follows
/// whether the licence is a floor or a cap.
pub fn headers(rule: ThresholdRule) -> [&'static str; 6] {
    [
        "Data",
        "Hora Leitura",
        "Leitura do medidor em m³ acumulado",
        "Vazão Registrada (m³/dia)",
        match rule {
            ThresholdRule::IrregularBelow => "Vazão Mínima para Jusante - Outorga (m³/dia)",
            ThresholdRule::IrregularAbove => "Vazão Máxima Outorgada (m³/dia)",
        },
        "Situação",
    ]
}

pub fn chart_title(rule: ThresholdRule) -> &'static str {
    match rule {
        ThresholdRule::IrregularBelow => "Vazão registrada x Vazão Mínima para Jusante - Outorga",
        ThresholdRule::IrregularAbove => "Vazão registrada x Vazão Máxima Outorgada",
    }
}

struct ReportFormats {
    header: Format,
    integer: Format,
    text: Format,
    regular: Format,
    irregular: Format,
}

impl ReportFormats {
    fn new() -> Self {
        let centered = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);

        Self {
            header: Format::new()
                .set_bold()
                .set_text_wrap()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_background_color(0xDCE6F1)
                .set_border(FormatBorder::Thin),
            integer: centered.clone().set_num_format("#,##0"),
            text: centered.clone().set_num_format("@"),
            regular: centered
                .clone()
                .set_background_color(0xC6EFCE)
                .set_font_color(0x006100),
            irregular: centered
                .set_background_color(0xFFC7CE)
                .set_font_color(0x9C0006),
        }
    }
}

/// Render `table` to XLSX bytes. Either the whole workbook is produced or an
/// error is returned.
#[instrument(level = "info", skip(table), fields(days = table.len()))]
pub fn render(table: &MonthlyTable) -> Result<Vec<u8>> {
    let formats = ReportFormats::new();
    let mut workbook = Workbook::new();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;
        write_table(sheet, table, &formats)?;
        add_status_colouring(sheet, table, &formats)?;
        insert_chart(sheet, table)?;
    }

    let bytes = workbook.save_to_buffer()?;
    info!(bytes = bytes.len(), "workbook rendered");
    Ok(bytes)
}

fn write_table(sheet: &mut Worksheet, table: &MonthlyTable, formats: &ReportFormats) -> Result<()> {
    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        let col = col as u16;
        let format = match col {
            COL_READING | COL_DAILY | COL_PERMITTED => &formats.integer,
            _ => &formats.text,
        };
        sheet.set_column_width(col, *width)?;
        sheet.set_column_format(col, format)?;
    }

    for (col, header) in headers(table.rule).iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &formats.header)?;
    }

    let mut row = 1u32;
    for entry in &table.entries {
        sheet.write_string_with_format(row, COL_DATE, entry.display_date(), &formats.text)?;
        sheet.write_string_with_format(row, COL_HOUR, &entry.hour_final, &formats.text)?;
        sheet.write_number_with_format(row, COL_READING, entry.reading_final, &formats.integer)?;
        sheet.write_number_with_format(row, COL_DAILY, entry.daily_flow, &formats.integer)?;
        sheet.write_number_with_format(row, COL_PERMITTED, entry.permitted_flow, &formats.integer)?;
        sheet.write_string_with_format(row, COL_STATUS, entry.status.as_str(), &formats.text)?;
        row += 1;
    }

    let totals = &table.totals;
    sheet.write_string_with_format(row, COL_DATE, totals.label, &formats.text)?;
    sheet.write_number_with_format(row, COL_DAILY, totals.daily_flow, &formats.integer)?;
    sheet.write_number_with_format(row, COL_PERMITTED, totals.permitted_flow, &formats.integer)?;

    Ok(())
}

/// Green/red fill on the status cells of the data rows. The totals row is
/// outside the range.
fn add_status_colouring(
    sheet: &mut Worksheet,
    table: &MonthlyTable,
    formats: &ReportFormats,
) -> Result<()> {
    let last_row = table.len() as u32;

    for (status, format) in [
        (Status::Regular, &formats.regular),
        (Status::Irregular, &formats.irregular),
    ] {
        let quoted = format!("\"{}\"", status.as_str());
        let rule = ConditionalFormatCell::new()
            .set_rule(ConditionalFormatCellRule::EqualTo(quoted.as_str()))
            .set_format(format);
        sheet.add_conditional_format(1, COL_STATUS, last_row, COL_STATUS, &rule)?;
    }
    Ok(())
}

fn insert_chart(sheet: &mut Worksheet, table: &MonthlyTable) -> Result<()> {
    let last_row = table.len() as u32;
    let mut chart = Chart::new(ChartType::Column);

    chart
        .add_series()
        .set_name((SHEET_NAME, 0, COL_DAILY))
        .set_categories((SHEET_NAME, 1, COL_DATE, last_row, COL_DATE))
        .set_values((SHEET_NAME, 1, COL_DAILY, last_row, COL_DAILY));
    chart
        .add_series()
        .set_name((SHEET_NAME, 0, COL_PERMITTED))
        .set_categories((SHEET_NAME, 1, COL_DATE, last_row, COL_DATE))
        .set_values((SHEET_NAME, 1, COL_PERMITTED, last_row, COL_PERMITTED));

    chart.title().set_name(chart_title(table.rule));
    chart.x_axis().set_name("Dia");
    chart.y_axis().set_name("Volume (m³)");
    chart.set_scale_width(CHART_SCALE).set_scale_height(CHART_SCALE);

    sheet.insert_chart(CHART_ROW, CHART_COL, &chart)?;
    Ok(())
}
