//! Mapping between sheet rows and `ClientRecord`s.
//!
//! Fixed 16-column layout (A..P):
//! id, name, phone, service, email, password, profile, pin, -, expiration,
//! -, -, -, -, purchase price, sale price.

use chrono::NaiveDate;
use subclaw_core::types::ClientRecord;

pub const COL_ID: usize = 0;
pub const COL_NAME: usize = 1;
pub const COL_PHONE: usize = 2;
pub const COL_SERVICE: usize = 3;
pub const COL_EMAIL: usize = 4;
pub const COL_PASSWORD: usize = 5;
pub const COL_PROFILE: usize = 6;
pub const COL_PIN: usize = 7;
pub const COL_EXPIRATION: usize = 9;
pub const COL_PURCHASE_PRICE: usize = 14;
pub const COL_SALE_PRICE: usize = 15;
pub const COLUMN_COUNT: usize = 16;

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

/// Whether every cell of the row is blank.
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Positional mapping of one sheet row. Missing trailing cells read as blank.
pub fn record_from_row(row: &[String]) -> ClientRecord {
    let pin = cell(row, COL_PIN);
    ClientRecord {
        id: cell(row, COL_ID).to_string(),
        name: cell(row, COL_NAME).to_string(),
        phone: cell(row, COL_PHONE).to_string(),
        service: cell(row, COL_SERVICE).to_string(),
        email: cell(row, COL_EMAIL).to_string(),
        password: cell(row, COL_PASSWORD).to_string(),
        profile: cell(row, COL_PROFILE).to_string(),
        pin: (!pin.is_empty()).then(|| pin.to_string()),
        expiration_date: parse_sheet_date(cell(row, COL_EXPIRATION)),
        purchase_price_dop: parse_price(cell(row, COL_PURCHASE_PRICE)),
        sale_price_dop: parse_price(cell(row, COL_SALE_PRICE)),
    }
}

/// Parse a sheet date. Day-first `D/M/YYYY` is the sheet's format;
/// year-first `YYYY/M/D` is also accepted. `-` and `.` work as separators.
pub fn parse_sheet_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parts: Vec<&str> = raw.split(['/', '-', '.']).map(str::trim).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let (y, m, d) = if parts[0].len() == 4 {
        (parts[0], parts[1], parts[2])
    } else {
        (parts[2], parts[1], parts[0])
    };
    let mut year: i32 = y.parse().ok()?;
    if y.len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, m.parse().ok()?, d.parse().ok()?)
}

/// The format written back to the sheet.
pub fn format_sheet_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// The format shown in chat messages.
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Lenient money parsing: currency marks and thousands separators are
/// dropped, anything unparsable or negative counts as zero.
pub fn parse_price(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Convert a 0-based column index into its sheet letter(s).
pub fn column_letter(mut idx: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
