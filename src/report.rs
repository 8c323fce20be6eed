//! Plain-text table of a run's records.

use console::{measure_text_width, pad_str, Alignment};

use crate::models::{ItemRecord, Price};

const HEADERS: [&str; 8] = [
    "list",
    "#",
    "item",
    "item_name",
    "price",
    "requested",
    "purchased",
    "fulfilled",
];

/// Right-aligned columns: rank, price, requested, purchased.
const NUMERIC: [bool; 8] = [false, true, false, false, true, true, true, false];

/// Render records as a bordered table, one row per record, in order.
///
/// ```text
/// +-----------+---+--------+-----------+-------+-----------+-----------+-----------+
/// |   list    | # |  item  | item_name | price | requested | purchased | fulfilled |
/// +===========+===+========+===========+=======+===========+===========+===========+
/// | Room 12   | 1 | B07AAA | Glue      |  4.99 |        10 |         2 | NO        |
/// +-----------+---+--------+-----------+-------+-----------+-----------+-----------+
/// ```
pub fn render(records: &[ItemRecord]) -> String {
    let rows: Vec<[String; 8]> = records.iter().map(row).collect();

    let mut widths = HEADERS.map(measure_text_width);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(measure_text_width(cell));
        }
    }

    let mut out = String::new();
    out.push_str(&rule(&widths, '-'));

    let header = HEADERS.map(str::to_string);
    out.push_str(&line(&header, &widths, |_| Alignment::Center));
    out.push_str(&rule(&widths, '='));

    for row in &rows {
        out.push_str(&line(row, &widths, |col| {
            if NUMERIC[col] {
                Alignment::Right
            } else {
                Alignment::Left
            }
        }));
    }
    if !rows.is_empty() {
        out.push_str(&rule(&widths, '-'));
    }

    out
}

fn row(record: &ItemRecord) -> [String; 8] {
    [
        record.list_name.clone(),
        record.rank.to_string(),
        record.item_id.clone(),
        record.item_name.clone(),
        format_price(&record.price),
        record.requested.to_string(),
        record.purchased.to_string(),
        record.fulfilled_label().to_string(),
    ]
}

fn format_price(price: &Price) -> String {
    match price {
        Price::Amount(v) => format!("{:.2}", v),
        Price::Unknown => "n/a".to_string(),
    }
}

fn rule(widths: &[usize; 8], fill: char) -> String {
    let mut s = String::from("+");
    for width in widths {
        s.extend(std::iter::repeat(fill).take(width + 2));
        s.push('+');
    }
    s.push('\n');
    s
}

fn line(cells: &[String; 8], widths: &[usize; 8], align: impl Fn(usize) -> Alignment) -> String {
    let mut s = String::from("|");
    for (col, (cell, width)) in cells.iter().zip(widths).enumerate() {
        s.push(' ');
        s.push_str(&pad_str(cell, *width, align(col), None));
        s.push_str(" |");
    }
    s.push('\n');
    s
}
