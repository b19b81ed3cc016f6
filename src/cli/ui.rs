use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Success,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Success => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right-aligned number with a fixed number of decimals.
pub fn number_cell(value: f64, places: usize) -> Cell {
    Cell::new(format!("{value:.places$}")).set_alignment(CellAlignment::Right)
}

/// Multiplier cell; identity multipliers are dimmed.
pub fn multiplier_cell(value: f64) -> Cell {
    let cell = Cell::new(format!("{value}")).set_alignment(CellAlignment::Right);
    if value == 1.0 {
        cell.fg(Color::DarkGrey)
    } else {
        cell
    }
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64, with_message: bool) -> ProgressBar {
    let template = if with_message {
        "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    } else {
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})"
    };

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_cell_formatting() {
        assert_eq!(number_cell(4.5, 4).content(), "4.5000");
        assert_eq!(number_cell(67012.456, 2).content(), "67012.46");
    }

    #[test]
    fn test_table_renders_headers() {
        let mut table = new_styled_table();
        table.set_header(vec![header_cell("Code"), header_cell("Price")]);
        table.add_row(vec![Cell::new("510300"), number_cell(3.912, 3)]);
        let rendered = table.to_string();
        assert!(rendered.contains("510300"));
        assert!(rendered.contains("3.912"));
    }
}
