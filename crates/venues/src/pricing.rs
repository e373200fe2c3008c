//! Slot prices derived from booking-table colors.
//!
//! Booking tables paint each free cell with a background color and explain
//! the colors in a legend with an hourly price. Slots are 30 minutes, so a
//! slot costs half the hourly price, rounded.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

/// Normalized `#rrggbb` color mapped to an hourly price in euros.
pub type ColorPrices = HashMap<String, Decimal>;

lazy_static! {
    static ref BACKGROUND_COLOR_REGEX: Regex =
        Regex::new(r"(?i)background-color\s*:\s*([#\w(),\s]+)").expect("Invalid regex pattern");

    static ref HEX_COLOR_REGEX: Regex =
        Regex::new(r"^#([0-9a-f]{6})\b").expect("Invalid regex pattern");

    static ref RGB_COLOR_REGEX: Regex =
        Regex::new(r"^rgb\s*\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)").expect("Invalid regex pattern");

    /// First number in a legend entry, e.g. "24 €".
    static ref LEGEND_PRICE_REGEX: Regex =
        Regex::new(r"([\d.,]+)\s*€?").expect("Invalid regex pattern");

    /// Hourly price in a pricing description, e.g. "20 €/val.".
    static ref HOURLY_PRICE_REGEX: Regex =
        Regex::new(r"([\d.,]+)\s*€/val").expect("Invalid regex pattern");

    static ref LEGEND_ITEM: Selector = Selector::parse("div.legend-item").expect("Invalid selector");
    static ref STYLED_SPAN: Selector = Selector::parse("span[style]").expect("Invalid selector");
    static ref TIME_DESCRIPTION: Selector =
        Selector::parse(".time-description").expect("Invalid selector");
    static ref COLOR_DIV: Selector = Selector::parse("div.color[style]").expect("Invalid selector");
    static ref DESCRIPTION_DIV: Selector =
        Selector::parse("div.description").expect("Invalid selector");
}

/// Normalize a CSS color to lowercase `#rrggbb`.
///
/// Accepts hex (`#B9E5FB`) and `rgb(r, g, b)` notations.
pub fn normalize_color(color: &str) -> Option<String> {
    let color = color.trim().to_lowercase();
    if color.is_empty() {
        return None;
    }

    if let Some(caps) = HEX_COLOR_REGEX.captures(&color) {
        return Some(format!("#{}", &caps[1]));
    }

    let caps = RGB_COLOR_REGEX.captures(&color)?;
    let r: u8 = caps[1].parse().ok()?;
    let g: u8 = caps[2].parse().ok()?;
    let b: u8 = caps[3].parse().ok()?;
    Some(format!("#{:02x}{:02x}{:02x}", r, g, b))
}

/// The normalized background color declared in an inline `style`.
pub fn background_color(style: &str) -> Option<String> {
    let caps = BACKGROUND_COLOR_REGEX.captures(style)?;
    normalize_color(caps[1].trim())
}

fn parse_price(raw: &str) -> Option<Decimal> {
    raw.replace(',', ".").parse().ok()
}

/// Text of an element with each text node trimmed and concatenated.
fn stripped_text(element: &ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

/// Color prices from `div.legend-item` entries.
pub fn legend_prices(document: &Html) -> ColorPrices {
    let mut prices = ColorPrices::new();
    for item in document.select(&LEGEND_ITEM) {
        let color = item
            .select(&STYLED_SPAN)
            .filter_map(|span| span.value().attr("style"))
            .find_map(background_color);
        let Some(color) = color else {
            continue;
        };

        let text = stripped_text(&item);
        if let Some(price) = LEGEND_PRICE_REGEX
            .captures(&text)
            .and_then(|caps| parse_price(&caps[1]))
        {
            prices.insert(color, price);
        }
    }
    prices
}

/// Color prices from `.time-description` blocks (`20 €/val.`).
pub fn time_description_prices(document: &Html) -> ColorPrices {
    let mut prices = ColorPrices::new();
    for item in document.select(&TIME_DESCRIPTION) {
        let Some(color) = item
            .select(&COLOR_DIV)
            .filter_map(|div| div.value().attr("style"))
            .find_map(background_color)
        else {
            continue;
        };
        let Some(description) = item.select(&DESCRIPTION_DIV).next() else {
            continue;
        };

        let text = stripped_text(&description);
        if let Some(price) = HOURLY_PRICE_REGEX
            .captures(&text)
            .and_then(|caps| parse_price(&caps[1]))
        {
            prices.insert(color, price);
        }
    }
    prices
}

/// Price of a 30-minute slot painted with the cell's background color.
pub fn slot_price(cell: &ElementRef<'_>, prices: &ColorPrices) -> Option<Decimal> {
    if prices.is_empty() {
        return None;
    }
    let color = background_color(cell.value().attr("style")?)?;
    let hourly = prices.get(&color)?;
    Some((hourly / Decimal::TWO).round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color("#B9E5FB"), Some("#b9e5fb".to_string()));
        assert_eq!(normalize_color("  #8dd8f8;"), Some("#8dd8f8".to_string()));
        assert_eq!(
            normalize_color("rgb(185, 229, 251)"),
            Some("#b9e5fb".to_string())
        );
        assert_eq!(normalize_color("rgb(300, 0, 0)"), None);
        assert_eq!(normalize_color("#fff"), None);
        assert_eq!(normalize_color("blue"), None);
        assert_eq!(normalize_color(""), None);
    }

    #[test]
    fn test_background_color_from_style() {
        assert_eq!(
            background_color("width: 10px; Background-Color: #9DB0DA"),
            Some("#9db0da".to_string())
        );
        assert_eq!(background_color("color: #9DB0DA"), None);
    }

    #[test]
    fn test_legend_prices() {
        let html = Html::parse_document(
            r#"<div class="legend">
                <div class="legend-item"><span style="background-color: #B9E5FB"></span> 24 €</div>
                <div class="legend-item"><span style="background-color: rgb(141, 216, 248)"></span>38,5 €</div>
                <div class="legend-item"><span class="plain"></span>99 €</div>
            </div>"#,
        );
        let prices = legend_prices(&html);

        assert_eq!(prices.len(), 2);
        assert_eq!(prices.get("#b9e5fb"), Some(&dec!(24)));
        assert_eq!(prices.get("#8dd8f8"), Some(&dec!(38.5)));
    }

    #[test]
    fn test_time_description_prices() {
        let html = Html::parse_document(
            r#"<div class="pricing">
                <div class="time-description">
                    <div class="color" style="background-color: #9DB0DA"></div>
                    <div class="description">20 €/val. nuo 2026-03-01 22 €/val.</div>
                </div>
                <div class="time-description">
                    <div class="color" style="background-color: #123456"></div>
                </div>
            </div>"#,
        );
        let prices = time_description_prices(&html);

        assert_eq!(prices.len(), 1);
        assert_eq!(prices.get("#9db0da"), Some(&dec!(20)));
    }

    #[test]
    fn test_slot_price_is_half_hourly_rounded() {
        let html = Html::parse_document(
            r#"<table><tr>
                <td id="a" style="background-color: #b9e5fb"></td>
                <td id="b" style="background-color: #8dd8f8"></td>
                <td id="c" style="background-color: #000000"></td>
                <td id="d"></td>
            </tr></table>"#,
        );
        let prices: ColorPrices = [
            ("#b9e5fb".to_string(), dec!(24)),
            ("#8dd8f8".to_string(), dec!(25)),
        ]
        .into_iter()
        .collect();

        let cell = |id: &str| {
            let selector = Selector::parse(&format!("td#{}", id)).unwrap();
            html.select(&selector).next().unwrap()
        };

        assert_eq!(slot_price(&cell("a"), &prices), Some(dec!(12)));
        // Half-way values round to even.
        assert_eq!(slot_price(&cell("b"), &prices), Some(dec!(12)));
        assert_eq!(slot_price(&cell("c"), &prices), None);
        assert_eq!(slot_price(&cell("d"), &prices), None);
        assert_eq!(slot_price(&cell("a"), &ColorPrices::new()), None);
    }
}
