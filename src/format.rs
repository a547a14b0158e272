use bigdecimal::{BigDecimal, RoundingMode};

/// Rounds half-up and always prints exactly `places` decimals, zero included.
fn fixed(value: &BigDecimal, places: usize) -> String {
    let rounded = value.with_scale_round(places as i64, RoundingMode::HalfUp);
    let mut text = format!("{rounded:.places$}");
    let written = text.split_once('.').map_or(0, |(_, fraction)| fraction.len());
    if written == 0 && !text.contains('.') {
        text.push('.');
    }
    text.extend(std::iter::repeat_n('0', places.saturating_sub(written)));
    text
}

fn group_thousands(plain: &str) -> String {
    let (sign, digits) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain),
    };
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };
    let mut grouped = String::with_capacity(plain.len() + whole.len() / 3);
    grouped.push_str(sign);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

/// Volumes are shown to the thousandth.
pub fn volume(value: &BigDecimal) -> String {
    fixed(value, 3)
}

pub fn currency(value: &BigDecimal) -> String {
    format!("$ {}", group_thousands(&fixed(value, 2)))
}

pub fn unit_price(value: &BigDecimal) -> String {
    format!("$ {}", group_thousands(&fixed(value, 3)))
}
