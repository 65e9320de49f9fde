//! Roman numeral helpers for ordering acts and scenes.

fn numeral_value(c: char) -> Option<u32> {
    Some(match c {
        'I' => 1,
        'V' => 5,
        'X' => 10,
        'L' => 50,
        'C' => 100,
        'D' => 500,
        'M' => 1000,
        _ => return None,
    })
}

/// Value of an upper- or lower-case roman numeral; 0 when it is not one.
pub fn roman_to_int(roman: &str) -> u32 {
    if roman.is_empty() {
        return 0;
    }

    let mut total: i64 = 0;
    let mut prev = 0;
    for c in roman.trim().to_uppercase().chars().rev() {
        let Some(value) = numeral_value(c) else {
            return 0;
        };
        if value >= prev {
            total += value as i64;
        } else {
            total -= value as i64;
        }
        prev = value;
    }
    total.max(0) as u32
}

/// Sort key for an act or scene label: roman numeral, then integer, else last.
pub fn act_to_int(label: &str) -> u32 {
    let label = label.trim();
    match roman_to_int(label) {
        0 => label.parse().unwrap_or(9999),
        n => n,
    }
}
