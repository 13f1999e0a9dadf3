use chrono::{Local, NaiveDate};

/// Interprets a staff-typed date. Accepts `MM/DD/YYYY`, `M/D/YY`, ISO `YYYY-MM-DD`
/// and the six-digit legacy form `MMDDYY` (always 20YY).
pub fn interpret_date(text: &str) -> Option<NaiveDate> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Some(d);
    }

    if t.contains('/') {
        let parts: Vec<&str> = t.split('/').collect();
        if parts.len() != 3 {
            return None;
        }
        let month = parts[0].trim().parse::<u32>().ok()?;
        let day = parts[1].trim().parse::<u32>().ok()?;
        let year_text = parts[2].trim();
        let year = match year_text.len() {
            2 => 2000 + year_text.parse::<i32>().ok()?,
            4 => year_text.parse::<i32>().ok()?,
            _ => return None,
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if t.len() == 6 && t.chars().all(|c| c.is_ascii_digit()) {
        let value = t.parse::<u32>().ok()?;
        let month = value / 10000;
        let day = (value / 100) % 100;
        let year = 2000 + (value % 100) as i32;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Strict ISO parse used for protocol params (`asOf`, stored-form dates).
pub fn parse_iso(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn fmt_mdy(d: NaiveDate) -> String {
    d.format("%m/%d/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn accepts_slash_forms() {
        assert_eq!(interpret_date("03/14/2026"), Some(ymd(2026, 3, 14)));
        assert_eq!(interpret_date("3/4/26"), Some(ymd(2026, 3, 4)));
        assert_eq!(interpret_date(" 12/31/1999 "), Some(ymd(1999, 12, 31)));
    }

    #[test]
    fn accepts_iso_and_legacy_six_digit() {
        assert_eq!(interpret_date("2026-10-19"), Some(ymd(2026, 10, 19)));
        assert_eq!(interpret_date("123199"), Some(ymd(2099, 12, 31)));
        assert_eq!(interpret_date("010226"), Some(ymd(2026, 1, 2)));
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        assert_eq!(interpret_date(""), None);
        assert_eq!(interpret_date("next tuesday"), None);
        assert_eq!(interpret_date("02/30/2026"), None);
        assert_eq!(interpret_date("133199"), None);
        assert_eq!(interpret_date("1/2/345"), None);
    }

    #[test]
    fn mdy_format_pads() {
        assert_eq!(fmt_mdy(ymd(2026, 3, 4)), "03/04/2026");
    }
}
