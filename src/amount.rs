use thiserror::Error;

/// Decimals of the native currency (FLOW on Flow EVM).
pub const DECIMALS: u32 = 18;
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount '{0}'")]
    Invalid(String),
    #[error("amount '{0}' has more than 18 decimal places")]
    TooPrecise(String),
    #[error("amount '{0}' is too large")]
    Overflow(String),
}

/// Parses a decimal string like `"0.001"` into wei.
pub fn parse_ether(raw: &str) -> Result<u128, AmountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Invalid(trimmed.to_string()));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::Invalid(trimmed.to_string()));
    }
    if fraction.len() > DECIMALS as usize {
        return Err(AmountError::TooPrecise(trimmed.to_string()));
    }

    let overflow = || AmountError::Overflow(trimmed.to_string());
    let whole_wei = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| overflow())?
            .checked_mul(WEI_PER_ETHER)
            .ok_or_else(overflow)?
    };
    let fraction_wei = if fraction.is_empty() {
        0
    } else {
        let scale = 10u128.pow(DECIMALS - fraction.len() as u32);
        fraction.parse::<u128>().map_err(|_| overflow())? * scale
    };
    whole_wei.checked_add(fraction_wei).ok_or_else(overflow)
}

/// Formats wei as a decimal string with trailing zeros trimmed (`"1.5"`, `"0"`).
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let fraction = wei % WEI_PER_ETHER;
    if fraction == 0 {
        format!("{}", whole)
    } else {
        format!(
            "{}.{}",
            whole,
            format!("{:018}", fraction).trim_end_matches('0')
        )
    }
}

/// Formats wei with exactly `places` decimals, rounding half up.
pub fn format_ether_fixed(wei: u128, places: u32) -> String {
    let places = places.min(DECIMALS);
    let unit = 10u128.pow(DECIMALS - places);
    let rounded = wei / unit + u128::from(wei % unit >= unit / 2 && unit > 1);
    let scale = 10u128.pow(places);
    let whole = rounded / scale;
    if places == 0 {
        return format!("{}", whole);
    }
    let fraction = rounded % scale;
    format!("{}.{:0width$}", whole, fraction, width = places as usize)
}
