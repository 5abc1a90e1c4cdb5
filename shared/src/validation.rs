//! Validation utilities for the Line Trace platform

/// Validate an externally assigned identifier (item id, equipment id, ...)
pub fn validate_identifier(id: &str) -> Result<(), &'static str> {
    if id.trim().is_empty() {
        return Err("Identifier cannot be empty");
    }
    if id.len() > 64 {
        return Err("Identifier is too long");
    }
    if id.chars().any(char::is_whitespace) {
        return Err("Identifier cannot contain whitespace");
    }
    Ok(())
}

/// Validate a quantity used for stock or BOM edges
pub fn validate_quantity(quantity: f64) -> Result<(), &'static str> {
    if !quantity.is_finite() {
        return Err("Quantity must be a finite number");
    }
    if quantity <= 0.0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a process code: a single ASCII uppercase letter
pub fn validate_process_code(code: &str) -> Result<(), &'static str> {
    let mut chars = code.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => Ok(()),
        _ => Err("Process code must be a single uppercase letter"),
    }
}

/// Validate the lot identifier format: YYMM + process letter + 3-digit sequence
pub fn validate_lot_id_format(lot_id: &str) -> Result<(), &'static str> {
    if !lot_id.is_ascii() || lot_id.len() != 8 {
        return Err("Lot id must be 8 ASCII characters");
    }
    let (date_part, rest) = lot_id.split_at(4);
    if !date_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err("Lot id must start with a YYMM prefix");
    }
    let month: u32 = date_part[2..].parse().map_err(|_| "Invalid month in lot id")?;
    if !(1..=12).contains(&month) {
        return Err("Invalid month in lot id");
    }
    let mut rest_chars = rest.chars();
    match rest_chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return Err("Lot id must carry a process letter"),
    }
    if !rest_chars.as_str().bytes().all(|b| b.is_ascii_digit())
        || rest_chars.as_str().len() != 3
    {
        return Err("Lot id must end with a 3-digit sequence");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(validate_identifier("YARN_001").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("  ").is_err());
        assert!(validate_identifier("BAD ID").is_err());
    }

    #[test]
    fn quantities() {
        assert!(validate_quantity(8.0).is_ok());
        assert!(validate_quantity(0.0).is_err());
        assert!(validate_quantity(-1.0).is_err());
        assert!(validate_quantity(f64::NAN).is_err());
        assert!(validate_quantity(f64::INFINITY).is_err());
    }

    #[test]
    fn process_codes() {
        assert!(validate_process_code("P").is_ok());
        assert!(validate_process_code("p").is_err());
        assert!(validate_process_code("PW").is_err());
        assert!(validate_process_code("").is_err());
    }

    #[test]
    fn lot_id_formats() {
        assert!(validate_lot_id_format("2505P001").is_ok());
        assert!(validate_lot_id_format("2513P001").is_err());
        assert!(validate_lot_id_format("2505p001").is_err());
        assert!(validate_lot_id_format("2505P01").is_err());
        assert!(validate_lot_id_format("2505P0001").is_err());
    }
}
