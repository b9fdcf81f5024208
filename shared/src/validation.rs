//! Validation utilities for the Stock Management Platform
//!
//! Includes Brazil-specific validations for fiscal identifiers (CNPJ,
//! NF-e access keys).

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{LineItem, MovementType};

// ============================================================================
// Movement Validations
// ============================================================================

/// A structural violation in a movement payload, naming the offending
/// field and line index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line_items[{index}].{field}: {message}")]
pub struct LineItemViolation {
    pub index: usize,
    pub field: &'static str,
    pub message: &'static str,
}

/// Validate a movement's line items against its type.
///
/// Entry lines require a positive `unit_cost`, exit lines a positive
/// `unit_price`; quantities are always positive integers and at least one
/// line item must be present. Pure function, no side effects.
pub fn validate_line_items(
    movement_type: MovementType,
    items: &[LineItem],
) -> Result<(), LineItemViolation> {
    if items.is_empty() {
        return Err(LineItemViolation {
            index: 0,
            field: "line_items",
            message: "at least one line item is required",
        });
    }

    for (index, item) in items.iter().enumerate() {
        if item.quantity <= 0 {
            return Err(LineItemViolation {
                index,
                field: "quantity",
                message: "quantity must be a positive integer",
            });
        }

        match movement_type {
            MovementType::Entry => match item.unit_cost {
                Some(cost) if cost > Decimal::ZERO => {}
                Some(_) => {
                    return Err(LineItemViolation {
                        index,
                        field: "unit_cost",
                        message: "unit cost must be positive",
                    })
                }
                None => {
                    return Err(LineItemViolation {
                        index,
                        field: "unit_cost",
                        message: "unit cost is required for entry lines",
                    })
                }
            },
            MovementType::Exit => match item.unit_price {
                Some(price) if price > Decimal::ZERO => {}
                Some(_) => {
                    return Err(LineItemViolation {
                        index,
                        field: "unit_price",
                        message: "unit price must be positive",
                    })
                }
                None => {
                    return Err(LineItemViolation {
                        index,
                        field: "unit_price",
                        message: "unit price is required for exit lines",
                    })
                }
            },
        }
    }

    Ok(())
}

/// Validate the destination/source description of a movement
pub fn validate_destination(destination: &str) -> Result<(), &'static str> {
    if destination.trim().chars().count() < 3 {
        return Err("destination must be at least 3 characters");
    }
    Ok(())
}

// ============================================================================
// Brazilian Fiscal Validations
// ============================================================================

/// Validate a CNPJ (Brazilian company registry number), including both
/// check digits. Accepts punctuated ("11.222.333/0001-81") or bare input.
pub fn validate_cnpj(cnpj: &str) -> Result<(), &'static str> {
    let digits: Vec<u32> = cnpj.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != 14 {
        return Err("CNPJ must have 14 digits");
    }
    // Sequences like 00.000.000/0000-00 pass the check-digit math but are reserved
    if digits.windows(2).all(|w| w[0] == w[1]) {
        return Err("CNPJ cannot be a repeated-digit sequence");
    }

    let d13 = cnpj_check_digit(&digits[..12]);
    let d14 = cnpj_check_digit(&digits[..13]);
    if digits[12] != d13 || digits[13] != d14 {
        return Err("CNPJ check digits do not match");
    }
    Ok(())
}

/// Modulus-11 check digit with weights cycling 2..=9 from the right
fn cnpj_check_digit(digits: &[u32]) -> u32 {
    let mut weight = digits.len() as u32 - 7;
    let mut sum = 0;
    for &d in digits {
        sum += d * weight;
        weight = if weight == 2 { 9 } else { weight - 1 };
    }
    let rem = sum % 11;
    if rem < 2 {
        0
    } else {
        11 - rem
    }
}

/// Validate an NF-e access key (44 numeric digits)
pub fn validate_nfe_access_key(key: &str) -> Result<(), &'static str> {
    if key.len() != 44 || !key.chars().all(|c| c.is_ascii_digit()) {
        return Err("NF-e access key must be 44 numeric digits");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn line(quantity: i32, unit_price: Option<i64>, unit_cost: Option<i64>) -> LineItem {
        LineItem {
            product_id: Uuid::new_v4(),
            product_code: None,
            quantity,
            unit_price: unit_price.map(Decimal::from),
            unit_cost: unit_cost.map(Decimal::from),
        }
    }

    #[test]
    fn entry_requires_unit_cost() {
        let items = vec![line(5, None, Some(10)), line(2, Some(4), None)];
        let err = validate_line_items(MovementType::Entry, &items).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.field, "unit_cost");
    }

    #[test]
    fn exit_requires_unit_price() {
        let items = vec![line(5, None, Some(10))];
        let err = validate_line_items(MovementType::Exit, &items).unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.field, "unit_price");
    }

    #[test]
    fn quantity_must_be_positive() {
        let items = vec![line(0, Some(5), None)];
        let err = validate_line_items(MovementType::Exit, &items).unwrap_err();
        assert_eq!(err.field, "quantity");

        let items = vec![line(-3, Some(5), None)];
        assert!(validate_line_items(MovementType::Exit, &items).is_err());
    }

    #[test]
    fn prices_must_be_positive() {
        let items = vec![line(1, Some(0), None)];
        let err = validate_line_items(MovementType::Exit, &items).unwrap_err();
        assert_eq!(err.field, "unit_price");
        assert_eq!(err.message, "unit price must be positive");
    }

    #[test]
    fn empty_line_items_rejected() {
        let err = validate_line_items(MovementType::Entry, &[]).unwrap_err();
        assert_eq!(err.field, "line_items");
    }

    #[test]
    fn valid_movements_pass() {
        let entry = vec![line(10, None, Some(7)), line(3, None, Some(12))];
        assert!(validate_line_items(MovementType::Entry, &entry).is_ok());

        let exit = vec![line(4, Some(20), None)];
        assert!(validate_line_items(MovementType::Exit, &exit).is_ok());
    }

    #[test]
    fn destination_minimum_length() {
        assert!(validate_destination("ab").is_err());
        assert!(validate_destination("  a  ").is_err());
        assert!(validate_destination("Loja Centro").is_ok());
    }

    #[test]
    fn cnpj_valid_with_and_without_punctuation() {
        assert!(validate_cnpj("11.222.333/0001-81").is_ok());
        assert!(validate_cnpj("11222333000181").is_ok());
        assert!(validate_cnpj("11.444.777/0001-61").is_ok());
    }

    #[test]
    fn cnpj_invalid() {
        assert!(validate_cnpj("11.222.333/0001-82").is_err()); // bad check digit
        assert!(validate_cnpj("00.000.000/0000-00").is_err()); // repeated digits
        assert!(validate_cnpj("123").is_err()); // wrong length
    }

    #[test]
    fn nfe_access_key_format() {
        let key = "3".repeat(44);
        assert!(validate_nfe_access_key(&key).is_ok());
        assert!(validate_nfe_access_key("123").is_err());
        let with_letter = format!("{}A", "3".repeat(43));
        assert!(validate_nfe_access_key(&with_letter).is_err());
    }

    #[test]
    fn email_basic_format() {
        assert!(validate_email("ana@empresa.com.br").is_ok());
        assert!(validate_email("not-an-email").is_err());
    }
}
