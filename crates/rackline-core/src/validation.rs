//! # Validation Module
//!
//! Input validation and offline stock checks for Rackline.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Frontend (TypeScript)                                     │
//! │  ├── Basic format checks (empty, length)                            │
//! │  └── Immediate user feedback                                        │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE (Rust)                                        │
//! │  ├── Cart line shape (positive quantity, non-negative price)        │
//! │  └── Offline stock check against cached levels                      │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                         │
//! │  └── NOT NULL / CHECK / UNIQUE constraints                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::CartLine;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a variant identifier.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 64 characters
pub fn validate_variant_id(variant_id: &str) -> ValidationResult<()> {
    let variant_id = variant_id.trim();

    if variant_id.is_empty() {
        return Err(ValidationError::Required {
            field: "variant_id".to_string(),
        });
    }

    if variant_id.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "variant_id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (guards against a typo like 1000
///   instead of 10)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in centavos.
///
/// ## Rules
/// - Must be non-negative (>= 0); zero is allowed (free items)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a whole cart line before assembly.
pub fn validate_cart_line(line: &CartLine) -> ValidationResult<()> {
    validate_variant_id(&line.variant_id)?;
    validate_quantity(line.quantity)?;
    validate_price_cents(line.unit_price_cents)?;
    Ok(())
}

/// Validates cart size (number of lines).
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 0,
            max: MAX_CART_LINES as i64,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Offline Stock Check
// =============================================================================

/// A cart line that cannot be covered by cached stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockShortfall {
    /// The variant that is short.
    pub variant_id: String,

    /// Name snapshot from the cart line, for display.
    pub name: String,

    /// Units the cart wants.
    pub requested: i64,

    /// Units the cache believes are available.
    pub available: i64,
}

/// Checks cart lines against locally cached stock levels.
///
/// Returns every shortfall, not just the first, so the UI can present all
/// problem lines at once. An empty result means the whole cart is covered.
/// A variant missing from `levels` counts as zero available.
///
/// Lines for the same variant are summed before checking, so two lines of
/// 3 against a level of 5 are correctly reported short.
pub fn check_stock(lines: &[CartLine], levels: &HashMap<String, i64>) -> Vec<StockShortfall> {
    let mut wanted: Vec<(&str, &str, i64)> = Vec::new();
    for line in lines {
        match wanted.iter_mut().find(|(v, _, _)| *v == line.variant_id) {
            Some((_, _, qty)) => *qty += line.quantity,
            None => wanted.push((&line.variant_id, &line.name, line.quantity)),
        }
    }

    wanted
        .into_iter()
        .filter_map(|(variant_id, name, requested)| {
            let available = levels.get(variant_id).copied().unwrap_or(0);
            (available < requested).then(|| StockShortfall {
                variant_id: variant_id.to_string(),
                name: name.to_string(),
                requested,
                available,
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(variant: &str, qty: i64) -> CartLine {
        CartLine {
            variant_id: variant.to_string(),
            name: format!("{variant} name"),
            quantity: qty,
            unit_price_cents: 1000,
        }
    }

    #[test]
    fn test_validate_variant_id() {
        assert!(validate_variant_id("VAR-001").is_ok());
        assert!(validate_variant_id("").is_err());
        assert!(validate_variant_id("   ").is_err());
        assert!(validate_variant_id(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn test_check_stock_all_covered() {
        let levels = HashMap::from([("VAR-1".to_string(), 10), ("VAR-2".to_string(), 5)]);
        let shortfalls = check_stock(&[line("VAR-1", 3), line("VAR-2", 5)], &levels);
        assert!(shortfalls.is_empty());
    }

    #[test]
    fn test_check_stock_reports_every_shortfall() {
        let levels = HashMap::from([("VAR-1".to_string(), 2)]);
        let shortfalls = check_stock(&[line("VAR-1", 3), line("VAR-2", 1)], &levels);

        assert_eq!(shortfalls.len(), 2);
        assert_eq!(shortfalls[0].variant_id, "VAR-1");
        assert_eq!(shortfalls[0].available, 2);
        // Unknown variant counts as zero available.
        assert_eq!(shortfalls[1].variant_id, "VAR-2");
        assert_eq!(shortfalls[1].available, 0);
    }

    #[test]
    fn test_check_stock_sums_lines_per_variant() {
        let levels = HashMap::from([("VAR-1".to_string(), 5)]);
        let shortfalls = check_stock(&[line("VAR-1", 3), line("VAR-1", 3)], &levels);

        assert_eq!(shortfalls.len(), 1);
        assert_eq!(shortfalls[0].requested, 6);
        assert_eq!(shortfalls[0].available, 5);
    }
}
