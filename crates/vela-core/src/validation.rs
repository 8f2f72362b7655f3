//! # Validation Module
//!
//! Input validation utilities for Vela Commerce.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront (TypeScript, generated DTOs)                      │
//! │  └── Basic format checks, immediate shopper feedback                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Checkout service (Rust)                                      │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: quantities, cart size, address, coupon input         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (usage_limit >= 0)                      │
//! │  ├── UNIQUE (product_id, canonical_key), UNIQUE (code)                 │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vela_core::validation::{validate_coupon_code, validate_quantity};
//!
//! validate_coupon_code("SAVE10").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::ShippingAddress;
use crate::{MAX_ITEM_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn require(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a coupon code.
///
/// ## Rules
/// - 3 to 32 characters after trimming
/// - Letters, numbers, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use vela_core::validation::validate_coupon_code;
///
/// assert!(validate_coupon_code("SUMMER-25").is_ok());
/// assert!(validate_coupon_code("").is_err());
/// assert!(validate_coupon_code("no spaces").is_err());
/// ```
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    require("code", code, 32)?;
    let code = code.trim();

    if code.chars().count() < 3 {
        return Err(ValidationError::TooShort {
            field: "code".to_string(),
            min: 3,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1 to 200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    require("name", name, 200)
}

/// Validates a shipping address.
///
/// ## Rules
/// - name, line1, city, postal_code, country are required
/// - country is a 2-letter ISO code
pub fn validate_shipping_address(address: &ShippingAddress) -> ValidationResult<()> {
    require("shipping name", &address.name, 200)?;
    require("address line 1", &address.line1, 200)?;
    if let Some(line2) = &address.line2 {
        if line2.chars().count() > 200 {
            return Err(ValidationError::TooLong {
                field: "address line 2".to_string(),
                max: 200,
            });
        }
    }
    require("city", &address.city, 100)?;
    require("postal code", &address.postal_code, 20)?;

    let country = address.country.trim();
    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "country".to_string(),
            reason: "must be a 2-letter ISO country code".to_string(),
        });
    }

    if let Some(phone) = &address.phone {
        if phone.chars().count() > 32 {
            return Err(ValidationError::TooLong {
                field: "phone".to_string(),
                max: 32,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents (zero allowed).
///
/// ## Rules
/// - Must not be negative
/// - Must not exceed MAX_PRICE_CENTS
///
/// ## Example
/// ```rust
/// use vela_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(i64::MAX / 2).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Rejects negative values.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_price_cents_bounds() {
        assert!(validate_price_cents(MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents(MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { max: MAX_PRICE_CENTS, .. })
        ));
        assert!(validate_price_cents(i64::MAX / 2).is_err());
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Ada Lovelace".to_string(),
            line1: "12 St James's Square".to_string(),
            line2: None,
            city: "London".to_string(),
            postal_code: "SW1Y 4JH".to_string(),
            country: "GB".to_string(),
            phone: Some("+44 20 7946 0000".to_string()),
        }
    }

    #[test]
    fn test_validate_coupon_code() {
        assert!(validate_coupon_code("SAVE10").is_ok());
        assert!(validate_coupon_code("summer_sale-2025").is_ok());

        assert!(validate_coupon_code("").is_err());
        assert!(validate_coupon_code("AB").is_err());
        assert!(validate_coupon_code("has space").is_err());
        assert!(validate_coupon_code(&"A".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_shipping_address() {
        assert!(validate_shipping_address(&address()).is_ok());

        let mut missing_city = address();
        missing_city.city = "  ".to_string();
        assert!(matches!(
            validate_shipping_address(&missing_city),
            Err(ValidationError::Required { .. })
        ));

        let mut bad_country = address();
        bad_country.country = "GBR".to_string();
        assert!(matches!(
            validate_shipping_address(&bad_country),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(2_000).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
    }
}
