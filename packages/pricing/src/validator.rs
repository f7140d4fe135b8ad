use cartshift_core::ValidationError;

use crate::types::{LineItemInput, PricingOfferCreateInput, PricingOfferUpdateInput};

const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 200;

fn validate_title(title: &str, errors: &mut Vec<ValidationError>) {
    let len = title.trim().chars().count();
    if len < TITLE_MIN || len > TITLE_MAX {
        errors.push(ValidationError::new(
            "title",
            format!("Title must be between {} and {} characters", TITLE_MIN, TITLE_MAX),
        ));
    }
}

fn validate_line_items(items: &[LineItemInput], errors: &mut Vec<ValidationError>) {
    if items.is_empty() {
        errors.push(ValidationError::new(
            "lineItems",
            "At least one line item is required",
        ));
        return;
    }

    for (index, item) in items.iter().enumerate() {
        if item.description.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("lineItems[{}].description", index),
                "Line item description is required",
            ));
        }
        if item.quantity < 1 {
            errors.push(ValidationError::new(
                format!("lineItems[{}].quantity", index),
                "Quantity must be at least 1",
            ));
        }
        if item.unit_price < 0 {
            errors.push(ValidationError::new(
                format!("lineItems[{}].unitPrice", index),
                "Unit price cannot be negative",
            ));
        }
    }
}

/// Validates offer data for creation
pub fn validate_offer_create(input: &PricingOfferCreateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_title(&input.title, &mut errors);
    validate_line_items(&input.line_items, &mut errors);
    errors
}

/// Validates offer update data; only provided fields are checked
pub fn validate_offer_update(input: &PricingOfferUpdateInput) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if let Some(ref title) = input.title {
        validate_title(title, &mut errors);
    }
    if let Some(ref items) = input.line_items {
        validate_line_items(items, &mut errors);
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartshift_core::Currency;

    fn item(description: &str, quantity: i64, unit_price: i64) -> LineItemInput {
        LineItemInput {
            description: description.to_string(),
            quantity,
            unit_price,
            notes: None,
        }
    }

    fn create_input(title: &str, items: Vec<LineItemInput>) -> PricingOfferCreateInput {
        PricingOfferCreateInput {
            title: title.to_string(),
            description: None,
            line_items: items,
            currency: Currency::Usd,
            request_ids: None,
            client_name: None,
            client_email: None,
            valid_until: None,
            agency_notes: None,
        }
    }

    #[test]
    fn test_valid_offer() {
        let input = create_input("Site redesign", vec![item("Design", 1, 50000)]);
        assert!(validate_offer_create(&input).is_empty());
    }

    #[test]
    fn test_title_too_short() {
        let input = create_input("ab", vec![item("Design", 1, 50000)]);
        let errors = validate_offer_create(&input);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "title");
    }

    #[test]
    fn test_title_too_long() {
        let input = create_input(&"x".repeat(201), vec![item("Design", 1, 50000)]);
        let errors = validate_offer_create(&input);
        assert_eq!(errors[0].field, "title");
    }

    #[test]
    fn test_requires_line_items() {
        let input = create_input("Site redesign", vec![]);
        let errors = validate_offer_create(&input);
        assert_eq!(errors[0].field, "lineItems");
    }

    #[test]
    fn test_rejects_bad_line_items() {
        let input = create_input(
            "Site redesign",
            vec![item("", 0, -100), item("ok", 2, 500)],
        );
        let errors = validate_offer_create(&input);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "lineItems[0].description",
                "lineItems[0].quantity",
                "lineItems[0].unitPrice"
            ]
        );
    }

    #[test]
    fn test_update_checks_only_provided_fields() {
        let input = PricingOfferUpdateInput::default();
        assert!(validate_offer_update(&input).is_empty());

        let input = PricingOfferUpdateInput {
            title: Some("ab".to_string()),
            ..Default::default()
        };
        assert_eq!(validate_offer_update(&input).len(), 1);
    }
}
