//! Payload validation for the order workflow.
//!
//! All validators run before any write and aggregate every problem they
//! find: the resulting message lists all failing fields or ids, not just
//! the first one. Messages are in the operator's language, matching what
//! the client application displays verbatim.

use std::collections::HashMap;
use std::sync::LazyLock;

use model::{AddressPayload, Service, ServiceLine, UserPayload};
use regex::Regex;
use repository::OrderLine;

use crate::ServiceError;

/// Sanity-check maxima for the optional address fields.
pub const MAX_APARTMENT: i32 = 9999;
pub const MAX_FLOOR: i32 = 150;
pub const MAX_ENTRANCE: i32 = 50;

/// Full-match pattern for a person's name: letters, with single spaces or
/// hyphens between words.
static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-zА-Яа-яЁё]+(?:[ -][A-Za-zА-Яа-яЁё]+)*$").expect("invalid username pattern")
});

/// Full-match pattern for an email address.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("invalid email pattern")
});

pub fn username_is_valid(username: &str) -> bool {
    !username.is_empty() && username.len() <= 60 && USERNAME_PATTERN.is_match(username)
}

pub fn email_is_valid(email: &str) -> bool {
    !email.is_empty() && email.len() <= 50 && EMAIL_PATTERN.is_match(email)
}

/// Region-aware phone validity via the phonenumber library. The region hint
/// applies to numbers without an explicit country code.
pub fn phone_is_valid(phone: &str, region: &str) -> bool {
    if phone.is_empty() {
        return false;
    }
    let region_id = region.parse::<phonenumber::country::Id>().ok();
    match phonenumber::parse(region_id, phone) {
        Ok(parsed) => phonenumber::is_valid(&parsed),
        Err(_) => false,
    }
}

/// Validates the user payload of an order request, collecting the names of
/// every failing field into one aggregated error.
pub fn validate_user(payload: &UserPayload, phone_region: &str) -> Result<(), ServiceError> {
    let mut invalid_fields: Vec<&str> = Vec::new();
    if !username_is_valid(&payload.username) {
        invalid_fields.push("username");
    }
    if !email_is_valid(&payload.email) {
        invalid_fields.push("email");
    }
    if !phone_is_valid(&payload.phone, phone_region) {
        invalid_fields.push("phone");
    }
    if !invalid_fields.is_empty() {
        return Err(ServiceError::Validation(format!(
            "Отсутствуют или указаны невалидные данные: {}.",
            invalid_fields.join(", ")
        )));
    }
    Ok(())
}

/// Validates the address payload: required city/street/house plus the
/// sanity-check maxima on the optional fields. Aggregated like
/// [`validate_user`].
pub fn validate_address(payload: &AddressPayload) -> Result<(), ServiceError> {
    let mut invalid_fields: Vec<&str> = Vec::new();
    if payload.city.is_empty() || payload.city.len() > 50 {
        invalid_fields.push("city");
    }
    if payload.street.is_empty() || payload.street.len() > 50 {
        invalid_fields.push("street");
    }
    if payload.house <= 0 {
        invalid_fields.push("house");
    }
    if payload.apartment.is_some_and(|v| v <= 0 || v > MAX_APARTMENT) {
        invalid_fields.push("apartment");
    }
    if payload.floor.is_some_and(|v| v <= 0 || v > MAX_FLOOR) {
        invalid_fields.push("floor");
    }
    if payload.entrance.is_some_and(|v| v <= 0 || v > MAX_ENTRANCE) {
        invalid_fields.push("entrance");
    }
    if !invalid_fields.is_empty() {
        return Err(ServiceError::Validation(format!(
            "Указаны некорректные данные адреса: {}.",
            invalid_fields.join(", ")
        )));
    }
    Ok(())
}

/// Validates the service line items against the catalog.
///
/// A line missing `id` or `amount` fails immediately with a generic error;
/// otherwise every id that is unknown to the catalog or carries a
/// non-positive amount is collected into one aggregated error. An order
/// must contain at least one line item.
pub fn validate_services(
    lines: &[ServiceLine],
    catalog: &HashMap<i32, Service>,
) -> Result<Vec<OrderLine>, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::Validation(
            "Укажите хотя бы одну услугу.".to_string(),
        ));
    }

    let mut validated: Vec<OrderLine> = Vec::with_capacity(lines.len());
    let mut invalid_ids: Vec<String> = Vec::new();
    for line in lines {
        let (Some(id), Some(amount)) = (line.id, line.amount) else {
            return Err(ServiceError::Validation(
                "Укажите id и amount услуги.".to_string(),
            ));
        };
        if !catalog.contains_key(&id) || amount <= 0 {
            invalid_ids.push(id.to_string());
        } else {
            validated.push(OrderLine {
                service_id: id,
                amount,
            });
        }
    }
    if !invalid_ids.is_empty() {
        return Err(ServiceError::Validation(format!(
            "Убедитесь, что услуги со следующими id существуют, и для них \
             указано валидное значение поля amount: {}.",
            invalid_ids.join(", ")
        )));
    }
    Ok(validated)
}

/// Sums `cleaning_time × amount` over the validated lines with overflow
/// checks. Amounts are schema-valid up to `i32::MAX`, so the product can
/// exceed the range of `i32`; an overflowing total is a payload problem,
/// not a server fault.
pub fn total_cleaning_time(
    lines: &[OrderLine],
    catalog: &HashMap<i32, Service>,
) -> Result<i32, ServiceError> {
    lines
        .iter()
        .try_fold(0i32, |acc, line| {
            let minutes = catalog[&line.service_id].cleaning_time;
            acc.checked_add(minutes.checked_mul(line.amount)?)
        })
        .ok_or_else(|| {
            ServiceError::Validation("Суммарное время уборки слишком велико.".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, email: &str, phone: &str) -> UserPayload {
        UserPayload {
            username: username.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        }
    }

    fn catalog_with(ids: &[i32]) -> HashMap<i32, Service> {
        ids.iter()
            .map(|&id| {
                (id, Service {
                    id,
                    title: format!("service {id}"),
                    price: 100,
                    measure: "м²".to_string(),
                    image: String::new(),
                    cleaning_time: 30,
                    cleaning_type_id: 1,
                    additional: false,
                })
            })
            .collect()
    }

    #[test]
    fn test_valid_user_payload() {
        let payload = user("bob", "bob@x.com", "+79991234567");
        assert!(validate_user(&payload, "RU").is_ok());
    }

    #[test]
    fn test_cyrillic_and_hyphenated_names() {
        assert!(username_is_valid("Анна-Мария"));
        assert!(username_is_valid("Иван Петров"));
        assert!(!username_is_valid("bob42"));
        assert!(!username_is_valid(""));
        assert!(!username_is_valid("a--b"));
    }

    #[test]
    fn test_email_patterns() {
        assert!(email_is_valid("bob@x.com"));
        assert!(email_is_valid("a.b+c@mail.example.org"));
        assert!(!email_is_valid("bob@x"));
        assert!(!email_is_valid("not-an-email"));
        assert!(!email_is_valid(""));
    }

    #[test]
    fn test_phone_region_aware() {
        // National format resolves through the region hint.
        assert!(phone_is_valid("+79991234567", "RU"));
        assert!(phone_is_valid("8 999 123-45-67", "RU"));
        assert!(!phone_is_valid("12345", "RU"));
        assert!(!phone_is_valid("", "RU"));
    }

    #[test]
    fn test_invalid_user_lists_all_failing_fields() {
        let payload = user("bob42", "nope", "12345");
        let err = validate_user(&payload, "RU").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("username"));
        assert!(message.contains("email"));
        assert!(message.contains("phone"));
    }

    #[test]
    fn test_invalid_user_lists_only_failing_fields() {
        let payload = user("bob", "nope", "+79991234567");
        let message = validate_user(&payload, "RU").unwrap_err().to_string();
        assert!(message.contains("email"));
        assert!(!message.contains("username"));
        assert!(!message.contains("phone"));
    }

    #[test]
    fn test_valid_address() {
        let payload = AddressPayload {
            city: "Moscow".to_string(),
            street: "Lenina".to_string(),
            house: 5,
            apartment: Some(12),
            floor: Some(3),
            entrance: Some(1),
        };
        assert!(validate_address(&payload).is_ok());
    }

    #[test]
    fn test_address_out_of_range_fields_aggregated() {
        let payload = AddressPayload {
            city: "Moscow".to_string(),
            street: "Lenina".to_string(),
            house: 0,
            apartment: Some(10_000),
            floor: Some(151),
            entrance: Some(51),
        };
        let message = validate_address(&payload).unwrap_err().to_string();
        for field in ["house", "apartment", "floor", "entrance"] {
            assert!(message.contains(field), "missing {field} in: {message}");
        }
    }

    #[test]
    fn test_services_valid() {
        let catalog = catalog_with(&[1, 2]);
        let lines = vec![
            ServiceLine {
                id: Some(1),
                amount: Some(2),
            },
            ServiceLine {
                id: Some(2),
                amount: Some(1),
            },
        ];
        let validated = validate_services(&lines, &catalog).unwrap();
        assert_eq!(validated.len(), 2);
        assert_eq!(validated[0].service_id, 1);
        assert_eq!(validated[0].amount, 2);
    }

    #[test]
    fn test_services_missing_fields_is_generic_error() {
        let catalog = catalog_with(&[1]);
        let lines = vec![ServiceLine {
            id: Some(1),
            amount: None,
        }];
        let message = validate_services(&lines, &catalog).unwrap_err().to_string();
        assert_eq!(message, "Укажите id и amount услуги.");
    }

    #[test]
    fn test_services_unknown_ids_and_bad_amounts_aggregated() {
        let catalog = catalog_with(&[1]);
        let lines = vec![
            ServiceLine {
                id: Some(7),
                amount: Some(1),
            },
            ServiceLine {
                id: Some(1),
                amount: Some(0),
            },
        ];
        let message = validate_services(&lines, &catalog).unwrap_err().to_string();
        assert!(message.contains('7'));
        assert!(message.contains('1'));
    }

    #[test]
    fn test_services_empty_list_rejected() {
        let catalog = catalog_with(&[1]);
        assert!(validate_services(&[], &catalog).is_err());
    }

    #[test]
    fn test_total_cleaning_time_sums_lines() {
        let catalog = catalog_with(&[1, 2]);
        let lines = vec![
            OrderLine {
                service_id: 1,
                amount: 2,
            },
            OrderLine {
                service_id: 2,
                amount: 3,
            },
        ];
        // 30 minutes per unit in the fixture catalog.
        assert_eq!(total_cleaning_time(&lines, &catalog).unwrap(), 150);
    }

    #[test]
    fn test_total_cleaning_time_overflow_is_validation_error() {
        let catalog = catalog_with(&[1]);
        let lines = vec![OrderLine {
            service_id: 1,
            amount: i32::MAX,
        }];
        let err = total_cleaning_time(&lines, &catalog).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_total_cleaning_time_overflow_on_sum() {
        let catalog = catalog_with(&[1, 2]);
        let per_line = i32::MAX / 30;
        let lines = vec![
            OrderLine {
                service_id: 1,
                amount: per_line,
            },
            OrderLine {
                service_id: 2,
                amount: per_line,
            },
        ];
        assert!(total_cleaning_time(&lines, &catalog).is_err());
    }
}
