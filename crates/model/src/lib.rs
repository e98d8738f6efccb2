use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Address — адрес уборки. Строка адреса сама по себе не уникальна:
/// повторное использование определяется точным совпадением всех полей.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub id: i32,
    pub city: String,
    pub street: String,
    pub house: i32,
    pub apartment: Option<i32>,
    pub floor: Option<i32>,
    pub entrance: Option<i32>,
}

/// Роль пользователя.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// User — клиент или администратор. Email уникален и служит логином.
/// Хеш пароля хранится отдельной колонкой и наружу не сериализуется.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub phone: String,
    #[serde(rename = "address")]
    pub address_id: Option<i32>,
    pub role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Service — отдельная услуга каталога.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub id: i32,
    pub title: String,
    pub price: i32,
    pub measure: String,
    pub image: String,
    #[serde(rename = "cleaning_time")]
    pub cleaning_time: i32,
    #[serde(rename = "cleaning_type")]
    pub cleaning_type_id: i32,
    /// Дополнительные услуги, видимые клиенту отдельным списком.
    pub additional: bool,
}

/// CleaningType — набор услуг с ценовым коэффициентом.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleaningType {
    pub id: i32,
    pub title: String,
    pub coefficient: f64,
    #[serde(default)]
    pub services: Vec<Service>,
}

/// Статус заказа. Граф переходов не ограничен: любой статус можно
/// установить из любого другого.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "in_progress" => Some(OrderStatus::InProgress),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// OrderedService — позиция заказа: услуга и её количество.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderedService {
    #[serde(rename = "id")]
    pub service_id: i32,
    pub title: String,
    pub measure: String,
    pub price: i32,
    pub amount: i32,
}

/// Order — основной агрегат заказа.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i32,
    #[serde(rename = "user")]
    pub user_id: i32,
    #[serde(rename = "total_sum")]
    pub total_sum: i32,
    #[serde(rename = "total_time")]
    pub total_time: i32,
    pub comment: String,
    #[serde(rename = "order_status")]
    pub order_status: OrderStatus,
    #[serde(rename = "cleaning_type")]
    pub cleaning_type_id: i32,
    #[serde(rename = "address")]
    pub address_id: i32,
    #[serde(rename = "pay_status")]
    pub pay_status: bool,
    #[serde(rename = "creation_date")]
    pub creation_date: NaiveDate,
    #[serde(rename = "creation_time")]
    pub creation_time: NaiveTime,
    #[serde(rename = "cleaning_date")]
    pub cleaning_date: NaiveDate,
    #[serde(rename = "cleaning_time")]
    pub cleaning_time: NaiveTime,
    #[serde(rename = "comment_cancel")]
    pub comment_cancel: Option<String>,
    #[serde(default)]
    pub services: Vec<OrderedService>,
}

/// Rating — отзыв об уборке.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rating {
    pub id: i32,
    #[serde(rename = "user")]
    pub user_id: i32,
    #[serde(rename = "order")]
    pub order_id: i32,
    pub text: String,
    pub score: i16,
    #[serde(rename = "pub_date")]
    pub pub_date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Входящие payload'ы, которые потребляет сервисный слой.
// ---------------------------------------------------------------------------

/// Адрес в заявке на заказ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressPayload {
    pub city: String,
    pub street: String,
    pub house: i32,
    #[serde(default)]
    pub apartment: Option<i32>,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub entrance: Option<i32>,
}

/// Контактные данные пользователя в заявке на заказ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Позиция услуги в заявке. Оба поля опциональны на уровне схемы:
/// их отсутствие — отдельная ошибка валидации, а не ошибка разбора JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceLine {
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub amount: Option<i32>,
}

/// Заявка на создание заказа.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewOrderRequest {
    pub user: UserPayload,
    pub address: AddressPayload,
    pub services: Vec<ServiceLine>,
    #[serde(rename = "total_sum")]
    pub total_sum: i32,
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "cleaning_type")]
    pub cleaning_type: i32,
    #[serde(rename = "cleaning_date")]
    pub cleaning_date: NaiveDate,
    #[serde(rename = "cleaning_time", deserialize_with = "flexible_time::deserialize")]
    pub cleaning_time: NaiveTime,
}

/// Заявка на регистрацию пользователя.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUserRequest {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(default)]
    pub address: Option<AddressPayload>,
}

/// Клиенты присылают время уборки как "10:00", без секунд.
pub mod flexible_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .map_err(|e| serde::de::Error::custom(format!("invalid time '{raw}': {e}")))
    }

    /// Same parsing for optional fields (absent or null stays `None`).
    pub fn option<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid time '{raw}': {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NewOrderRequest, OrderStatus};
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn test_deserialize_new_order_from_json() {
        let json = r#"
        {
            "user": {
                "username": "bob",
                "email": "bob@x.com",
                "phone": "+79991234567"
            },
            "address": {
                "city": "Moscow",
                "street": "Lenina",
                "house": 5
            },
            "services": [
                {"id": 1, "amount": 2}
            ],
            "total_sum": 500,
            "cleaning_type": 1,
            "cleaning_date": "2024-01-01",
            "cleaning_time": "10:00"
        }
        "#;
        let req: NewOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.user.email, "bob@x.com");
        assert_eq!(req.address.house, 5);
        assert_eq!(req.address.apartment, None);
        assert_eq!(req.services.len(), 1);
        assert_eq!(req.services[0].id, Some(1));
        assert_eq!(req.services[0].amount, Some(2));
        assert_eq!(req.comment, "");
        assert_eq!(
            req.cleaning_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(
            req.cleaning_time,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_cleaning_time_with_seconds() {
        let json = r#"
        {
            "user": {"username": "bob", "email": "bob@x.com", "phone": "+79991234567"},
            "address": {"city": "Moscow", "street": "Lenina", "house": 5},
            "services": [{"id": 1, "amount": 2}],
            "total_sum": 500,
            "cleaning_type": 1,
            "cleaning_date": "2024-01-01",
            "cleaning_time": "10:30:15"
        }
        "#;
        let req: NewOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.cleaning_time,
            NaiveTime::from_hms_opt(10, 30, 15).unwrap()
        );
    }

    #[test]
    fn test_service_line_missing_fields_still_parse() {
        let json = r#"{"id": 3}"#;
        let line: super::ServiceLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.id, Some(3));
        assert_eq!(line.amount, None);
    }

    #[test]
    fn test_order_status_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::InProgress,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::from_str("paused"), None);

        let encoded = serde_json::to_string(&OrderStatus::InProgress).unwrap();
        assert_eq!(encoded, r#""in_progress""#);
    }
}
