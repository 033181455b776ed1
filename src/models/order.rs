use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

/// A physical seat from the global pool, reused across every showtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Seat {
    pub id: i32,
    pub seat_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Schedule {
    pub id: i32,
    pub movie_id: i32,
    pub cinema_id: i32,
    pub location_id: i32,
    pub time_id: i32,
    pub date: NaiveDate,
}

/// A committed order with its claimed seats. Immutable once written.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i32,
    pub qr_code: String,
    pub user_id: Uuid,
    pub schedule_id: i32,
    pub payment_id: i32,
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub seats: Vec<Seat>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentMethod {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cinema {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimeSlot {
    pub id: i32,
    pub time: String,
}

/// Movie fields carried inside an order projection.
#[derive(Debug, Clone, Serialize)]
pub struct MovieSummary {
    pub id: i32,
    pub title: String,
    pub overview: String,
    pub director_name: String,
    pub duration: i32,
    pub popularity: f64,
    pub release_date: NaiveDate,
    pub poster_path: String,
    pub backdrop_path: String,
}

/// Flattened order projection joining schedule, movie, venue, payment method
/// and the aggregated seat list into one response row.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub id: i32,
    pub qr_code: String,
    pub user_id: Uuid,
    pub schedule_id: i32,
    pub payment_id: i32,
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub movie: MovieSummary,
    pub cinema_name: String,
    pub location: String,
    pub time: String,
    pub date: NaiveDate,
    pub payment: String,
    pub seats: Vec<Seat>,
}

impl OrderDetail {
    pub fn from_joined_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let seats: serde_json::Value = row.try_get("seats")?;

        Ok(Self {
            id: row.try_get("id")?,
            qr_code: row.try_get("qr_code")?,
            user_id: row.try_get("user_id")?,
            schedule_id: row.try_get("schedule_id")?,
            payment_id: row.try_get("payment_id")?,
            fullname: row.try_get("fullname")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            movie: MovieSummary {
                id: row.try_get("movie_id")?,
                title: row.try_get("title")?,
                overview: row.try_get("overview")?,
                director_name: row.try_get("director_name")?,
                duration: row.try_get("duration")?,
                popularity: row.try_get("popularity")?,
                release_date: row.try_get("release_date")?,
                poster_path: row.try_get("poster_path")?,
                backdrop_path: row.try_get("backdrop_path")?,
            },
            cinema_name: row.try_get("cinema_name")?,
            location: row.try_get("location")?,
            time: row.try_get("time")?,
            date: row.try_get("date")?,
            payment: row.try_get("payment")?,
            seats: serde_json::from_value(seats).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_list_deserializes_from_json_aggregate() {
        // Shape produced by json_agg(json_build_object(...)) in the order joins.
        let raw = r#"[{"id":1,"seat_code":"A1"},{"id":2,"seat_code":"A2"}]"#;
        let seats: Vec<Seat> = serde_json::from_str(raw).unwrap();
        assert_eq!(
            seats,
            vec![
                Seat {
                    id: 1,
                    seat_code: "A1".to_string()
                },
                Seat {
                    id: 2,
                    seat_code: "A2".to_string()
                },
            ]
        );
    }
}
