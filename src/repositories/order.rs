use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Cinema, Location, Order, OrderDetail, PaymentMethod, Schedule, Seat, TimeSlot};
use crate::utils::error::AppError;

/// Opaque booking reference attached to each committed order.
///
/// Drawn from a collision-resistant random source; `orders.qr_code` is UNIQUE
/// so an improbable collision fails the transaction instead of aliasing two
/// orders.
pub fn generate_booking_reference() -> String {
    format!("QR-{}", Uuid::new_v4().simple())
}

/// Fields of a booking request after validation, identity already resolved.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub schedule_id: i32,
    pub payment_id: i32,
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub seat_codes: Vec<String>,
}

const AVAILABLE_SEATS_SQL: &str = "\
    SELECT s.id, s.seat_code
    FROM seats s
    WHERE NOT EXISTS (
        SELECT 1 FROM order_seats os
        WHERE os.schedules_id = $1 AND os.seats_id = s.id
    )
    ORDER BY s.id";

const ORDER_PROJECTION_SELECT: &str = "\
    SELECT o.id, o.qr_code, o.users_id AS user_id, o.schedules_id AS schedule_id,
           o.payments_id AS payment_id, o.fullname, o.email, o.phone_number AS phone,
           o.created_at, o.updated_at,
           m.id AS movie_id, m.title, m.overview, m.director_name, m.duration,
           m.popularity, m.release_date, m.poster_path, m.backdrop_path,
           c.name AS cinema_name, l.name AS location, t.time::text AS time, s.date,
           pm.name AS payment,
           COALESCE(json_agg(json_build_object('id', se.id, 'seat_code', se.seat_code))
                    FILTER (WHERE se.id IS NOT NULL), '[]') AS seats
    FROM orders o
    JOIN schedules s ON o.schedules_id = s.id
    JOIN movies m ON s.movies_id = m.id
    JOIN cinemas c ON s.cinemas_id = c.id
    JOIN locations l ON s.locations_id = l.id
    JOIN times t ON s.times_id = t.id
    JOIN payment_methods pm ON o.payments_id = pm.id
    LEFT JOIN order_seats os ON os.orders_id = o.id
    LEFT JOIN seats se ON se.id = os.seats_id";

const ORDER_PROJECTION_GROUP_BY: &str =
    " GROUP BY o.id, m.id, c.name, l.name, t.time, s.date, pm.name";

/// Seat inventory and order writes/reads.
///
/// `create_order` is the only write path in the system; everything it touches
/// happens inside a single transaction so a failure at any step, including a
/// seat conflict raised by the (schedules_id, seats_id) uniqueness constraint,
/// leaves no partial rows behind.
#[derive(Clone)]
pub struct OrderRepository {
    db: PgPool,
}

impl OrderRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_order(&self, new_order: NewOrder) -> Result<Order, AppError> {
        let mut tx = self.db.begin().await?;

        // Resolve human seat codes to inventory rows, preserving request order.
        // Every requested code must resolve; booking fewer seats than asked
        // for is never acceptable.
        let seats = sqlx::query_as::<_, Seat>(
            "SELECT id, seat_code FROM seats WHERE seat_code = ANY($1) \
             ORDER BY array_position($1, seat_code)",
        )
        .bind(&new_order.seat_codes)
        .fetch_all(&mut *tx)
        .await?;

        if seats.len() != new_order.seat_codes.len() {
            let unresolved = new_order
                .seat_codes
                .iter()
                .find(|code| !seats.iter().any(|s| &s.seat_code == *code))
                .cloned()
                .unwrap_or_default();
            return Err(AppError::ValidationError(format!(
                "Seat code '{}' does not exist in the seat inventory",
                unresolved
            )));
        }

        let schedule_exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM schedules WHERE id = $1")
                .bind(new_order.schedule_id)
                .fetch_optional(&mut *tx)
                .await?;
        if schedule_exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Schedule with id {} was not found",
                new_order.schedule_id
            )));
        }

        let payment_exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM payment_methods WHERE id = $1")
                .bind(new_order.payment_id)
                .fetch_optional(&mut *tx)
                .await?;
        if payment_exists.is_none() {
            return Err(AppError::ValidationError(format!(
                "Payment method {} is not valid",
                new_order.payment_id
            )));
        }

        let qr_code = generate_booking_reference();

        let (order_id, created_at): (i32, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
            "INSERT INTO orders (qr_code, users_id, schedules_id, payments_id, fullname, email, phone_number, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
             RETURNING id, created_at",
        )
        .bind(&qr_code)
        .bind(new_order.user_id)
        .bind(new_order.schedule_id)
        .bind(new_order.payment_id)
        .bind(&new_order.fullname)
        .bind(&new_order.email)
        .bind(&new_order.phone)
        .fetch_one(&mut *tx)
        .await?;

        // The association rows carry the schedule id so the showtime-scoped
        // uniqueness constraint can reject a concurrent claim of the same seat.
        for seat in &seats {
            sqlx::query(
                "INSERT INTO order_seats (orders_id, seats_id, schedules_id) VALUES ($1, $2, $3)",
            )
            .bind(order_id)
            .bind(seat.id)
            .bind(new_order.schedule_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_seat_insert)?;
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            qr_code,
            user_id: new_order.user_id,
            schedule_id: new_order.schedule_id,
            payment_id: new_order.payment_id,
            fullname: new_order.fullname,
            email: new_order.email,
            phone: new_order.phone,
            created_at,
            seats,
        })
    }

    /// Every seat not yet attached, through any committed order, to the given
    /// schedule. The uniqueness constraint, not this read, is what makes the
    /// answer authoritative under concurrency.
    pub async fn available_seats(&self, schedule_id: i32) -> Result<Vec<Seat>, AppError> {
        let seats = sqlx::query_as::<_, Seat>(AVAILABLE_SEATS_SQL)
            .bind(schedule_id)
            .fetch_all(&self.db)
            .await?;
        Ok(seats)
    }

    pub async fn schedules_by_movie(&self, movie_id: i32) -> Result<Vec<Schedule>, AppError> {
        let schedules = sqlx::query_as::<_, Schedule>(
            "SELECT id, movies_id AS movie_id, cinemas_id AS cinema_id, \
             locations_id AS location_id, times_id AS time_id, date \
             FROM schedules WHERE movies_id = $1 ORDER BY date, id",
        )
        .bind(movie_id)
        .fetch_all(&self.db)
        .await?;
        Ok(schedules)
    }

    pub async fn order_detail(&self, order_id: i32) -> Result<OrderDetail, AppError> {
        let sql = format!(
            "{} WHERE o.id = $1{}",
            ORDER_PROJECTION_SELECT, ORDER_PROJECTION_GROUP_BY
        );
        let row = sqlx::query(&sql)
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Order with id {} was not found", order_id))
            })?;

        Ok(OrderDetail::from_joined_row(&row)?)
    }

    pub async fn order_history(&self, user_id: Uuid) -> Result<Vec<OrderDetail>, AppError> {
        let sql = format!(
            "{} WHERE o.users_id = $1{} ORDER BY o.created_at DESC",
            ORDER_PROJECTION_SELECT, ORDER_PROJECTION_GROUP_BY
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.db).await?;

        let orders = rows
            .iter()
            .map(OrderDetail::from_joined_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    pub async fn payments(&self) -> Result<Vec<PaymentMethod>, AppError> {
        let rows =
            sqlx::query_as::<_, PaymentMethod>("SELECT id, name FROM payment_methods ORDER BY id")
                .fetch_all(&self.db)
                .await?;
        Ok(rows)
    }

    pub async fn cinemas(&self) -> Result<Vec<Cinema>, AppError> {
        let rows = sqlx::query_as::<_, Cinema>("SELECT id, name FROM cinemas ORDER BY id")
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn locations(&self) -> Result<Vec<Location>, AppError> {
        let rows = sqlx::query_as::<_, Location>("SELECT id, name FROM locations ORDER BY id")
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn times(&self) -> Result<Vec<TimeSlot>, AppError> {
        let rows =
            sqlx::query_as::<_, TimeSlot>("SELECT id, time::text AS time FROM times ORDER BY time")
                .fetch_all(&self.db)
                .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_references_are_prefixed_and_distinct() {
        let a = generate_booking_reference();
        let b = generate_booking_reference();
        assert!(a.starts_with("QR-"));
        assert_eq!(a.len(), 3 + 32);
        assert_ne!(a, b);
    }
}
